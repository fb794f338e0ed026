//! Almacenamiento en memoria
//!
//! Implementa `DispatchStore` y `PatientResolver` sobre tablas protegidas
//! por un único `RwLock`: cada escritura compuesta se aplica bajo el mismo
//! guard, lo que la hace atómica. Se usa en tests y en modo desarrollo.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    DispatchStore, DispatchWrite, PatientResolver, ServiceRecordFilter, TransitionWrite,
};
use crate::models::{
    patient::format_medical_note, AvailabilityStatus, Patient, Request, RequestStatus,
    ServiceRecord, StatusHistoryEntry, Vehicle,
};
use crate::utils::errors::{StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    vehicles: BTreeMap<Uuid, Vehicle>,
    requests: HashMap<Uuid, Request>,
    service_records: HashMap<Uuid, ServiceRecord>,
    history: Vec<StatusHistoryEntry>,
    patients: HashMap<Uuid, Patient>,
}

/// Tamaño de cada tabla, para verificar qué escribió una operación
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableSizes {
    pub vehicles: usize,
    pub requests: usize,
    pub service_records: usize,
    pub history: usize,
    pub patients: usize,
}

#[derive(Default)]
pub struct InMemoryDispatchStore {
    tables: RwLock<Tables>,
}

impl InMemoryDispatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crea el almacenamiento con vehículos ya registrados
    pub fn with_vehicles(vehicles: Vec<Vehicle>) -> Self {
        let tables = Tables {
            vehicles: vehicles.into_iter().map(|v| (v.id, v)).collect(),
            ..Tables::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn table_sizes(&self) -> TableSizes {
        let tables = self.tables.read().await;
        TableSizes {
            vehicles: tables.vehicles.len(),
            requests: tables.requests.len(),
            service_records: tables.service_records.len(),
            history: tables.history.len(),
            patients: tables.patients.len(),
        }
    }
}

fn conflict(entity: &'static str, id: Uuid) -> StoreError {
    StoreError::Conflict { entity, id }
}

#[async_trait]
impl DispatchStore for InMemoryDispatchStore {
    async fn load_vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        let tables = self.tables.read().await;
        // BTreeMap ya itera por id
        Ok(tables
            .vehicles
            .values()
            .filter(|v| v.audit.is_visible())
            .cloned()
            .collect())
    }

    async fn find_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>> {
        let tables = self.tables.read().await;
        Ok(tables
            .vehicles
            .get(&id)
            .filter(|v| v.audit.is_visible())
            .cloned())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let plate_taken = tables.vehicles.values().any(|v| {
            v.audit.is_visible() && v.license_plate.eq_ignore_ascii_case(&vehicle.license_plate)
        });
        if plate_taken || tables.vehicles.contains_key(&vehicle.id) {
            return Err(StoreError::Duplicate {
                entity: "vehicle",
                key: vehicle.license_plate.clone(),
            });
        }
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    async fn soft_delete_vehicle(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let vehicle = tables
            .vehicles
            .get_mut(&id)
            .filter(|v| v.audit.is_visible())
            .ok_or_else(|| StoreError::Backend(format!("vehicle '{}' does not exist", id)))?;
        if vehicle.availability == AvailabilityStatus::Dispatched {
            return Err(conflict("vehicle", id));
        }
        vehicle.audit.soft_delete(now);
        Ok(())
    }

    async fn update_vehicle_location(&self, id: Uuid, location: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let vehicle = tables
            .vehicles
            .get_mut(&id)
            .filter(|v| v.audit.is_visible())
            .ok_or_else(|| StoreError::Backend(format!("vehicle '{}' does not exist", id)))?;
        vehicle.location = location.to_string();
        vehicle.audit.touch(Utc::now());
        Ok(())
    }

    async fn update_vehicle_availability(
        &self,
        id: Uuid,
        availability: AvailabilityStatus,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let vehicle = tables
            .vehicles
            .get_mut(&id)
            .filter(|v| v.audit.is_visible())
            .ok_or_else(|| StoreError::Backend(format!("vehicle '{}' does not exist", id)))?;
        vehicle.availability = availability;
        vehicle.audit.touch(Utc::now());
        Ok(())
    }

    async fn persist_dispatch(&self, write: &DispatchWrite) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        // Validar todo antes de mutar nada
        match tables.vehicles.get(&write.vehicle_id) {
            Some(v) if v.audit.is_visible() && v.is_available() => {}
            _ => return Err(conflict("vehicle", write.vehicle_id)),
        }
        if tables.requests.contains_key(&write.request.id) {
            return Err(conflict("request", write.request.id));
        }

        if let Some(vehicle) = tables.vehicles.get_mut(&write.vehicle_id) {
            vehicle.availability = AvailabilityStatus::Dispatched;
            vehicle.audit.touch(write.request.updated_at);
        }
        tables.requests.insert(write.request.id, write.request.clone());
        tables
            .service_records
            .insert(write.service_record.id, write.service_record.clone());
        tables.history.push(write.history.clone());
        Ok(())
    }

    async fn persist_transition(&self, write: &TransitionWrite) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        match tables.requests.get(&write.request.id) {
            Some(current) if current.status == write.expected_status => {}
            _ => return Err(conflict("request", write.request.id)),
        }
        if let Some(record) = &write.service_record {
            if !tables.service_records.contains_key(&record.id) {
                return Err(conflict("service_record", record.id));
            }
        }

        tables.requests.insert(write.request.id, write.request.clone());
        if let Some(record) = &write.service_record {
            tables.service_records.insert(record.id, record.clone());
        }
        tables.history.push(write.history.clone());
        if let Some(vehicle_id) = write.release_vehicle {
            if let Some(vehicle) = tables.vehicles.get_mut(&vehicle_id) {
                if vehicle.availability == AvailabilityStatus::Dispatched {
                    vehicle.availability = AvailabilityStatus::Available;
                    vehicle.audit.touch(write.request.updated_at);
                }
            }
        }
        Ok(())
    }

    async fn find_request(&self, id: Uuid) -> StoreResult<Option<Request>> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn list_requests_by_status(&self, status: RequestStatus) -> StoreResult<Vec<Request>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<Request> = tables
            .requests
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn list_history(&self, request_id: Uuid) -> StoreResult<Vec<StatusHistoryEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .history
            .iter()
            .filter(|h| h.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn find_service_record(&self, id: Uuid) -> StoreResult<Option<ServiceRecord>> {
        Ok(self.tables.read().await.service_records.get(&id).cloned())
    }

    async fn find_service_record_by_request(
        &self,
        request_id: Uuid,
    ) -> StoreResult<Option<ServiceRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .service_records
            .values()
            .find(|r| r.request_id == request_id)
            .cloned())
    }

    async fn update_service_record(&self, record: &ServiceRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.service_records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(conflict("service_record", record.id)),
        }
    }

    async fn list_service_records(
        &self,
        filter: &ServiceRecordFilter,
    ) -> StoreResult<Vec<ServiceRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<ServiceRecord> = tables
            .service_records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[async_trait]
impl PatientResolver for InMemoryDispatchStore {
    async fn find_or_create(
        &self,
        name: &str,
        contact: &str,
        notes: Option<&str>,
    ) -> StoreResult<Patient> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;

        let existing = tables
            .patients
            .values_mut()
            .find(|p| p.audit.is_visible() && p.contact == contact);
        if let Some(patient) = existing {
            if let Some(notes) = notes {
                patient.append_medical_notes(notes, now);
            }
            return Ok(patient.clone());
        }

        let mut patient = Patient::new(name.to_string(), contact.to_string(), now);
        patient.medical_notes = notes.and_then(|n| format_medical_note(n, now));
        tables.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_vehicles_orders_by_id_and_skips_deleted() {
        let now = Utc::now();
        let mut deleted = Vehicle::new("AMB-003".into(), "Norte".into(), now);
        deleted.audit.soft_delete(now);
        let a = Vehicle::new("AMB-001".into(), "Centro".into(), now);
        let b = Vehicle::new("AMB-002".into(), "Sur".into(), now);
        let store = InMemoryDispatchStore::with_vehicles(vec![b.clone(), deleted, a.clone()]);

        let loaded = store.load_vehicles().await.unwrap();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(loaded.iter().map(|v| v.id).collect::<Vec<_>>(), expected);
    }

    #[tokio::test]
    async fn test_find_or_create_reuses_patient_by_contact() {
        let store = InMemoryDispatchStore::new();
        let first = store
            .find_or_create("Ana", "+34600123456", None)
            .await
            .unwrap();
        let second = store
            .find_or_create("Ana López", "+34600123456", Some("Asmática"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Ana");
        assert!(second.medical_notes.unwrap().ends_with("Asmática"));
        assert_eq!(store.table_sizes().await.patients, 1);
    }

    #[tokio::test]
    async fn test_duplicate_license_plate_is_rejected() {
        let store = InMemoryDispatchStore::new();
        let now = Utc::now();
        store
            .insert_vehicle(&Vehicle::new("AMB-001".into(), "Centro".into(), now))
            .await
            .unwrap();
        let result = store
            .insert_vehicle(&Vehicle::new("amb-001".into(), "Sur".into(), now))
            .await;
        assert!(matches!(
            result,
            Err(StoreError::Duplicate { entity: "vehicle", .. })
        ));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_vehicle_and_frees_its_plate() {
        let now = Utc::now();
        let vehicle = Vehicle::new("AMB-001".into(), "Centro".into(), now);
        let mut busy = Vehicle::new("AMB-002".into(), "Sur".into(), now);
        busy.availability = AvailabilityStatus::Dispatched;
        let store = InMemoryDispatchStore::with_vehicles(vec![vehicle.clone(), busy.clone()]);

        assert!(matches!(
            store.soft_delete_vehicle(busy.id, now).await,
            Err(StoreError::Conflict { entity: "vehicle", .. })
        ));

        store.soft_delete_vehicle(vehicle.id, now).await.unwrap();
        assert!(store.find_vehicle(vehicle.id).await.unwrap().is_none());
        assert_eq!(store.load_vehicles().await.unwrap().len(), 1);
        assert_eq!(store.table_sizes().await.vehicles, 2);

        store
            .insert_vehicle(&Vehicle::new("AMB-001".into(), "Norte".into(), now))
            .await
            .unwrap();
    }
}
