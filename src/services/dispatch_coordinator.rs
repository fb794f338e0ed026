//! Coordinador de despacho
//!
//! Orquesta registro de disponibilidad, ciclo de vida de la solicitud y
//! registro de servicio en una única operación atómica
//! "aceptar solicitud → reservar vehículo → abrir registro", y aplica las
//! transiciones posteriores.
//!
//! Concurrencia:
//! - la reserva es lineal gracias al `Mutex` del registro; si la escritura
//!   durable falla, el vehículo vuelve a la cabeza de la cola antes de
//!   devolver el error
//! - cada reserva lleva su dueño; la liberación administrativa solo toca
//!   reservas administrativas, nunca un despacho en curso
//! - las transiciones de una misma solicitud se serializan con un lock por
//!   solicitud; las de solicitudes distintas corren en paralelo
//! - nada espera capacidad: sin vehículos se devuelve `NoAvailableVehicle`

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::availability_registry::{AvailabilityRegistry, FleetSummary, Reservation};
use super::keyed_lock::KeyedLocks;
use super::request_lifecycle::{self, TransitionEffect};
use super::service_record_tracker::ServiceRecordTracker;
use crate::models::{
    AvailabilityStatus, NewEmergency, Request, RequestStatus, ServiceRecord, StatusHistoryEntry,
    Vehicle,
};
use crate::repositories::{
    DispatchStore, DispatchWrite, PatientResolver, ServiceRecordFilter, TransitionWrite,
};
use crate::utils::errors::{DispatchError, DispatchResult, StoreError};

pub struct DispatchCoordinator {
    store: Arc<dyn DispatchStore>,
    patients: Arc<dyn PatientResolver>,
    registry: Arc<AvailabilityRegistry>,
    tracker: ServiceRecordTracker,
    request_locks: KeyedLocks,
    vehicle_locks: KeyedLocks,
}

impl DispatchCoordinator {
    pub fn new(
        store: Arc<dyn DispatchStore>,
        patients: Arc<dyn PatientResolver>,
        registry: Arc<AvailabilityRegistry>,
    ) -> Self {
        Self {
            tracker: ServiceRecordTracker::new(Arc::clone(&store)),
            store,
            patients,
            registry,
            request_locks: KeyedLocks::new(),
            vehicle_locks: KeyedLocks::new(),
        }
    }

    /// Reconstruye el registro desde el almacenamiento y crea el coordinador.
    ///
    /// Los vehículos DISPATCHED sin solicitud activa quedan como reserva
    /// administrativa.
    pub async fn bootstrap(
        store: Arc<dyn DispatchStore>,
        patients: Arc<dyn PatientResolver>,
    ) -> DispatchResult<Self> {
        let vehicles = store.load_vehicles().await?;
        let owners: HashMap<Uuid, Uuid> = store
            .list_requests_by_status(RequestStatus::Dispatched)
            .await?
            .into_iter()
            .filter_map(|request| request.vehicle_id.map(|vehicle_id| (vehicle_id, request.id)))
            .collect();
        let registry = Arc::new(AvailabilityRegistry::rebuild(vehicles, &owners));
        Ok(Self::new(store, patients, registry))
    }

    pub fn registry(&self) -> &AvailabilityRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &ServiceRecordTracker {
        &self.tracker
    }

    /// Locks por clave vivos (solicitudes, vehículos y registros)
    pub fn locks_in_use(&self) -> usize {
        self.request_locks.len() + self.vehicle_locks.len() + self.tracker.locks_in_use()
    }

    /// Acepta una emergencia, reserva un vehículo y abre su registro.
    ///
    /// Sin capacidad no escribe nada y devuelve `NoAvailableVehicle`.
    pub async fn create_and_dispatch(
        &self,
        emergency: NewEmergency,
        actor: Option<&str>,
    ) -> DispatchResult<Request> {
        let patient = self
            .patients
            .find_or_create(
                &emergency.requester_name,
                &emergency.contact,
                emergency.medical_notes.as_deref(),
            )
            .await?;

        let request_id = Uuid::new_v4();
        let vehicle = match self.registry.reserve_next(Reservation::Request(request_id)) {
            Some(vehicle) => vehicle,
            None => {
                log::warn!(
                    "🚫 Sin vehículos disponibles para la emergencia de {}",
                    emergency.contact
                );
                return Err(DispatchError::NoAvailableVehicle);
            }
        };

        let now = Utc::now();
        let mut request = Request {
            id: request_id,
            requester_name: emergency.requester_name,
            contact: emergency.contact,
            location: emergency.location,
            emergency_description: emergency.emergency_description,
            medical_notes: emergency.medical_notes,
            status: RequestStatus::Pending,
            patient_id: Some(patient.id),
            vehicle_id: None,
            created_at: now,
            dispatch_time: None,
            updated_at: now,
        };

        request_lifecycle::validate(request.status, RequestStatus::Dispatched)?;
        request.status = RequestStatus::Dispatched;
        request.vehicle_id = Some(vehicle.id);
        request.dispatch_time = Some(now);

        let service_record = ServiceRecordTracker::open(
            &request,
            patient.id,
            vehicle.id,
            format!("Vehicle {} dispatched to {}", vehicle.license_plate, request.location),
            now,
        );
        let history = StatusHistoryEntry::record(
            request.id,
            None,
            RequestStatus::Dispatched,
            None,
            actor,
            now,
        );

        let write = DispatchWrite {
            vehicle_id: vehicle.id,
            request,
            service_record,
            history,
        };

        if let Err(err) = self.store.persist_dispatch(&write).await {
            log::error!(
                "❌ Error persistiendo el despacho {}: {}; devolviendo vehículo {}",
                write.request.id,
                err,
                vehicle.id
            );
            if let Err(release_err) = self.registry.restore_front(vehicle.id) {
                log::error!("❌ No se pudo deshacer la reserva de {}: {}", vehicle.id, release_err);
            }
            return Err(err.into());
        }

        log::info!(
            "🚑 Solicitud {} despachada con vehículo {} ({})",
            write.request.id,
            vehicle.id,
            vehicle.license_plate
        );
        Ok(write.request)
    }

    /// Aplica una transición de estado validada por la máquina de estados.
    ///
    /// En COMPLETED/CANCELLED el vehículo queda liberado antes de devolver
    /// la solicitud; una transición inválida no modifica nada.
    pub async fn transition_status(
        &self,
        request_id: Uuid,
        new_status: RequestStatus,
        notes: Option<&str>,
        actor: Option<&str>,
    ) -> DispatchResult<Request> {
        let _request_guard = self.request_locks.lock(request_id).await;

        let current = self
            .store
            .find_request(request_id)
            .await?
            .ok_or(DispatchError::RequestNotFound(request_id))?;
        let from = current.status;

        let effect = request_lifecycle::validate(from, new_status)?;
        if effect == TransitionEffect::ReserveAndOpen {
            // El despacho solo ocurre en create_and_dispatch
            return Err(DispatchError::InvalidTransition {
                from,
                to: new_status,
            });
        }

        let now = Utc::now();
        let mut updated = current.clone();
        updated.status = new_status;
        updated.updated_at = now;

        let holds_vehicle = matches!(
            effect,
            TransitionEffect::Release | TransitionEffect::ReleaseAndComplete
        );

        let mut _record_guard = None;
        let mut service_record = None;
        if holds_vehicle {
            if let Some(record) = self.tracker.find_by_request(request_id).await? {
                _record_guard = Some(self.tracker.lock_record(record.id).await);
                // Releer bajo el lock del registro
                let record = self.tracker.get(record.id).await?;
                service_record = Some(ServiceRecordTracker::close_for_request(
                    record, new_status, notes, now,
                ));
            }
        }
        let release_vehicle = if holds_vehicle { current.vehicle_id } else { None };

        let write = TransitionWrite {
            request: updated,
            expected_status: from,
            service_record,
            history: StatusHistoryEntry::record(
                request_id,
                Some(from),
                new_status,
                notes.map(str::to_string),
                actor,
                now,
            ),
            release_vehicle,
        };

        self.store
            .persist_transition(&write)
            .await
            .map_err(|err| match err {
                StoreError::Conflict {
                    entity: "request", ..
                } => DispatchError::InvalidTransition {
                    from,
                    to: new_status,
                },
                other => DispatchError::Persistence(other),
            })?;

        if let Some(vehicle_id) = release_vehicle {
            self.registry.release(vehicle_id)?;
        }

        log::info!("🔄 Solicitud {}: {} → {}", request_id, from, new_status);
        Ok(write.request)
    }

    pub async fn get_request(&self, request_id: Uuid) -> DispatchResult<Request> {
        self.store
            .find_request(request_id)
            .await?
            .ok_or(DispatchError::RequestNotFound(request_id))
    }

    pub async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> DispatchResult<Vec<Request>> {
        Ok(self.store.list_requests_by_status(status).await?)
    }

    /// Historial de la solicitud en orden cronológico
    pub async fn request_history(&self, request_id: Uuid) -> DispatchResult<Vec<StatusHistoryEntry>> {
        if self.store.find_request(request_id).await?.is_none() {
            return Err(DispatchError::RequestNotFound(request_id));
        }
        Ok(self.store.list_history(request_id).await?)
    }

    /// Da de alta un vehículo AVAILABLE
    pub async fn register_vehicle(
        &self,
        license_plate: &str,
        location: &str,
    ) -> DispatchResult<Vehicle> {
        let vehicle = Vehicle::new(
            license_plate.trim().to_uppercase(),
            location.trim().to_string(),
            Utc::now(),
        );
        self.store
            .insert_vehicle(&vehicle)
            .await
            .map_err(|err| match err {
                StoreError::Duplicate { .. } => {
                    DispatchError::DuplicateLicensePlate(vehicle.license_plate.clone())
                }
                other => DispatchError::Persistence(other),
            })?;
        self.registry.register(vehicle.clone());

        log::info!("🆕 Vehículo {} registrado ({})", vehicle.id, vehicle.license_plate);
        Ok(vehicle)
    }

    /// Da de baja un vehículo que no está despachado (borrado lógico)
    pub async fn deregister_vehicle(&self, vehicle_id: Uuid) -> DispatchResult<Vehicle> {
        let _guard = self.vehicle_locks.lock(vehicle_id).await;

        // Fuera del registro primero: desde aquí ya no es reservable
        let vehicle = self.registry.remove(vehicle_id)?;
        if let Err(err) = self.store.soft_delete_vehicle(vehicle_id, Utc::now()).await {
            self.registry.register(vehicle);
            return Err(match err {
                StoreError::Conflict { .. } => DispatchError::VehicleInUse(vehicle_id),
                other => DispatchError::Persistence(other),
            });
        }

        log::info!("🗑️ Vehículo {} dado de baja ({})", vehicle_id, vehicle.license_plate);
        Ok(vehicle)
    }

    pub async fn update_vehicle_location(
        &self,
        vehicle_id: Uuid,
        location: &str,
    ) -> DispatchResult<Vehicle> {
        let _guard = self.vehicle_locks.lock(vehicle_id).await;

        if self.registry.get(vehicle_id).is_none() {
            return Err(DispatchError::UnknownVehicle(vehicle_id));
        }
        let location = location.trim();
        self.store.update_vehicle_location(vehicle_id, location).await?;
        let vehicle = self.registry.set_location(vehicle_id, location)?;

        log::debug!("📍 Vehículo {} en {}", vehicle_id, location);
        Ok(vehicle)
    }

    pub async fn list_service_records(
        &self,
        filter: &ServiceRecordFilter,
    ) -> DispatchResult<Vec<ServiceRecord>> {
        self.tracker.list(filter).await
    }

    pub fn list_vehicles(&self) -> Vec<Vehicle> {
        self.registry.snapshot()
    }

    pub fn fleet_summary(&self) -> FleetSummary {
        self.registry.summary()
    }

    /// Retira un vehículo libre del servicio
    pub async fn set_vehicle_out_of_service(&self, vehicle_id: Uuid) -> DispatchResult<Vehicle> {
        let _guard = self.vehicle_locks.lock(vehicle_id).await;

        let before = self
            .registry
            .get(vehicle_id)
            .ok_or(DispatchError::UnknownVehicle(vehicle_id))?;
        self.registry.mark_out_of_service(vehicle_id)?;
        if before.availability == AvailabilityStatus::OutOfService {
            return Ok(before);
        }

        if let Err(err) = self
            .store
            .update_vehicle_availability(vehicle_id, AvailabilityStatus::OutOfService)
            .await
        {
            self.registry.mark_in_service(vehicle_id)?;
            return Err(err.into());
        }

        log::info!("🔧 Vehículo {} fuera de servicio", vehicle_id);
        self.registry
            .get(vehicle_id)
            .ok_or(DispatchError::UnknownVehicle(vehicle_id))
    }

    /// Devuelve al servicio un vehículo retirado
    pub async fn set_vehicle_in_service(&self, vehicle_id: Uuid) -> DispatchResult<Vehicle> {
        let _guard = self.vehicle_locks.lock(vehicle_id).await;

        let vehicle = self
            .registry
            .get(vehicle_id)
            .ok_or(DispatchError::UnknownVehicle(vehicle_id))?;
        if vehicle.availability != AvailabilityStatus::OutOfService {
            return Ok(vehicle);
        }

        // Persistir antes de encolar: hasta entonces no es reservable
        self.store
            .update_vehicle_availability(vehicle_id, AvailabilityStatus::Available)
            .await?;
        self.registry.mark_in_service(vehicle_id)?;

        log::info!("🟢 Vehículo {} de nuevo en servicio", vehicle_id);
        self.registry
            .get(vehicle_id)
            .ok_or(DispatchError::UnknownVehicle(vehicle_id))
    }

    /// Reserva administrativa, sin solicitud asociada
    pub async fn admin_reserve_vehicle(&self) -> DispatchResult<Option<Vehicle>> {
        let Some(vehicle) = self.registry.reserve_next(Reservation::Admin) else {
            return Ok(None);
        };

        if let Err(err) = self
            .store
            .update_vehicle_availability(vehicle.id, AvailabilityStatus::Dispatched)
            .await
        {
            self.registry.restore_front(vehicle.id)?;
            return Err(err.into());
        }

        log::warn!("🛠️ Reserva administrativa del vehículo {}", vehicle.id);
        Ok(Some(vehicle))
    }

    /// Liberación administrativa; solo acepta reservas administrativas.
    ///
    /// Un vehículo reservado por una solicitud, aunque su despacho aún no se
    /// haya persistido, se rechaza con `VehicleInUse`.
    pub async fn admin_release_vehicle(&self, vehicle_id: Uuid) -> DispatchResult<Vehicle> {
        let _guard = self.vehicle_locks.lock(vehicle_id).await;

        let vehicle = self
            .registry
            .get(vehicle_id)
            .ok_or(DispatchError::UnknownVehicle(vehicle_id))?;
        if vehicle.availability != AvailabilityStatus::Dispatched {
            return Ok(vehicle);
        }
        self.registry.ensure_admin_reserved(vehicle_id)?;

        self.store
            .update_vehicle_availability(vehicle_id, AvailabilityStatus::Available)
            .await?;
        self.registry.release(vehicle_id)?;

        log::warn!("🛠️ Liberación administrativa del vehículo {}", vehicle_id);
        self.registry
            .get(vehicle_id)
            .ok_or(DispatchError::UnknownVehicle(vehicle_id))
    }
}
