//! Seguimiento del registro de servicio
//!
//! Sub-máquina IN_PROGRESS → ARRIVED → COMPLETED, solo hacia delante.
//! La finalización exige llegada previa (política estricta): un registro
//! IN_PROGRESS no puede completarse directamente con `record_completion`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::keyed_lock::{KeyedGuard, KeyedLocks};
use crate::models::{Request, RequestStatus, ServiceRecord, ServiceStatus};
use crate::repositories::{DispatchStore, ServiceRecordFilter};
use crate::utils::errors::{DispatchError, DispatchResult};

pub struct ServiceRecordTracker {
    store: Arc<dyn DispatchStore>,
    locks: KeyedLocks,
}

impl ServiceRecordTracker {
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Construye el registro IN_PROGRESS de un despacho recién reservado
    pub fn open(
        request: &Request,
        patient_id: Uuid,
        vehicle_id: Uuid,
        notes: String,
        now: DateTime<Utc>,
    ) -> ServiceRecord {
        ServiceRecord {
            id: Uuid::new_v4(),
            request_id: request.id,
            patient_id,
            vehicle_id,
            status: ServiceStatus::InProgress,
            arrival_time: None,
            completion_time: None,
            notes: Some(notes),
            created_at: now,
            updated_at: now,
        }
    }

    /// Cierra el registro según el estado terminal de la solicitud.
    ///
    /// COMPLETED cierra aunque no se haya registrado la llegada; si el
    /// registro ya estaba completado conserva su hora de finalización.
    pub fn close_for_request(
        mut record: ServiceRecord,
        terminal: RequestStatus,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> ServiceRecord {
        match terminal {
            RequestStatus::Completed if record.status != ServiceStatus::Completed => {
                let completed_at = record.arrival_time.map_or(now, |arrived| arrived.max(now));
                record.status = ServiceStatus::Completed;
                record.completion_time = Some(completed_at);
            }
            RequestStatus::Cancelled if !record.status.is_closed() => {
                record.status = ServiceStatus::Cancelled;
            }
            _ => {}
        }
        if let Some(notes) = notes {
            record.append_notes(notes);
        }
        record.updated_at = now;
        record
    }

    /// Lock del registro; el coordinador lo toma al cerrar el registro
    pub async fn lock_record(&self, record_id: Uuid) -> KeyedGuard<'_> {
        self.locks.lock(record_id).await
    }

    pub fn locks_in_use(&self) -> usize {
        self.locks.len()
    }

    pub async fn get(&self, record_id: Uuid) -> DispatchResult<ServiceRecord> {
        self.store
            .find_service_record(record_id)
            .await?
            .ok_or(DispatchError::RecordNotFound(record_id))
    }

    pub async fn find_by_request(&self, request_id: Uuid) -> DispatchResult<Option<ServiceRecord>> {
        Ok(self.store.find_service_record_by_request(request_id).await?)
    }

    /// Historial de servicios por estado y rango de fechas de creación
    pub async fn list(&self, filter: &ServiceRecordFilter) -> DispatchResult<Vec<ServiceRecord>> {
        Ok(self.store.list_service_records(filter).await?)
    }

    /// IN_PROGRESS → ARRIVED
    pub async fn record_arrival(
        &self,
        record_id: Uuid,
        time: DateTime<Utc>,
        notes: Option<&str>,
    ) -> DispatchResult<ServiceRecord> {
        let _guard = self.lock_record(record_id).await;
        let mut record = self.get(record_id).await?;

        if record.status != ServiceStatus::InProgress {
            return Err(DispatchError::InvalidSubTransition(format!(
                "cannot record arrival on service record '{}' in status {}",
                record_id, record.status
            )));
        }

        record.status = ServiceStatus::Arrived;
        record.arrival_time = Some(time);
        if let Some(notes) = notes {
            record.append_notes(notes);
        }
        record.updated_at = Utc::now();

        self.store.update_service_record(&record).await?;
        log::info!("📍 Llegada registrada en servicio {}", record_id);
        Ok(record)
    }

    /// ARRIVED → COMPLETED, con `time` ≥ hora de llegada
    pub async fn record_completion(
        &self,
        record_id: Uuid,
        time: DateTime<Utc>,
        notes: Option<&str>,
    ) -> DispatchResult<ServiceRecord> {
        let _guard = self.lock_record(record_id).await;
        let mut record = self.get(record_id).await?;

        if record.status != ServiceStatus::Arrived {
            return Err(DispatchError::InvalidSubTransition(format!(
                "cannot record completion on service record '{}' in status {} (arrival required first)",
                record_id, record.status
            )));
        }
        if let Some(arrived) = record.arrival_time {
            if time < arrived {
                return Err(DispatchError::InvalidSubTransition(format!(
                    "completion time {} precedes arrival time {}",
                    time.to_rfc3339(),
                    arrived.to_rfc3339()
                )));
            }
        }

        record.status = ServiceStatus::Completed;
        record.completion_time = Some(time);
        if let Some(notes) = notes {
            record.append_notes(notes);
        }
        record.updated_at = Utc::now();

        self.store.update_service_record(&record).await?;
        log::info!("✅ Servicio {} completado", record_id);
        Ok(record)
    }

    /// Añade notas sin cambiar el sub-estado
    pub async fn append_notes(&self, record_id: Uuid, notes: &str) -> DispatchResult<ServiceRecord> {
        let _guard = self.lock_record(record_id).await;
        let mut record = self.get(record_id).await?;

        record.append_notes(notes);
        record.updated_at = Utc::now();

        self.store.update_service_record(&record).await?;
        Ok(record)
    }
}
