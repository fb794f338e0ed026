//! Repositorios
//!
//! Frontera con el almacenamiento durable. El núcleo de despacho solo
//! conoce los traits `DispatchStore` y `PatientResolver`; PostgreSQL y la
//! versión en memoria los implementan.

pub mod memory_store;
pub mod postgres_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AvailabilityStatus, Patient, Request, RequestStatus, ServiceRecord, ServiceStatus,
    StatusHistoryEntry, Vehicle,
};
use crate::utils::errors::StoreResult;

pub use memory_store::InMemoryDispatchStore;
pub use postgres_store::PgDispatchStore;

/// Escritura atómica de un despacho: vehículo, solicitud, registro e historial
#[derive(Debug, Clone)]
pub struct DispatchWrite {
    pub vehicle_id: Uuid,
    pub request: Request,
    pub service_record: ServiceRecord,
    pub history: StatusHistoryEntry,
}

/// Escritura atómica de una transición de estado
#[derive(Debug, Clone)]
pub struct TransitionWrite {
    /// Solicitud con el nuevo estado ya aplicado
    pub request: Request,
    /// Estado leído antes de la transición (compare-and-set)
    pub expected_status: RequestStatus,
    pub service_record: Option<ServiceRecord>,
    pub history: StatusHistoryEntry,
    pub release_vehicle: Option<Uuid>,
}

/// Filtro del historial de servicios; `from`/`to` acotan `created_at`
/// (ambos inclusivos)
#[derive(Debug, Clone, Default)]
pub struct ServiceRecordFilter {
    pub status: Option<ServiceStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ServiceRecordFilter {
    pub fn matches(&self, record: &ServiceRecord) -> bool {
        self.status.map_or(true, |s| record.status == s)
            && self.from.map_or(true, |from| record.created_at >= from)
            && self.to.map_or(true, |to| record.created_at <= to)
    }
}

/// Almacenamiento durable del motor de despacho
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Vehículos no borrados, ordenados por id
    async fn load_vehicles(&self) -> StoreResult<Vec<Vehicle>>;

    async fn find_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>>;

    /// Falla con `StoreError::Duplicate` si la matrícula ya existe
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()>;

    /// Borrado lógico; falla con `StoreError::Conflict` si está DISPATCHED
    async fn soft_delete_vehicle(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()>;

    async fn update_vehicle_location(&self, id: Uuid, location: &str) -> StoreResult<()>;

    async fn update_vehicle_availability(
        &self,
        id: Uuid,
        availability: AvailabilityStatus,
    ) -> StoreResult<()>;

    /// Todo o nada; el vehículo debe seguir AVAILABLE en el almacenamiento
    async fn persist_dispatch(&self, write: &DispatchWrite) -> StoreResult<()>;

    /// Todo o nada; falla con `StoreError::Conflict` si el estado cambió
    async fn persist_transition(&self, write: &TransitionWrite) -> StoreResult<()>;

    async fn find_request(&self, id: Uuid) -> StoreResult<Option<Request>>;

    async fn list_requests_by_status(&self, status: RequestStatus) -> StoreResult<Vec<Request>>;

    /// Historial en orden de escritura
    async fn list_history(&self, request_id: Uuid) -> StoreResult<Vec<StatusHistoryEntry>>;

    async fn find_service_record(&self, id: Uuid) -> StoreResult<Option<ServiceRecord>>;

    async fn find_service_record_by_request(
        &self,
        request_id: Uuid,
    ) -> StoreResult<Option<ServiceRecord>>;

    async fn update_service_record(&self, record: &ServiceRecord) -> StoreResult<()>;

    /// Registros que cumplen el filtro, del más reciente al más antiguo
    async fn list_service_records(
        &self,
        filter: &ServiceRecordFilter,
    ) -> StoreResult<Vec<ServiceRecord>>;
}

/// Resolución de pacientes por contacto
#[async_trait]
pub trait PatientResolver: Send + Sync {
    /// Reutiliza el paciente con ese contacto (añadiendo notas si las hay)
    /// o crea uno nuevo
    async fn find_or_create(
        &self,
        name: &str,
        contact: &str,
        notes: Option<&str>,
    ) -> StoreResult<Patient>;
}
