//! Servicios del motor de despacho
//!
//! Registro de disponibilidad, máquina de estados de la solicitud,
//! seguimiento del registro de servicio y el coordinador que los une.

pub mod availability_registry;
pub mod dispatch_coordinator;
pub mod keyed_lock;
pub mod request_lifecycle;
pub mod service_record_tracker;

pub use availability_registry::{AvailabilityRegistry, FleetSummary, Reservation};
pub use dispatch_coordinator::DispatchCoordinator;
pub use service_record_tracker::ServiceRecordTracker;
