//! Modelos de datos
//!
//! Este módulo contiene los structs que representan las entidades del
//! sistema de despacho y que mapean a las tablas de PostgreSQL.

pub mod audit;
pub mod patient;
pub mod request;
pub mod service_record;
pub mod vehicle;

pub use audit::AuditFields;
pub use patient::Patient;
pub use request::{NewEmergency, Request, RequestStatus, StatusHistoryEntry};
pub use service_record::{ServiceRecord, ServiceStatus};
pub use vehicle::{AvailabilityStatus, Vehicle};
