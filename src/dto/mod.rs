//! DTOs de la API HTTP
//!
//! Cuerpos de entrada validados con `validator` y respuestas serializables.

pub mod api_response;
pub mod request_dto;
pub mod service_record_dto;
pub mod vehicle_dto;

pub use api_response::ApiResponse;
