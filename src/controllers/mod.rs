//! Controladores HTTP
//!
//! Traducen DTOs validados a operaciones del coordinador y sus resultados
//! a respuestas.

pub mod dispatch_controller;
pub mod service_record_controller;
pub mod vehicle_controller;

use validator::{ValidationError, ValidationErrors};

use crate::utils::errors::AppError;

/// Envuelve un error de campo en `AppError::Validation`
pub(crate) fn field_error(field: &'static str, error: ValidationError) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    AppError::Validation(errors)
}
