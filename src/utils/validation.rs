//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! de entrada y conversión de tipos.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

use crate::models::request::RequestStatus;
use crate::models::service_record::ServiceStatus;

lazy_static! {
    /// Teléfono de contacto: prefijo `+` opcional y de 10 a 15 dígitos
    static ref CONTACT_REGEX: Regex = Regex::new(r"^[+]?[0-9]{10,15}$").unwrap();
}

/// Validar formato de teléfono de contacto
pub fn validate_contact(value: &str) -> Result<(), ValidationError> {
    if !CONTACT_REGEX.is_match(value.trim()) {
        let mut error = ValidationError::new("contact");
        error.add_param("value".into(), &value.to_string());
        error.add_param("format".into(), &"+0123456789 (10-15 digits)".to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar y convertir string a datetime
pub fn validate_datetime(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            let mut error = ValidationError::new("datetime");
            error.add_param("value".into(), &value.to_string());
            error.add_param("format".into(), &"RFC3339".to_string());
            error
        })
}

/// Validar y convertir string a estado de solicitud
pub fn validate_request_status(value: &str) -> Result<RequestStatus, ValidationError> {
    value.trim().parse::<RequestStatus>().map_err(|_| {
        let mut error = ValidationError::new("request_status");
        error.add_param("value".into(), &value.to_string());
        error.add_param(
            "allowed_values".into(),
            &"PENDING, DISPATCHED, COMPLETED, CANCELLED".to_string(),
        );
        error
    })
}

/// Validar y convertir string a estado de registro de servicio
pub fn validate_service_status(value: &str) -> Result<ServiceStatus, ValidationError> {
    value.trim().parse::<ServiceStatus>().map_err(|_| {
        let mut error = ValidationError::new("service_status");
        error.add_param("value".into(), &value.to_string());
        error.add_param(
            "allowed_values".into(),
            &"IN_PROGRESS, ARRIVED, COMPLETED, CANCELLED".to_string(),
        );
        error
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_contact() {
        assert!(validate_contact("+34600123456").is_ok());
        assert!(validate_contact("0600123456").is_ok());
        assert!(validate_contact("600-123-456").is_err());
        assert!(validate_contact("12345").is_err());
        assert!(validate_contact("").is_err());
    }

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("Calle Mayor 1").is_ok());
        assert!(validate_not_empty("   ").is_err());
    }

    #[test]
    fn test_validate_datetime() {
        let parsed = validate_datetime("2025-03-01T10:15:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-03-01T10:15:00+00:00");
        assert!(validate_datetime("ayer").is_err());
    }

    #[test]
    fn test_validate_request_status() {
        assert_eq!(validate_request_status("completed").unwrap(), RequestStatus::Completed);
        assert_eq!(validate_request_status("CANCELLED").unwrap(), RequestStatus::Cancelled);
        assert!(validate_request_status("ARRIVED").is_err());
    }

    #[test]
    fn test_validate_service_status() {
        assert_eq!(validate_service_status("in_progress").unwrap(), ServiceStatus::InProgress);
        assert_eq!(validate_service_status(" ARRIVED ").unwrap(), ServiceStatus::Arrived);
        assert!(validate_service_status("DISPATCHED").is_err());
    }
}
