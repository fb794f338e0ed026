//! Sistema de manejo de errores
//!
//! Este módulo define los errores del motor de despacho, los errores del
//! almacenamiento durable y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::request::RequestStatus;

/// Errores del almacenamiento durable
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// La fila cambió de estado entre la lectura y la escritura
    #[error("Stale write on {entity} '{id}'")]
    Conflict { entity: &'static str, id: Uuid },

    /// Violación de una restricción de unicidad
    #[error("Duplicate {entity} '{key}'")]
    Duplicate { entity: &'static str, key: String },

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Resultado tipado del almacenamiento
pub type StoreResult<T> = Result<T, StoreError>;

/// Errores del núcleo de despacho
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Capacidad agotada: resultado esperado, el llamador puede reintentar
    #[error("No available vehicle to dispatch")]
    NoAvailableVehicle,

    #[error("Request '{0}' not found")]
    RequestNotFound(Uuid),

    #[error("Unknown vehicle '{0}'")]
    UnknownVehicle(Uuid),

    #[error("Vehicle '{0}' is dispatched and cannot change service state")]
    VehicleInUse(Uuid),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },

    #[error("Invalid service record transition: {0}")]
    InvalidSubTransition(String),

    #[error("Service record '{0}' not found")]
    RecordNotFound(Uuid),

    #[error("A vehicle with license plate '{0}' already exists")]
    DuplicateLicensePlate(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl DispatchError {
    /// Solo la falta de capacidad tiene sentido reintentarla más tarde
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::NoAvailableVehicle)
    }
}

/// Resultado tipado para operaciones del núcleo
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("No capacity: {0}")]
    NoCapacity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NoAvailableVehicle => AppError::NoCapacity(err.to_string()),
            DispatchError::RequestNotFound(_)
            | DispatchError::UnknownVehicle(_)
            | DispatchError::RecordNotFound(_) => AppError::NotFound(err.to_string()),
            DispatchError::VehicleInUse(_)
            | DispatchError::InvalidTransition { .. }
            | DispatchError::InvalidSubTransition(_)
            | DispatchError::DuplicateLicensePlate(_) => AppError::Conflict(err.to_string()),
            DispatchError::Persistence(e @ StoreError::Duplicate { .. }) => {
                AppError::Conflict(e.to_string())
            }
            DispatchError::Persistence(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::Validation(e) => {
                log::warn!("Validation error: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: "Validation Error".to_string(),
                        message: "The provided data is invalid".to_string(),
                        details: Some(json!(e)),
                        code: Some("VALIDATION_ERROR".to_string()),
                        retryable: false,
                    },
                )
            }

            AppError::NoCapacity(msg) => {
                log::warn!("🚑 Capacity exhausted: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse {
                        error: "No Available Vehicle".to_string(),
                        message: msg,
                        details: None,
                        code: Some("NO_AVAILABLE_VEHICLE".to_string()),
                        retryable: true,
                    },
                )
            }

            AppError::NotFound(msg) => {
                log::info!("Resource not found: {}", msg);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse {
                        error: "Not Found".to_string(),
                        message: msg,
                        details: None,
                        code: Some("NOT_FOUND".to_string()),
                        retryable: false,
                    },
                )
            }

            AppError::Conflict(msg) => {
                log::info!("Conflict: {}", msg);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse {
                        error: "Conflict".to_string(),
                        message: msg,
                        details: None,
                        code: Some("CONFLICT".to_string()),
                        retryable: false,
                    },
                )
            }

            AppError::Internal(msg) => {
                log::error!("❌ Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal Server Error".to_string(),
                        message: "An unexpected error occurred".to_string(),
                        details: Some(json!({ "internal_error": msg })),
                        code: Some("INTERNAL_ERROR".to_string()),
                        retryable: false,
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;
