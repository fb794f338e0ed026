//! Modelo de ServiceRecord
//!
//! Registro operativo de un despacho: llegada, finalización y notas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sub-estado del registro - mapea al ENUM service_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "service_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    InProgress,
    Arrived,
    Completed,
    /// La solicitud se canceló con el registro abierto
    Cancelled,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::InProgress => "IN_PROGRESS",
            ServiceStatus::Arrived => "ARRIVED",
            ServiceStatus::Completed => "COMPLETED",
            ServiceStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ServiceStatus::Completed | ServiceStatus::Cancelled)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN_PROGRESS" => Ok(ServiceStatus::InProgress),
            "ARRIVED" => Ok(ServiceStatus::Arrived),
            "COMPLETED" => Ok(ServiceStatus::Completed),
            "CANCELLED" => Ok(ServiceStatus::Cancelled),
            other => Err(format!("unknown service status '{}'", other)),
        }
    }
}

/// ServiceRecord principal - mapea a la tabla service_records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ServiceRecord {
    pub id: Uuid,
    pub request_id: Uuid,
    pub patient_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: ServiceStatus,
    pub arrival_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRecord {
    /// Añade notas al final, separadas por salto de línea
    pub fn append_notes(&mut self, notes: &str) {
        let notes = notes.trim();
        if notes.is_empty() {
            return;
        }
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, notes),
            _ => notes.to_string(),
        });
    }
}
