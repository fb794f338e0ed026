//! Modelo de Request
//!
//! Solicitud de traslado de emergencia, su estado y el historial
//! append-only de transiciones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Estado de la solicitud - mapea al ENUM request_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "request_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Dispatched,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Dispatched => "DISPATCHED",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "DISPATCHED" => Ok(RequestStatus::Dispatched),
            "COMPLETED" => Ok(RequestStatus::Completed),
            "CANCELLED" => Ok(RequestStatus::Cancelled),
            other => Err(format!("unknown request status '{}'", other)),
        }
    }
}

/// Request principal - mapea a la tabla requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Request {
    pub id: Uuid,
    pub requester_name: String,
    pub contact: String,
    pub location: String,
    pub emergency_description: Option<String>,
    pub medical_notes: Option<String>,
    pub status: RequestStatus,
    pub patient_id: Option<Uuid>,
    /// Se conserva tras COMPLETED/CANCELLED para el historial
    pub vehicle_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub dispatch_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Datos de entrada de una emergencia ya validada
#[derive(Debug, Clone)]
pub struct NewEmergency {
    pub requester_name: String,
    pub contact: String,
    pub location: String,
    pub emergency_description: Option<String>,
    pub medical_notes: Option<String>,
}

impl NewEmergency {
    pub fn new(requester_name: &str, contact: &str, location: &str) -> Self {
        Self {
            requester_name: requester_name.to_string(),
            contact: contact.to_string(),
            location: location.to_string(),
            emergency_description: None,
            medical_notes: None,
        }
    }
}

/// Entrada inmutable del historial de estados
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub request_id: Uuid,
    pub old_status: Option<RequestStatus>,
    pub new_status: RequestStatus,
    pub notes: Option<String>,
    pub changed_by: String,
    pub created_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn record(
        request_id: Uuid,
        old_status: Option<RequestStatus>,
        new_status: RequestStatus,
        notes: Option<String>,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            old_status,
            new_status,
            notes,
            changed_by: actor.unwrap_or(SYSTEM_ACTOR).to_string(),
            created_at: now,
        }
    }
}

/// Actor por defecto cuando la transición no trae identidad
pub const SYSTEM_ACTOR: &str = "system";
