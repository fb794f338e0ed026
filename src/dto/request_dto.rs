use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{NewEmergency, Request, RequestStatus, StatusHistoryEntry};
use crate::services::request_lifecycle;
use crate::utils::validation::{validate_contact, validate_not_empty};

// Request para registrar una emergencia
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEmergencyRequest {
    #[validate(length(max = 120), custom = "validate_not_empty")]
    pub requester_name: String,
    #[validate(custom = "validate_contact")]
    pub contact: String,
    #[validate(length(max = 500), custom = "validate_not_empty")]
    pub location: String,
    #[validate(length(max = 2000))]
    pub emergency_description: Option<String>,
    #[validate(length(max = 2000))]
    pub medical_notes: Option<String>,
}

impl From<CreateEmergencyRequest> for NewEmergency {
    fn from(body: CreateEmergencyRequest) -> Self {
        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        NewEmergency {
            requester_name: body.requester_name.trim().to_string(),
            contact: body.contact.trim().to_string(),
            location: body.location.trim().to_string(),
            emergency_description: non_blank(body.emergency_description),
            medical_notes: non_blank(body.medical_notes),
        }
    }
}

// Request para cambiar el estado de una solicitud
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

// Filtro del listado
#[derive(Debug, Deserialize)]
pub struct RequestListQuery {
    pub status: Option<String>,
}

// Response de solicitud
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestResponse {
    pub id: Uuid,
    pub requester_name: String,
    pub contact: String,
    pub location: String,
    pub emergency_description: Option<String>,
    pub medical_notes: Option<String>,
    pub status: RequestStatus,
    pub allowed_transitions: Vec<RequestStatus>,
    pub patient_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub dispatch_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Request> for RequestResponse {
    fn from(request: Request) -> Self {
        Self {
            allowed_transitions: request_lifecycle::allowed_targets(request.status)
                .iter()
                .copied()
                .filter(|s| *s != RequestStatus::Dispatched)
                .collect(),
            id: request.id,
            requester_name: request.requester_name,
            contact: request.contact,
            location: request.location,
            emergency_description: request.emergency_description,
            medical_notes: request.medical_notes,
            status: request.status,
            patient_id: request.patient_id,
            vehicle_id: request.vehicle_id,
            dispatch_time: request.dispatch_time,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

// Entrada del historial
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    pub old_status: Option<RequestStatus>,
    pub new_status: RequestStatus,
    pub notes: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

impl From<StatusHistoryEntry> for HistoryEntryResponse {
    fn from(entry: StatusHistoryEntry) -> Self {
        Self {
            old_status: entry.old_status,
            new_status: entry.new_status,
            notes: entry.notes,
            changed_by: entry.changed_by,
            changed_at: entry.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(contact: &str, location: &str) -> CreateEmergencyRequest {
        CreateEmergencyRequest {
            requester_name: "Ana López".to_string(),
            contact: contact.to_string(),
            location: location.to_string(),
            emergency_description: Some("  ".to_string()),
            medical_notes: Some(" Alergia a penicilina ".to_string()),
        }
    }

    #[test]
    fn test_create_emergency_validation() {
        assert!(body("+34600123456", "Calle Mayor 1").validate().is_ok());

        let errors = body("600-12", "Calle Mayor 1").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("contact"));

        let errors = body("+34600123456", "  ").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("location"));
    }

    #[test]
    fn test_blank_optionals_are_dropped() {
        let emergency = NewEmergency::from(body("+34600123456", " Calle Mayor 1 "));
        assert_eq!(emergency.location, "Calle Mayor 1");
        assert_eq!(emergency.emergency_description, None);
        assert_eq!(emergency.medical_notes.as_deref(), Some("Alergia a penicilina"));
    }
}
