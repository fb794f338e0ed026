use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{AvailabilityStatus, Vehicle};
use crate::utils::validation::validate_not_empty;

// Request para crear un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(max = 20), custom = "validate_not_empty")]
    pub license_plate: String,
    #[validate(length(max = 500), custom = "validate_not_empty")]
    pub location: String,
}

// Request para mover un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(length(max = 500), custom = "validate_not_empty")]
    pub location: String,
}

// Response de vehículo
#[derive(Debug, Serialize, Deserialize)]
pub struct VehicleResponse {
    pub id: Uuid,
    pub license_plate: String,
    pub location: String,
    pub availability: AvailabilityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vehicle> for VehicleResponse {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            id: vehicle.id,
            license_plate: vehicle.license_plate,
            location: vehicle.location,
            availability: vehicle.availability,
            created_at: vehicle.audit.created_at,
            updated_at: vehicle.audit.updated_at,
        }
    }
}
