//! Modelo de Vehicle
//!
//! Unidad despachable (ambulancia) con su estado de disponibilidad.
//! Mapea a la tabla `vehicles` y al ENUM `availability_status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use uuid::Uuid;

use super::audit::AuditFields;

/// Estado de disponibilidad - mapea al ENUM availability_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "availability_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    Available,
    Dispatched,
    OutOfService,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "AVAILABLE",
            AvailabilityStatus::Dispatched => "DISPATCHED",
            AvailabilityStatus::OutOfService => "OUT_OF_SERVICE",
        }
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle principal - mapea a la tabla vehicles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub license_plate: String,
    pub location: String,
    pub availability: AvailabilityStatus,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Vehicle {
    pub fn new(license_plate: String, location: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            license_plate,
            location,
            availability: AvailabilityStatus::Available,
            audit: AuditFields::new(now),
        }
    }

    pub fn is_available(&self) -> bool {
        self.availability == AvailabilityStatus::Available
    }
}
