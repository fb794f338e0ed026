use serde::Deserialize;
use validator::Validate;

use crate::utils::validation::validate_not_empty;

// Llegada o finalización; sin `time` se usa la hora actual
#[derive(Debug, Default, Deserialize, Validate)]
pub struct MilestoneRequest {
    /// RFC3339
    pub time: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AppendNotesRequest {
    #[validate(length(max = 2000), custom = "validate_not_empty")]
    pub notes: String,
}

// Filtros del historial de servicios; fechas RFC3339 sobre created_at
#[derive(Debug, Default, Deserialize)]
pub struct RecordListQuery {
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}
