use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::field_error;
use crate::dto::service_record_dto::{AppendNotesRequest, MilestoneRequest, RecordListQuery};
use crate::dto::ApiResponse;
use crate::models::ServiceRecord;
use crate::repositories::ServiceRecordFilter;
use crate::services::DispatchCoordinator;
use crate::utils::errors::AppResult;
use crate::utils::validation::{validate_datetime, validate_service_status};

pub struct ServiceRecordController {
    coordinator: Arc<DispatchCoordinator>,
}

impl ServiceRecordController {
    pub fn new(coordinator: Arc<DispatchCoordinator>) -> Self {
        Self { coordinator }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<ServiceRecord> {
        Ok(self.coordinator.tracker().get(id).await?)
    }

    pub async fn list(&self, query: RecordListQuery) -> AppResult<Vec<ServiceRecord>> {
        let filter = ServiceRecordFilter {
            status: query
                .status
                .as_deref()
                .map(validate_service_status)
                .transpose()
                .map_err(|e| field_error("status", e))?,
            from: query
                .from
                .as_deref()
                .map(validate_datetime)
                .transpose()
                .map_err(|e| field_error("from", e))?,
            to: query
                .to
                .as_deref()
                .map(validate_datetime)
                .transpose()
                .map_err(|e| field_error("to", e))?,
        };
        Ok(self.coordinator.list_service_records(&filter).await?)
    }

    pub async fn record_arrival(
        &self,
        id: Uuid,
        body: MilestoneRequest,
    ) -> AppResult<ApiResponse<ServiceRecord>> {
        body.validate()?;
        let time = milestone_time(&body)?;

        let record = self
            .coordinator
            .tracker()
            .record_arrival(id, time, body.notes.as_deref())
            .await?;

        Ok(ApiResponse::success_with_message(
            record,
            "Llegada registrada".to_string(),
        ))
    }

    pub async fn record_completion(
        &self,
        id: Uuid,
        body: MilestoneRequest,
    ) -> AppResult<ApiResponse<ServiceRecord>> {
        body.validate()?;
        let time = milestone_time(&body)?;

        let record = self
            .coordinator
            .tracker()
            .record_completion(id, time, body.notes.as_deref())
            .await?;

        Ok(ApiResponse::success_with_message(
            record,
            "Servicio completado".to_string(),
        ))
    }

    pub async fn append_notes(
        &self,
        id: Uuid,
        body: AppendNotesRequest,
    ) -> AppResult<ApiResponse<ServiceRecord>> {
        body.validate()?;
        let record = self.coordinator.tracker().append_notes(id, &body.notes).await?;
        Ok(ApiResponse::success(record))
    }
}

fn milestone_time(body: &MilestoneRequest) -> AppResult<DateTime<Utc>> {
    match body.time.as_deref() {
        Some(raw) => validate_datetime(raw).map_err(|e| field_error("time", e)),
        None => Ok(Utc::now()),
    }
}
