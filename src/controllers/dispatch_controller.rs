use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use super::field_error;
use crate::dto::request_dto::{
    CreateEmergencyRequest, HistoryEntryResponse, RequestListQuery, RequestResponse,
    UpdateStatusRequest,
};
use crate::dto::ApiResponse;
use crate::models::{NewEmergency, RequestStatus, ServiceRecord};
use crate::services::DispatchCoordinator;
use crate::utils::errors::AppError;
use crate::utils::validation::validate_request_status;

const ALL_STATUSES: [RequestStatus; 4] = [
    RequestStatus::Pending,
    RequestStatus::Dispatched,
    RequestStatus::Completed,
    RequestStatus::Cancelled,
];

pub struct DispatchController {
    coordinator: Arc<DispatchCoordinator>,
}

impl DispatchController {
    pub fn new(coordinator: Arc<DispatchCoordinator>) -> Self {
        Self { coordinator }
    }

    pub async fn create(
        &self,
        body: CreateEmergencyRequest,
        actor: Option<&str>,
    ) -> Result<ApiResponse<RequestResponse>, AppError> {
        body.validate()?;

        let request = self
            .coordinator
            .create_and_dispatch(NewEmergency::from(body), actor)
            .await?;

        Ok(ApiResponse::success_with_message(
            RequestResponse::from(request),
            "Ambulancia despachada".to_string(),
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<RequestResponse, AppError> {
        let request = self.coordinator.get_request(id).await?;
        Ok(RequestResponse::from(request))
    }

    /// Sin filtro devuelve todas, más recientes primero
    pub async fn list(&self, query: RequestListQuery) -> Result<Vec<RequestResponse>, AppError> {
        let statuses = match query.status.as_deref() {
            Some(raw) => vec![validate_request_status(raw).map_err(|e| field_error("status", e))?],
            None => ALL_STATUSES.to_vec(),
        };

        let mut requests = Vec::new();
        for status in statuses {
            requests.extend(self.coordinator.list_requests_by_status(status).await?);
        }
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(requests.into_iter().map(RequestResponse::from).collect())
    }

    pub async fn history(&self, id: Uuid) -> Result<Vec<HistoryEntryResponse>, AppError> {
        let entries = self.coordinator.request_history(id).await?;
        Ok(entries.into_iter().map(HistoryEntryResponse::from).collect())
    }

    /// Registro de servicio abierto por el despacho de la solicitud
    pub async fn service_record(&self, id: Uuid) -> Result<ServiceRecord, AppError> {
        let request = self.coordinator.get_request(id).await?;
        self.coordinator
            .tracker()
            .find_by_request(request.id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Request '{}' has no service record", request.id))
            })
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        body: UpdateStatusRequest,
        actor: Option<&str>,
    ) -> Result<ApiResponse<RequestResponse>, AppError> {
        body.validate()?;
        let status = validate_request_status(&body.status).map_err(|e| field_error("status", e))?;
        let notes = body.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

        let request = self
            .coordinator
            .transition_status(id, status, notes, actor)
            .await?;

        Ok(ApiResponse::success_with_message(
            RequestResponse::from(request),
            format!("Solicitud actualizada a {}", status),
        ))
    }
}
