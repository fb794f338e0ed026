use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::service_record_controller::ServiceRecordController;
use crate::dto::service_record_dto::{AppendNotesRequest, MilestoneRequest, RecordListQuery};
use crate::dto::ApiResponse;
use crate::models::ServiceRecord;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_service_record_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_records))
        .route("/:id", get(get_record))
        .route("/:id/arrival", post(record_arrival))
        .route("/:id/completion", post(record_completion))
        .route("/:id/notes", patch(append_notes))
}

async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordListQuery>,
) -> Result<Json<ApiResponse<Vec<ServiceRecord>>>, AppError> {
    let controller = ServiceRecordController::new(state.coordinator.clone());
    let records = controller.list(query).await?;
    Ok(Json(ApiResponse::success(records)))
}

async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ServiceRecord>>, AppError> {
    let controller = ServiceRecordController::new(state.coordinator.clone());
    let record = controller.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

async fn record_arrival(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<MilestoneRequest>>,
) -> Result<Json<ApiResponse<ServiceRecord>>, AppError> {
    let controller = ServiceRecordController::new(state.coordinator.clone());
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let response = controller.record_arrival(id, body).await?;
    Ok(Json(response))
}

async fn record_completion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<MilestoneRequest>>,
) -> Result<Json<ApiResponse<ServiceRecord>>, AppError> {
    let controller = ServiceRecordController::new(state.coordinator.clone());
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let response = controller.record_completion(id, body).await?;
    Ok(Json(response))
}

async fn append_notes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AppendNotesRequest>,
) -> Result<Json<ApiResponse<ServiceRecord>>, AppError> {
    let controller = ServiceRecordController::new(state.coordinator.clone());
    let response = controller.append_notes(id, body).await?;
    Ok(Json(response))
}
