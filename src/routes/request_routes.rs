use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::dispatch_controller::DispatchController;
use crate::dto::request_dto::{
    CreateEmergencyRequest, HistoryEntryResponse, RequestListQuery, RequestResponse,
    UpdateStatusRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::Actor;
use crate::models::ServiceRecord;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_request_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests).post(create_request))
        .route("/:id", get(get_request))
        .route("/:id/history", get(get_history))
        .route("/:id/service-record", get(get_service_record))
        .route("/:id/status", put(update_status))
}

async fn create_request(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<CreateEmergencyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RequestResponse>>), AppError> {
    let controller = DispatchController::new(state.coordinator.clone());
    let response = controller.create(body, actor.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<ApiResponse<Vec<RequestResponse>>>, AppError> {
    let controller = DispatchController::new(state.coordinator.clone());
    let response = controller.list(query).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RequestResponse>>, AppError> {
    let controller = DispatchController::new(state.coordinator.clone());
    let response = controller.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<HistoryEntryResponse>>>, AppError> {
    let controller = DispatchController::new(state.coordinator.clone());
    let response = controller.history(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn get_service_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ServiceRecord>>, AppError> {
    let controller = DispatchController::new(state.coordinator.clone());
    let record = controller.service_record(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<RequestResponse>>, AppError> {
    let controller = DispatchController::new(state.coordinator.clone());
    let response = controller.update_status(id, body, actor.as_deref()).await?;
    Ok(Json(response))
}
