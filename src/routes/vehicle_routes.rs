use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::vehicle_controller::VehicleController;
use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateLocationRequest, VehicleResponse};
use crate::dto::ApiResponse;
use crate::services::FleetSummary;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(create_vehicle))
        .route("/summary", get(fleet_summary))
        .route("/reserve", post(reserve_vehicle))
        .route("/:id", delete(deregister_vehicle))
        .route("/:id/location", put(update_location))
        .route("/:id/out-of-service", put(set_out_of_service))
        .route("/:id/in-service", put(set_in_service))
        .route("/:id/release", post(release_vehicle))
}

async fn create_vehicle(
    State(state): State<AppState>,
    Json(body): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VehicleResponse>>), AppError> {
    let controller = VehicleController::new(state.coordinator.clone());
    let response = controller.create(body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_vehicles(State(state): State<AppState>) -> Json<ApiResponse<Vec<VehicleResponse>>> {
    let controller = VehicleController::new(state.coordinator.clone());
    Json(ApiResponse::success(controller.list()))
}

async fn fleet_summary(State(state): State<AppState>) -> Json<ApiResponse<FleetSummary>> {
    let controller = VehicleController::new(state.coordinator.clone());
    Json(ApiResponse::success(controller.summary()))
}

async fn deregister_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.coordinator.clone());
    let response = controller.deregister(id).await?;
    Ok(Json(response))
}

async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLocationRequest>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.coordinator.clone());
    let response = controller.update_location(id, body).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn set_out_of_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.coordinator.clone());
    let response = controller.set_out_of_service(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn set_in_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.coordinator.clone());
    let response = controller.set_in_service(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn reserve_vehicle(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.coordinator.clone());
    let response = controller.reserve().await?;
    Ok(Json(response))
}

async fn release_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.coordinator.clone());
    let response = controller.release(id).await?;
    Ok(Json(response))
}
