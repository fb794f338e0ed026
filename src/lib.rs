//! Motor de despacho de ambulancias
//!
//! Acepta emergencias, asigna el siguiente vehículo libre en orden FIFO,
//! abre el registro de servicio y aplica el ciclo de vida de la solicitud
//! hasta liberar el vehículo.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use middleware::cors::cors_for;
use state::AppState;

/// Router completo de la API
pub fn create_app(state: AppState) -> Router {
    let cors = cors_for(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/api/requests", routes::request_routes::create_request_router())
        .nest(
            "/api/service-records",
            routes::service_record_routes::create_service_record_router(),
        )
        .nest("/api/vehicles", routes::vehicle_routes::create_vehicle_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "environment": state.config.environment,
        "fleet": state.coordinator.fleet_summary(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
