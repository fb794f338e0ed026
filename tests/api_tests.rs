use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use ambulance_dispatch::config::EnvironmentConfig;
use ambulance_dispatch::create_app;
use ambulance_dispatch::models::Vehicle;
use ambulance_dispatch::repositories::InMemoryDispatchStore;
use ambulance_dispatch::services::DispatchCoordinator;
use ambulance_dispatch::state::AppState;

async fn create_test_app(vehicles: usize) -> Router {
    let now = Utc::now();
    let fleet = (1..=vehicles)
        .map(|i| Vehicle::new(format!("AMB-{:03}", i), "Base central".to_string(), now))
        .collect();
    let store = Arc::new(InMemoryDispatchStore::with_vehicles(fleet));
    let coordinator = DispatchCoordinator::bootstrap(store.clone(), store)
        .await
        .unwrap();

    create_app(AppState::new(coordinator, EnvironmentConfig::default()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-actor", "operador-1");
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn emergency_body(contact: &str) -> Value {
    json!({
        "requester_name": "Ana López",
        "contact": contact,
        "location": "Calle Mayor 1",
        "emergency_description": "Dolor torácico",
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(2).await;
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["fleet"]["available"], 2);
}

#[tokio::test]
async fn test_create_request_dispatches_and_exhausts_capacity() {
    let app = create_test_app(1).await;

    let (status, body) = send(&app, "POST", "/api/requests", Some(emergency_body("+34600123456"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "DISPATCHED");
    assert!(body["data"]["vehicle_id"].is_string());

    let (status, body) = send(&app, "POST", "/api/requests", Some(emergency_body("+34600654321"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "NO_AVAILABLE_VEHICLE");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_invalid_contact_is_rejected() {
    let app = create_test_app(1).await;
    let (status, body) = send(&app, "POST", "/api/requests", Some(emergency_body("600-12"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, summary) = send(&app, "GET", "/api/vehicles/summary", None).await;
    assert_eq!(summary["data"]["available"], 1);
}

#[tokio::test]
async fn test_status_lifecycle_over_http() {
    let app = create_test_app(1).await;
    let (_, created) = send(&app, "POST", "/api/requests", Some(emergency_body("+34600123456"))).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/requests/{}/status", id),
        Some(json!({ "status": "completed", "notes": "Entregado en urgencias" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "COMPLETED");
    assert_eq!(body["data"]["allowed_transitions"], json!([]));

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/requests/{}/status", id),
        Some(json!({ "status": "CANCELLED" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = send(&app, "GET", &format!("/api/requests/{}/history", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["changed_by"], "operador-1");

    let (_, listed) = send(&app, "GET", "/api/requests?status=COMPLETED", None).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_status_and_missing_request() {
    let app = create_test_app(1).await;

    let (status, _) = send(&app, "GET", "/api/requests?status=ARRIVED", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(&app, "GET", &format!("/api/requests/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_service_record_milestones() {
    let app = create_test_app(1).await;
    let (_, created) = send(&app, "POST", "/api/requests", Some(emergency_body("+34600123456"))).await;
    let request_id = created["data"]["id"].as_str().unwrap();

    let (status, body) = send(&app, "GET", &format!("/api/requests/{}/service-record", request_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "IN_PROGRESS");
    let record_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/service-records/{}/completion", record_id),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/service-records/{}/arrival", record_id),
        Some(json!({ "time": "2030-01-01T10:00:00Z", "notes": "En el domicilio" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ARRIVED");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/service-records/{}/completion", record_id),
        Some(json!({ "time": "2030-01-01T09:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/service-records/{}/completion", record_id),
        Some(json!({ "time": "2030-01-01T10:40:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "COMPLETED");

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/service-records/{}/notes", record_id),
        Some(json!({ "notes": "Informe enviado" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["notes"].as_str().unwrap().ends_with("Informe enviado"));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/service-records/{}/arrival", record_id),
        Some(json!({ "time": "not-a-date" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", &format!("/api/service-records/{}", request_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vehicle_administration() {
    let app = create_test_app(0).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/vehicles",
        Some(json!({ "license_plate": "amb-042", "location": "Hospital Norte" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["license_plate"], "AMB-042");
    let vehicle_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/api/vehicles",
        Some(json!({ "license_plate": "AMB-042", "location": "Otro" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "PUT", &format!("/api/vehicles/{}/out-of-service", vehicle_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["availability"], "OUT_OF_SERVICE");

    let (status, _) = send(&app, "POST", "/api/vehicles/reserve", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&app, "PUT", &format!("/api/vehicles/{}/in-service", vehicle_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/api/vehicles/reserve", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["availability"], "DISPATCHED");

    let (status, body) = send(&app, "POST", &format!("/api/vehicles/{}/release", vehicle_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["availability"], "AVAILABLE");
}

#[tokio::test]
async fn test_duplicate_plate_is_a_conflict_not_a_fault() {
    let app = create_test_app(1).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/vehicles",
        Some(json!({ "license_plate": " amb-001 ", "location": "Base sur" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_vehicle_location_and_deregistration() {
    let app = create_test_app(2).await;
    let (_, body) = send(&app, "GET", "/api/vehicles", None).await;
    let ids: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/vehicles/{}/location", ids[0]),
        Some(json!({ "location": "Hospital Sur" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["location"], "Hospital Sur");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/vehicles/{}/location", ids[0]),
        Some(json!({ "location": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // El primero de la cola sale con el despacho y no puede darse de baja
    let (_, body) = send(&app, "POST", "/api/requests", Some(emergency_body("+34600000001"))).await;
    let busy = body["data"]["vehicle_id"].as_str().unwrap().to_string();
    let idle = ids.iter().find(|id| **id != busy).unwrap().clone();

    let (status, _) = send(&app, "DELETE", &format!("/api/vehicles/{}", busy), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "DELETE", &format!("/api/vehicles/{}", idle), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &format!("/api/vehicles/{}", idle), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/vehicles/summary", None).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["dispatched"], 1);
}

#[tokio::test]
async fn test_service_record_history_filters() {
    let app = create_test_app(2).await;
    let (_, first) = send(&app, "POST", "/api/requests", Some(emergency_body("+34600000001"))).await;
    let (_, _second) = send(&app, "POST", "/api/requests", Some(emergency_body("+34600000002"))).await;
    let first_id = first["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/requests/{}/status", first_id),
        Some(json!({ "status": "CANCELLED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/service-records", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, "GET", "/api/service-records?status=cancelled", None).await;
    let cancelled = body["data"].as_array().unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0]["request_id"], first_id.as_str());

    let (_, body) = send(
        &app,
        "GET",
        "/api/service-records?from=2000-01-01T00:00:00Z&to=2000-12-31T00:00:00Z",
        None,
    )
    .await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = send(&app, "GET", "/api/service-records?status=PARKED", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
