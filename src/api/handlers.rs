use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode, Uri},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use utoipa::OpenApi;

use super::{
    dto::{
        EndpointDto, HealthDto, ReadingCreatedDto, RecentReadingsDto, SensorReadingDto,
        SensorReadingPayload, ServiceDescriptorDto,
    },
    errors::{ApiError, SUGGESTED_ENDPOINTS},
    validation, AppState,
};
use crate::{alerts, store::RECENT_LIMIT};

// ---------------------------------------------------------------------------
// Sensor readings
// ---------------------------------------------------------------------------

/// Store one reading and report any threshold alerts it trips.
///
/// Alerts never block the insert: a reading over both limits is still
/// stored and acknowledged with `201`.
#[utoipa::path(
    post,
    path = "/api/sensor",
    request_body = SensorReadingPayload,
    responses(
        (status = 201, description = "Reading stored", body = ReadingCreatedDto),
        (status = 400, description = "Required fields missing or invalid"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "sensors"
)]
pub async fn ingest_reading(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ReadingCreatedDto>), ApiError> {
    let body = match payload {
        Ok(Json(body)) => body,
        // Non-JSON content types are read as an empty body.
        Err(JsonRejection::MissingJsonContentType(_)) => Value::Null,
        Err(rejection) => return Err(ApiError::MalformedBody(rejection.body_text())),
    };

    let reading = validation::parse_reading(&body)?;
    let stored = state
        .store
        .create_reading(reading)
        .await
        .map_err(ApiError::ingest_failed)?;

    let alerts = alerts::for_reading(&stored);
    if !alerts.is_empty() {
        warn!(
            device_id = %stored.device_id,
            alerts = %alerts.join(alerts::LOG_SEPARATOR),
            "Sensor alerts raised"
        );
    }
    info!(device_id = %stored.device_id, id = %stored.id, "Sensor reading stored");

    Ok((
        StatusCode::CREATED,
        Json(ReadingCreatedDto {
            success: true,
            id: stored.id,
            received_at: stored.received_at,
            alerts,
        }),
    ))
}

/// Fetch the 100 most recent readings, newest `receivedAt` first.
#[utoipa::path(
    get,
    path = "/api/sensor",
    responses(
        (status = 200, description = "Most recent readings", body = RecentReadingsDto),
        (status = 500, description = "Storage failure"),
    ),
    tag = "sensors"
)]
pub async fn get_recent_readings(
    State(state): State<AppState>,
) -> Result<Json<RecentReadingsDto>, ApiError> {
    let rows = state
        .store
        .find_recent(RECENT_LIMIT)
        .await
        .map_err(ApiError::query_failed)?;

    Ok(Json(rows.into()))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Longest `/health` waits on the database before reporting it disconnected.
pub const HEALTH_DB_TIMEOUT: Duration = Duration::from_secs(2);

/// Liveness plus a database ping bounded by [`HEALTH_DB_TIMEOUT`]. Always `200`.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthDto),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthDto> {
    let connected = tokio::time::timeout(HEALTH_DB_TIMEOUT, state.store.is_connected())
        .await
        .unwrap_or(false);
    let database = if connected { "connected" } else { "disconnected" };

    Json(HealthDto {
        status: "operational".to_owned(),
        database: database.to_owned(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service descriptor", body = ServiceDescriptorDto),
    ),
    tag = "system"
)]
pub async fn service_descriptor() -> Json<ServiceDescriptorDto> {
    let endpoint = |method: &str, path: &str, description: &str| EndpointDto {
        method: method.to_owned(),
        path: path.to_owned(),
        description: description.to_owned(),
    };

    Json(ServiceDescriptorDto {
        name: "Motor Monitoring API".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        endpoints: vec![
            endpoint("POST", "/api/sensor", "Submit a sensor reading"),
            endpoint("GET", "/api/sensor", "Fetch the latest 100 readings"),
            endpoint("GET", "/health", "Check service status"),
        ],
    })
}

/// Fallback for unknown paths and unsupported methods on known paths.
pub async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "path": uri.path(),
            "method": method.as_str(),
            "suggestedEndpoints": SUGGESTED_ENDPOINTS,
        })),
    )
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(ingest_reading, get_recent_readings, health, service_descriptor),
    components(schemas(
        SensorReadingPayload,
        ReadingCreatedDto,
        SensorReadingDto,
        RecentReadingsDto,
        HealthDto,
        ServiceDescriptorDto,
        EndpointDto,
    )),
    tags(
        (name = "sensors", description = "Motor sensor readings"),
        (name = "system",  description = "System endpoints"),
    ),
    info(
        title = "Motor Monitoring API",
        version = "0.1.0",
        description = "Ingestion and retrieval of motor vibration and temperature readings"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, Instant},
    };

    use async_trait::async_trait;
    use axum::{http::StatusCode, routing::get, Router};
    use axum_test::TestServer;
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};

    use crate::{
        api::{router, with_layers, AppState},
        config::Environment,
        db::models::{NewSensorReading, SensorReading},
        store::{InMemoryReadingStore, ReadingStore, StoreError},
    };

    /// Store whose every operation fails as if the database were down.
    struct UnavailableStore;

    #[async_trait]
    impl ReadingStore for UnavailableStore {
        async fn create_reading(&self, _: NewSensorReading) -> Result<SensorReading, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn find_recent(&self, _: usize) -> Result<Vec<SensorReading>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn is_connected(&self) -> bool {
            false
        }
    }

    /// Store whose ping never answers, like a pool waiting on an unreachable host.
    struct HangingStore;

    #[async_trait]
    impl ReadingStore for HangingStore {
        async fn create_reading(&self, _: NewSensorReading) -> Result<SensorReading, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn find_recent(&self, _: usize) -> Result<Vec<SensorReading>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn is_connected(&self) -> bool {
            tokio::time::sleep(Duration::from_secs(30)).await;
            true
        }
    }

    fn test_server(store: InMemoryReadingStore) -> TestServer {
        let state = AppState::new(Arc::new(store));
        TestServer::new(router(state, Environment::Production)).unwrap()
    }

    fn unavailable_server() -> TestServer {
        let state = AppState::new(Arc::new(UnavailableStore));
        TestServer::new(router(state, Environment::Production)).unwrap()
    }

    fn new_reading(device_id: &str, vibration: f64) -> NewSensorReading {
        NewSensorReading {
            device_id: device_id.to_owned(),
            vibration,
            temperature: 30.0,
            humidity: Some(45.0),
            acc_x: Some(0.0),
            acc_y: Some(0.0),
            acc_z: Some(1.0),
            timestamp: Some(1_700_000_000_000),
        }
    }

    // -----------------------------------------------------------------------
    // POST /api/sensor
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn ingest_valid_reading_returns_created() {
        let store = InMemoryReadingStore::new();
        let server = test_server(store.clone());
        let before = Utc::now();

        let resp = server
            .post("/api/sensor")
            .json(&json!({
                "deviceId": "M1",
                "vibration": 0.8,
                "temperature": 41.5,
                "humidity": 52.0,
                "accX": 0.01,
                "accY": 0.02,
                "accZ": 0.99,
                "timestamp": 1_700_000_000_000_i64,
            }))
            .await;
        resp.assert_status(StatusCode::CREATED);

        let body: Value = resp.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["alerts"], json!([]));

        let received_at: DateTime<Utc> =
            serde_json::from_value(body["receivedAt"].clone()).unwrap();
        assert!(received_at >= before);

        let stored = store.find_recent(1).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(body["id"], stored[0].id.to_string());
        assert_eq!(stored[0].received_at, received_at);
    }

    #[tokio::test]
    async fn ingest_both_alerts_vibration_first() {
        let server = test_server(InMemoryReadingStore::new());

        let resp = server
            .post("/api/sensor")
            .json(&json!({ "deviceId": "M1", "vibration": 2.5, "temperature": 65 }))
            .await;
        resp.assert_status(StatusCode::CREATED);

        let body: Value = resp.json();
        let alerts = body["alerts"].as_array().unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0], "High vibration: 2.5g");
        assert_eq!(alerts[1], "Critical temperature: 65°C");
    }

    #[tokio::test]
    async fn ingest_thresholds_are_exclusive() {
        let server = test_server(InMemoryReadingStore::new());

        let resp = server
            .post("/api/sensor")
            .json(&json!({ "deviceId": "M1", "vibration": 2.0, "temperature": 60 }))
            .await;
        resp.assert_status(StatusCode::CREATED);
        assert_eq!(resp.json::<Value>()["alerts"], json!([]));

        let resp = server
            .post("/api/sensor")
            .json(&json!({ "deviceId": "M1", "vibration": 2.1, "temperature": 60.1 }))
            .await;
        assert_eq!(
            resp.json::<Value>()["alerts"],
            json!(["High vibration: 2.1g", "Critical temperature: 60.1°C"])
        );
    }

    #[tokio::test]
    async fn ingest_coerces_numeric_strings() {
        let store = InMemoryReadingStore::new();
        let server = test_server(store.clone());

        let resp = server
            .post("/api/sensor")
            .json(&json!({
                "deviceId": "M1",
                "vibration": "2.5",
                "temperature": "65",
                "timestamp": 1.7e12,
            }))
            .await;
        resp.assert_status(StatusCode::CREATED);
        assert_eq!(
            resp.json::<Value>()["alerts"],
            json!(["High vibration: 2.5g", "Critical temperature: 65°C"])
        );

        let stored = store.find_recent(1).await.unwrap();
        assert_eq!(stored[0].timestamp, Some(1_700_000_000_000));
    }

    #[tokio::test]
    async fn ingest_missing_fields_is_bad_request_and_not_stored() {
        let store = InMemoryReadingStore::new();
        let server = test_server(store.clone());

        let resp = server
            .post("/api/sensor")
            .json(&json!({ "vibration": 1.0, "humidity": 40.0 }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = resp.json();
        assert_eq!(body["missing"], json!(["deviceId", "temperature"]));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn ingest_wrong_type_is_bad_request() {
        let store = InMemoryReadingStore::new();
        let server = test_server(store.clone());

        let resp = server
            .post("/api/sensor")
            .json(&json!({ "deviceId": "M1", "vibration": "loud", "temperature": 20 }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<Value>()["invalid"], json!(["vibration"]));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn ingest_non_json_body_reports_all_missing() {
        let server = test_server(InMemoryReadingStore::new());

        let resp = server.post("/api/sensor").text("deviceId=M1").await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.json::<Value>()["missing"],
            json!(["deviceId", "vibration", "temperature"])
        );
    }

    #[tokio::test]
    async fn ingest_malformed_json_is_bad_request() {
        let server = test_server(InMemoryReadingStore::new());

        let resp = server
            .post("/api/sensor")
            .text("{\"deviceId\": ")
            .content_type("application/json")
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<Value>()["error"], "Malformed request body");
    }

    #[tokio::test]
    async fn ingest_storage_failure_is_server_error() {
        let server = unavailable_server();

        let resp = server
            .post("/api/sensor")
            .json(&json!({ "deviceId": "M1", "vibration": 1.0, "temperature": 20 }))
            .await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = resp.json();
        assert_eq!(body["error"], "Failed to process reading");
        assert_eq!(body["details"], sqlx::Error::PoolTimedOut.to_string());
    }

    // -----------------------------------------------------------------------
    // GET /api/sensor
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn recent_empty_store_returns_zero_count() {
        let server = test_server(InMemoryReadingStore::new());

        let resp = server.get("/api/sensor").await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<Value>(), json!({ "count": 0, "results": [] }));
    }

    #[tokio::test]
    async fn recent_is_newest_first_without_id() {
        let store = InMemoryReadingStore::new();
        store.create_reading(new_reading("M1", 0.1)).await.unwrap();
        store.create_reading(new_reading("M2", 0.2)).await.unwrap();
        store.create_reading(new_reading("M3", 0.3)).await.unwrap();

        let server = test_server(store);
        let resp = server.get("/api/sensor").await;
        resp.assert_status_ok();

        let body: Value = resp.json();
        assert_eq!(body["count"], 3);
        let results = body["results"].as_array().unwrap();
        let devices: Vec<&str> = results.iter().map(|r| r["deviceId"].as_str().unwrap()).collect();
        assert_eq!(devices, vec!["M3", "M2", "M1"]);
        assert!(results.iter().all(|r| r.get("id").is_none()));
        assert_eq!(results[0]["accZ"], 1.0);
        assert_eq!(results[0]["timestamp"], 1_700_000_000_000_i64);
    }

    #[tokio::test]
    async fn recent_caps_at_one_hundred() {
        let store = InMemoryReadingStore::new();
        for i in 0..105 {
            store.create_reading(new_reading("M1", i as f64)).await.unwrap();
        }

        let server = test_server(store);
        let body: Value = server.get("/api/sensor").await.json();

        assert_eq!(body["count"], 100);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 100);
        assert_eq!(results[0]["vibration"], 104.0);
        assert_eq!(results[99]["vibration"], 5.0);
    }

    #[tokio::test]
    async fn recent_is_stable_without_writes() {
        let store = InMemoryReadingStore::new();
        store.create_reading(new_reading("M1", 0.4)).await.unwrap();
        store.create_reading(new_reading("M1", 0.5)).await.unwrap();

        let server = test_server(store);
        let first: Value = server.get("/api/sensor").await.json();
        let second: Value = server.get("/api/sensor").await.json();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn recent_storage_failure_is_server_error() {
        let server = unavailable_server();

        let resp = server.get("/api/sensor").await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.json::<Value>()["error"], "Failed to query readings");
    }

    #[tokio::test]
    async fn posted_reading_is_returned_by_get() {
        let server = test_server(InMemoryReadingStore::new());

        let created: Value = server
            .post("/api/sensor")
            .json(&json!({ "deviceId": "M7", "vibration": 1.5, "temperature": 55.5 }))
            .await
            .json();

        let body: Value = server.get("/api/sensor").await.json();
        assert_eq!(body["count"], 1);
        let reading = &body["results"][0];
        assert_eq!(reading["deviceId"], "M7");
        assert_eq!(reading["humidity"], Value::Null);
        assert_eq!(reading["receivedAt"], created["receivedAt"]);
    }

    // -----------------------------------------------------------------------
    // System endpoints
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn health_reports_connected_database() {
        let server = test_server(InMemoryReadingStore::new());

        let resp = server.get("/health").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["status"], "operational");
        assert_eq!(body["database"], "connected");
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn health_reports_disconnected_database() {
        let server = unavailable_server();

        let resp = server.get("/health").await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<Value>()["database"], "disconnected");
    }

    #[tokio::test]
    async fn health_does_not_wait_on_a_hanging_database() {
        let state = AppState::new(Arc::new(HangingStore));
        let server = TestServer::new(router(state, Environment::Production)).unwrap();
        let started = Instant::now();

        let resp = server.get("/health").await;

        assert!(started.elapsed() < Duration::from_secs(10));
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["status"], "operational");
        assert_eq!(body["database"], "disconnected");
    }

    #[tokio::test]
    async fn descriptor_lists_endpoints() {
        let server = test_server(InMemoryReadingStore::new());

        let resp = server.get("/").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["name"], "Motor Monitoring API");
        let paths: Vec<&str> = body["endpoints"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["/api/sensor", "/api/sensor", "/health"]);
    }

    #[tokio::test]
    async fn openapi_spec_is_served() {
        let server = test_server(InMemoryReadingStore::new());

        let resp = server.get("/api-docs/openapi.json").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["info"]["title"], "Motor Monitoring API");
        assert!(body["paths"]["/api/sensor"]["post"].is_object());
    }

    // -----------------------------------------------------------------------
    // Routing and fault handling
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let server = test_server(InMemoryReadingStore::new());

        let resp = server.get("/api/motors").await;
        resp.assert_status(StatusCode::NOT_FOUND);

        let body: Value = resp.json();
        assert_eq!(body["path"], "/api/motors");
        assert_eq!(body["method"], "GET");
        assert_eq!(body["suggestedEndpoints"], json!(["/api/sensor (GET/POST)", "/health"]));
    }

    #[tokio::test]
    async fn unsupported_method_is_not_found() {
        let server = test_server(InMemoryReadingStore::new());

        let resp = server.delete("/api/sensor").await;
        resp.assert_status(StatusCode::NOT_FOUND);

        let body: Value = resp.json();
        assert_eq!(body["path"], "/api/sensor");
        assert_eq!(body["method"], "DELETE");
    }

    async fn explode() -> &'static str {
        panic!("sensor bus exploded")
    }

    fn panicking_server(environment: Environment) -> TestServer {
        let app = Router::new().route("/boom", get(explode));
        TestServer::new(with_layers(app, environment)).unwrap()
    }

    #[tokio::test]
    async fn panic_becomes_server_error_without_stack_in_production() {
        let server = panicking_server(Environment::Production);

        let resp = server.get("/boom").await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = resp.json();
        assert_eq!(body["message"], "sensor bus exploded");
        assert!(body.get("stack").is_none());
    }

    #[tokio::test]
    async fn panic_exposes_stack_in_development() {
        let server = panicking_server(Environment::Development);

        let resp = server.get("/boom").await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json();
        assert!(body["stack"].as_str().unwrap().contains("explode"));
    }
}
