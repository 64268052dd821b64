pub mod dto;
pub mod errors;
pub mod handlers;
pub mod validation;

use std::{any::Any, sync::Arc, time::Instant};

use axum::{routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{config::Environment, store::ReadingStore};
use handlers::ApiDoc;

/// Shared by every handler. Cloned per request, so it only holds handles.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReadingStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self {
            store,
            started_at: Instant::now(),
        }
    }
}

pub fn router(state: AppState, environment: Environment) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/", get(handlers::service_descriptor))
        .route("/health", get(handlers::health))
        .route(
            "/api/sensor",
            get(handlers::get_recent_readings).post(handlers::ingest_reading),
        )
        .with_state(state)
        .split_for_parts();

    let router = router
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found);

    with_layers(router, environment)
}

/// Wrap `router` with request tracing, permissive CORS and panic recovery.
pub fn with_layers(router: Router, environment: Environment) -> Router {
    let expose_stack = environment.exposes_fault_detail();
    if expose_stack {
        errors::install_panic_trace_hook();
    }
    router
        .layer(CatchPanicLayer::custom(
            move |err: Box<dyn Any + Send + 'static>| errors::panic_response(err, expose_stack),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
