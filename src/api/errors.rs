use std::{any::Any, backtrace::Backtrace, cell::RefCell, panic, sync::Once};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use super::validation::ValidationError;
use crate::store::StoreError;

/// Endpoints suggested to clients that hit an unknown route.
pub const SUGGESTED_ENDPOINTS: [&str; 2] = ["/api/sensor (GET/POST)", "/health"];

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Malformed request body")]
    MalformedBody(String),

    /// Storage failed while handling the request. `message` is the generic
    /// text shown to the client; the source is passed through as `details`.
    #[error("{message}")]
    Persistence {
        message: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn ingest_failed(source: StoreError) -> Self {
        Self::Persistence {
            message: "Failed to process reading",
            source,
        }
    }

    pub fn query_failed(source: StoreError) -> Self {
        Self::Persistence {
            message: "Failed to query readings",
            source,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(ValidationError::Missing(missing)) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Missing required fields", "missing": missing }),
            ),
            ApiError::Validation(ValidationError::Invalid(invalid)) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid field values", "missing": [], "invalid": invalid }),
            ),
            ApiError::MalformedBody(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Malformed request body", "details": details }),
            ),
            ApiError::Persistence { message, source } => {
                error!(error = %source, context = message, "Storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": message, "details": source.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

thread_local! {
    /// Backtrace of the most recent panic on this thread.
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_TRACE_HOOK: Once = Once::new();

/// Chain a panic hook that records a backtrace at the panic site.
///
/// `CatchPanicLayer` catches the unwind on the thread that panicked, so
/// [`panic_response`] can pick the trace up from the thread-local. The
/// previously installed hook still runs. Safe to call more than once.
pub fn install_panic_trace_hook() {
    PANIC_TRACE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

/// Build the `500` response for a panic caught by `CatchPanicLayer`.
///
/// `stack` is only filled in when `expose_stack` is set; production
/// responses carry the panic message alone. The trace comes from
/// [`install_panic_trace_hook`]; without it there is no `stack`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>, expose_stack: bool) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "unknown panic".to_owned()
    };

    let trace = PANIC_TRACE.with(|slot| slot.borrow_mut().take());
    let stack = trace.filter(|_| expose_stack);
    error!(message = %message, "Unhandled fault while processing request");

    let mut body = json!({
        "error": "Internal server error",
        "message": message,
    });
    if let Some(stack) = stack {
        body["stack"] = json!(stack);
    }

    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
