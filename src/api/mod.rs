mod error;
pub mod types;

pub use error::ApiError;
pub use types::{ErrorResponse, HealthResponse, MathRequest, MathResponse};

use crate::math::{MathError, Operation};
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

pub const SERVICE_NAME: &str = "mathapi";

/// Immutable state shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the service router: `/api/math/{add,subtract,multiply,divide}` and `/health`.
pub fn router(state: Arc<AppState>) -> Router {
    let mut math = Router::new();
    for op in Operation::ALL {
        math = math.route(
            &format!("/{}", op.route()),
            post(move |body: Bytes| evaluate(op, body)),
        );
    }

    Router::new()
        .nest("/api/math", math)
        .route("/health", get(health))
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "math service listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("math service stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn evaluate(op: Operation, body: Bytes) -> Result<Json<MathResponse>, ApiError> {
    let request = parse_request(&body)?;

    let result = guarded(|| op.apply(request.operand1, request.operand2))?;
    debug!(
        operation = op.label(),
        operand1 = request.operand1,
        operand2 = request.operand2,
        result,
        "evaluated"
    );
    Ok(Json(MathResponse::new(result, op.label())))
}

/// Run an evaluation, turning a panic into `ApiError::Internal`.
fn guarded<F>(eval: F) -> Result<f64, ApiError>
where
    F: FnOnce() -> Result<f64, MathError>,
{
    panic::catch_unwind(AssertUnwindSafe(eval))
        .map_err(|payload| ApiError::internal(panic_message(payload.as_ref())))?
        .map_err(ApiError::from)
}

fn parse_request(body: &[u8]) -> Result<MathRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::bad_request("Request body cannot be null"));
    }
    match serde_json::from_slice::<Option<MathRequest>>(body) {
        Ok(Some(request)) => Ok(request),
        Ok(None) => Err(ApiError::bad_request("Request body cannot be null")),
        Err(e) => Err(ApiError::bad_request(format!("Malformed request body: {e}"))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected failure".into()
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = Utc::now();
    Json(HealthResponse {
        status: "UP".into(),
        service: SERVICE_NAME.into(),
        version: env!("CARGO_PKG_VERSION").into(),
        started_at: state.started_at,
        uptime_secs: (now - state.started_at).num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn parse_request_reads_operands() {
        let req = parse_request(br#"{"operand1": 1.5, "operand2": -2}"#).unwrap();
        assert_eq!(req.operand1, 1.5);
        assert_eq!(req.operand2, -2.0);
    }

    #[test]
    fn empty_or_null_body_is_rejected() {
        for body in [&b""[..], &b"  \n"[..], &b"null"[..]] {
            let err = parse_request(body).unwrap_err();
            assert_eq!(err.to_string(), "Request body cannot be null");
        }
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let err = parse_request(br#"{"operand1": "one"}"#).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(err.to_string().starts_with("Malformed request body"));

        // JSON has no NaN literal
        let err = parse_request(br#"{"operand1": NaN, "operand2": 1}"#).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn out_of_range_literal_becomes_infinity() {
        let req = parse_request(br#"{"operand1": 1e400, "operand2": -1E400}"#).unwrap();
        assert_eq!(req.operand1, f64::INFINITY);
        assert_eq!(req.operand2, f64::NEG_INFINITY);
    }

    #[test]
    fn quoted_or_boolean_operand_is_malformed() {
        for body in [
            &br#"{"operand1": "1", "operand2": 1}"#[..],
            &br#"{"operand1": 1, "operand2": true}"#[..],
            &br#"{"operand1": 1}"#[..],
        ] {
            let err = parse_request(body).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn out_of_range_operand_reports_infinity() {
        let err = evaluate(
            Operation::Add,
            Bytes::from_static(br#"{"operand1":1e400,"operand2":1}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "operand1 cannot be Infinity");
    }

    #[tokio::test]
    async fn panic_during_evaluation_is_internal_error() {
        let err = guarded(|| panic!("evaluator blew up")).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));

        let resp = err.into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            ErrorResponse::new("Internal server error: evaluator blew up", 500)
        );
    }

    #[test]
    fn guarded_passes_through_results() {
        assert_eq!(guarded(|| Ok(2.0)).unwrap(), 2.0);
        let err = guarded(|| Err(MathError::PrecisionLoss)).unwrap_err();
        assert!(matches!(err, ApiError::Math(MathError::PrecisionLoss)));
    }

    #[test]
    fn panic_message_extracts_text() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("oops");
        assert_eq!(panic_message(payload.as_ref()), "oops");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unexpected failure");
    }

    #[tokio::test]
    async fn evaluate_maps_math_error() {
        let err = evaluate(
            Operation::Divide,
            Bytes::from_static(br#"{"operand1":1,"operand2":0}"#),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Math(MathError::DivisionByZero)
        ));
    }

    #[tokio::test]
    async fn evaluate_returns_label() {
        let Json(resp) = evaluate(
            Operation::Multiply,
            Bytes::from_static(br#"{"operand1":4,"operand2":2.5}"#),
        )
        .await
        .unwrap();
        assert_eq!(resp, MathResponse::new(10.0, "multiplication"));
    }
}
