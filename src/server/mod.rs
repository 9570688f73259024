//! HTTP API for fingerprint upload and position lookup.
//!
//! Bodies are parsed by hand from raw bytes so clients that omit the JSON
//! content type keep working; a body that is not a valid report is a 400.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use serde_json::json;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use crate::auth::PasswordGate;
use crate::engine::{EngineConfig, Estimator};
use crate::persistence::DatasetProvider;
use crate::utils::error::{Error, Result};
use crate::utils::types::{PositionEstimate, PositionReport, SignalObservation};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn DatasetProvider>,
    pub gate: Arc<PasswordGate>,
    pub estimator: Estimator,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn DatasetProvider>, gate: PasswordGate, engine: EngineConfig,
    ) -> Self {
        let estimator = Estimator::new(Arc::clone(&provider), engine);
        Self { provider, gate: Arc::new(gate), estimator }
    }
}

/// Error wrapper mapping service errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            | Error::Unauthorized => {
                return (StatusCode::UNAUTHORIZED, Json(json!({ "status": "password invalid" })))
                    .into_response();
            }
            | Error::InvalidArgument(_) | Error::JsonError(_) => StatusCode::BAD_REQUEST,
            | Error::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            | Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            | _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        (status, Json(json!({ "message": self.0.to_string() }))).into_response()
    }
}

type HandlerResult<T> = std::result::Result<T, ApiError>;

fn parse_report(body: &[u8]) -> HandlerResult<PositionReport> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError(Error::InvalidArgument(format!("malformed request body: {}", e))))
}

/// `POST /test`: echo the parsed fingerprint.
async fn echo_fingerprint(body: Bytes) -> HandlerResult<Json<Vec<SignalObservation>>> {
    Ok(Json(parse_report(&body)?.wifi_data))
}

/// `POST /add`: store a labelled fingerprint after checking the upload password.
async fn add_record(
    State(state): State<AppState>, body: Bytes,
) -> HandlerResult<Response> {
    let report = parse_report(&body)?;
    if report.position.trim().is_empty() {
        return Err(Error::InvalidArgument("position must not be empty".to_string()).into());
    }

    // argon2 verification is CPU bound
    let gate = Arc::clone(&state.gate);
    let password = report.password.clone();
    let verdict =
        tokio::task::spawn_blocking(move || gate.verify(&password)).await.map_err(Error::from)?;
    if let Err(e) = verdict {
        warn!("rejected upload for '{}': {}", report.position, e);
        return Err(e.into());
    }

    let id = state.provider.insert_record(&report.position, &report.wifi_data).await?;
    info!(
        "stored fingerprint {} for '{}' ({} signals)",
        id,
        report.position,
        report.wifi_data.len()
    );
    Ok(Json(json!({ "status": "success", "insertedId": id })).into_response())
}

/// `POST /findPosition`: estimate the position of the posted fingerprint.
async fn find_position(
    State(state): State<AppState>, body: Bytes,
) -> HandlerResult<Json<PositionEstimate>> {
    let report = parse_report(&body)?;
    Ok(Json(state.estimator.estimate(&report.wifi_data).await?))
}

async fn health() -> &'static str {
    "OK"
}

async fn metrics_handler() -> String {
    crate::metrics::render()
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "wifipos running" }))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/test", post(echo_fingerprint))
        .route("/add", post(add_record))
        .route("/findPosition", post(find_position))
        .with_state(state)
}

/// Bind a listener for `addr`.
pub fn bind(addr: &str) -> Result<TcpListener> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::ConfigError(format!("invalid bind address '{}': {}", addr, e)))?;
    Ok(TcpListener::bind(addr)?)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    info!("Serving positioning API on http://{}", local_addr);

    axum::Server::from_tcp(listener)
        .map_err(|e| Error::Other(format!("failed to create server: {}", e)))?
        .serve(router(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Other(format!("server error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_report_rejects_garbage() {
        assert_matches!(parse_report(b"not json"), Err(ApiError(Error::InvalidArgument(_))));
        let report = parse_report(br#"{"wifi_data":[{"bssid":"a","rssi":-3}]}"#).unwrap();
        assert_eq!(report.wifi_data, vec![SignalObservation::new("a", -3)]);
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::Unauthorized, StatusCode::UNAUTHORIZED),
            (Error::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (Error::StorageUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::Timeout(std::time::Duration::from_millis(1)), StatusCode::GATEWAY_TIMEOUT),
            (
                Error::WorkerFailure { shard: 0, reason: "boom".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_bind_rejects_bad_address() {
        assert_matches!(bind("nowhere"), Err(Error::ConfigError(_)));
    }
}
