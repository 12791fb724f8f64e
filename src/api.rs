// 🌐 HTTP API - multipart upload → reconciliation result
//
// Thin adapter over `ReconciliationService`. The service instance is built
// once by the server binary and carried in `AppState`.

use crate::config::Config;
use crate::error::ReconError;
use crate::service::{BankSource, ReconcileRequest, ReconciliationService};
use crate::ReconciliationResult;
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

pub const SYSTEM_FIELD: &str = "system_data";
pub const BANK_FIELD: &str = "bank_csv";
pub const START_FIELD: &str = "start_date";
pub const END_FIELD: &str = "end_date";

// ============================================================================
// STATE
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn ReconciliationService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(service: Arc<dyn ReconciliationService>, config: Config) -> Self {
        AppState {
            service,
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ApiError {
    /// true when the request failed
    pub status: bool,
    pub msg: String,
    pub code: u16,
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub error: ApiError,
    pub message: String,
    pub server_time: i64,
    pub code: u16,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            data: Some(data),
            error: ApiError::default(),
            message: String::new(),
            server_time: chrono::Utc::now().timestamp(),
            code: StatusCode::OK.as_u16(),
        }
    }

    pub fn error(status: StatusCode, msg: impl Into<String>) -> Self {
        ApiResponse {
            data: None,
            error: ApiError {
                status: true,
                msg: msg.into(),
                code: status.as_u16(),
            },
            message: String::new(),
            server_time: chrono::Utc::now().timestamp(),
            code: status.as_u16(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

type ReconResponse = ApiResponse<ReconciliationResult>;

// ============================================================================
// API Handlers
// ============================================================================

/// GET / - Service identity
async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "reconciliation-app",
        "description": "reconciliation-app",
    }))
}

/// GET /ping - Heartbeat
async fn ping() -> &'static str {
    "."
}

/// GET /health - Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(serde_json::json!({
        "status": "OK",
        "version": state.config.app_version,
    })))
}

/// Owned copy of the multipart form
#[derive(Default)]
struct UploadForm {
    start_date: String,
    end_date: String,
    system: Option<Bytes>,
    banks: Vec<(String, Bytes)>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, String> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        match name.as_str() {
            START_FIELD => form.start_date = field.text().await.map_err(|e| e.to_string())?,
            END_FIELD => form.end_date = field.text().await.map_err(|e| e.to_string())?,
            SYSTEM_FIELD => form.system = Some(field.bytes().await.map_err(|e| e.to_string())?),
            BANK_FIELD => {
                let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                form.banks.push((file_name.unwrap_or_else(|| BANK_FIELD.to_string()), bytes));
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /reconciliation-app/reconciliation - Run one reconciliation
async fn reconcile(State(state): State<AppState>, multipart: Multipart) -> ReconResponse {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!("Parse Multipart Form Failed. err={}", e);
            return ApiResponse::error(StatusCode::BAD_REQUEST, e);
        }
    };

    let Some(system) = form.system else {
        warn!("Get System Data File Failed. err=missing {}", SYSTEM_FIELD);
        return ApiResponse::error(StatusCode::BAD_REQUEST, format!("{} file is required", SYSTEM_FIELD));
    };

    let service = Arc::clone(&state.service);
    let (start_date, end_date, banks) = (form.start_date, form.end_date, form.banks);

    let outcome = tokio::task::spawn_blocking(move || {
        let request = banks.into_iter().fold(
            ReconcileRequest::new(start_date, end_date, Cursor::new(system)),
            |request, (file_name, bytes)| request.with_bank(BankSource::new(file_name, Cursor::new(bytes))),
        );
        service.reconcile(request)
    })
    .await;

    match outcome {
        Ok(Ok(result)) => ApiResponse::ok(result),
        Ok(Err(e)) => {
            warn!("Reconciliation Process Failed. err={}", e);
            ApiResponse::error(status_for(&e), e.to_string())
        }
        Err(e) => {
            warn!("Reconciliation task failed. err={}", e);
            ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "reconciliation task failed")
        }
    }
}

fn status_for(err: &ReconError) -> StatusCode {
    if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// UUID v4 request ids for `x-request-id`
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string()).ok().map(RequestId::new)
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE]);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
        .layer(trace)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(state.config.inbound_timeout()));

    let api_routes = Router::new().route("/reconciliation", post(reconcile));

    Router::new()
        .route("/", get(root))
        .route("/ping", get(ping))
        .route("/health", get(health_check))
        .nest("/reconciliation-app", api_routes)
        .layer(DefaultBodyLimit::max(state.config.http_max_upload_bytes))
        .layer(cors)
        .layer(middleware)
        .with_state(state)
}
