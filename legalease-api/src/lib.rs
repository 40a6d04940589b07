//! LegalEase API service
//!
//! Accepts legal documents, analyses them in the background and serves the
//! results, plus the explanation, translation, speech, analytics, export,
//! comparison and page-detection endpoints used by the web client and the
//! browser extension.

pub mod ai;
pub mod analytics;
pub mod api;
pub mod compare;
pub mod db;
pub mod detect;
pub mod error;
pub mod export;
pub mod extract;
pub mod pagination;
pub mod pipeline;
pub mod tts;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use legalease_common::config::{ServiceConfig, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_SESSION_TTL_HOURS};
use legalease_common::events::EventBus;
use legalease_common::secrets;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::pipeline::AnalysisPipeline;

/// Room for multipart framing on top of the upload limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// HTTP-facing settings resolved from configuration
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub secure_cookies: bool,
    pub session_ttl: chrono::Duration,
    pub max_upload_bytes: usize,
    /// Extra origins allowed to call the API with credentials
    pub cors_origins: Vec<String>,
    /// bcrypt work factor for new password hashes
    pub password_cost: u32,
}

impl HttpSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            secure_cookies: config.secure_cookies,
            session_ttl: chrono::Duration::hours(config.session_ttl_hours),
            max_upload_bytes: config.max_upload_bytes,
            cors_origins: config.cors_origins.clone(),
            password_cost: secrets::PASSWORD_COST,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            secure_cookies: false,
            session_ttl: chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_origins: Vec::new(),
            password_cost: secrets::PASSWORD_COST,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub event_bus: EventBus,
    pub pipeline: AnalysisPipeline,
    pub settings: Arc<HttpSettings>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// `pipeline` must publish on `event_bus` for SSE clients to see its
    /// status changes.
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        pipeline: AnalysisPipeline,
        settings: HttpSettings,
    ) -> Self {
        Self {
            db,
            event_bus,
            pipeline,
            settings: Arc::new(settings),
            startup_time: Utc::now(),
        }
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
    )
}

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    let cors = cors_layer(&state.settings.cors_origins);

    let router = Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::document_routes())
        .merge(api::insight_routes())
        .merge(api::language_routes())
        .route("/api/events", get(api::event_stream))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}
