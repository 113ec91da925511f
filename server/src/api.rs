use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::header::{HeaderName, HOST, ORIGIN};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fadebin_common::{
    share_url, ApiError, CreatePasteRequest, CreatedPaste, Envelope, ErrorCode, FetchedPaste,
    HealthReport, API_ENDPOINT,
};
use tracing::{error, instrument, warn};

use crate::service::{ExpiryReason, PasteService, PasteView, ServiceError};
use crate::store::RecordStore;
use crate::time::Clock;

pub struct AppState<S, C> {
    pub service: PasteService<S, C>,
    /// Overrides the request origin when building share links.
    pub base_url: Option<String>,
}

pub fn router<S: RecordStore, C: Clock>(state: Arc<AppState<S, C>>) -> Router {
    Router::new()
        .route(
            &format!("{API_ENDPOINT}/pastes"),
            post(create_paste::<S, C>),
        )
        .route(
            &format!("{API_ENDPOINT}/pastes/:id"),
            get(fetch_paste::<S, C>),
        )
        .route(&format!("{API_ENDPOINT}/health"), get(health::<S, C>))
        .layer(Extension(state))
}

const CREATE_FAILED: &str = "Failed to create paste";
const FETCH_FAILED: &str = "Failed to fetch paste";

impl ServiceError {
    /// Renders the error as a failed envelope. Server-side failures are
    /// reported to the client as `internal`.
    fn into_response_for(self, internal: &'static str) -> Response {
        let (status, code, message) = match &self {
            Self::Validation(message) => {
                (StatusCode::BAD_REQUEST, ErrorCode::ValidationError, *message)
            }
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorCode::PasteNotFound,
                "Paste not found",
            ),
            // Time and view limits share one code.
            Self::Expired(ExpiryReason::Time) => (
                StatusCode::GONE,
                ErrorCode::PasteExpired,
                "This paste has expired",
            ),
            Self::Expired(ExpiryReason::Views) => (
                StatusCode::GONE,
                ErrorCode::PasteExpired,
                "This paste has reached its maximum view count",
            ),
            Self::Storage(_) | Self::IdSpaceExhausted => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::InternalError,
                    internal,
                )
            }
        };

        let body: Envelope<()> = Envelope::failure(ApiError::new(code, message));
        (status, Json(body)).into_response()
    }
}

impl From<PasteView> for FetchedPaste {
    fn from(view: PasteView) -> Self {
        Self {
            id: view.id.to_string(),
            title: view.title,
            content: view.content,
            created_at: view.created_at,
            expires_at: view.expires_at,
            view_count: view.view_count,
            max_views: view.max_views,
            is_last_view: view.is_last_view,
        }
    }
}

/// Where share links should point: the configured base, else whoever asked.
fn base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = configured {
        return base.to_string();
    }

    let header = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());
    header(ORIGIN)
        .map(ToString::to_string)
        .or_else(|| header(HOST).map(|host| format!("http://{host}")))
        .unwrap_or_default()
}

#[instrument(skip_all)]
async fn create_paste<S: RecordStore, C: Clock>(
    Extension(state): Extension<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    payload: Result<Json<CreatePasteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<CreatedPaste>>), Response> {
    let Json(request) = payload.map_err(|e| {
        warn!("Rejected malformed paste body: {}", e);
        ServiceError::Validation("Invalid request body").into_response_for(CREATE_FAILED)
    })?;

    let record = state
        .service
        .create(request)
        .await
        .map_err(|e| e.into_response_for(CREATE_FAILED))?;
    let id = record.id.to_string();
    let url = share_url(&base_url(state.base_url.as_deref(), &headers), &id);

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(CreatedPaste {
            id,
            title: record.title,
            url,
            created_at: record.created_at,
            expires_at: record.expires_at,
        })),
    ))
}

#[instrument(skip_all)]
async fn fetch_paste<S: RecordStore, C: Clock>(
    Extension(state): Extension<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<FetchedPaste>>, Response> {
    let view = state
        .service
        .fetch(&id)
        .await
        .map_err(|e| e.into_response_for(FETCH_FAILED))?;
    Ok(Json(Envelope::success(view.into())))
}

async fn health<S: RecordStore, C: Clock>(
    Extension(state): Extension<Arc<AppState<S, C>>>,
) -> (StatusCode, Json<HealthReport>) {
    match state.service.ping().await {
        Ok(now) => (StatusCode::OK, Json(HealthReport::healthy(now))),
        Err(e) => {
            error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthReport::unhealthy()))
        }
    }
}
