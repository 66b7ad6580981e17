use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::NewRsvp,
    error::{ApiError, ErrorCode},
    protocol::{
        RsvpListResponse, SetStatusRequest, SetStatusResponse, SubmitRsvpResponse,
        ADMIN_SECRET_HEADER, RSVPS_ROUTE, RSVP_STATUS_ROUTE,
    },
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod email;

use api::{change_status, list_rsvps, submit_rsvp, ApiContext};
use config::{load_settings, prepare_database_url};
use email::mailer_from_settings;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    if settings.admin_secret.is_none() {
        warn!("ADMIN_SECRET is not set; admin routes will reject every request");
    }

    let api = ApiContext {
        storage,
        mailer: mailer_from_settings(&settings.email),
        admin_secret: settings.admin_secret,
        wedding: settings.wedding,
    };
    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(RSVPS_ROUTE, get(http_list_rsvps).post(http_submit_rsvp))
        .route(RSVP_STATUS_ROUTE, post(http_change_status))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            error!(%error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

async fn http_submit_rsvp(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewRsvp>, JsonRejection>,
) -> Result<Json<SubmitRsvpResponse>, HttpError> {
    let Json(rsvp) = payload.map_err(bad_json)?;
    submit_rsvp(&state.api, rsvp)
        .await
        .map(Json)
        .map_err(into_http)
}

async fn http_list_rsvps(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RsvpListResponse>, HttpError> {
    list_rsvps(&state.api, admin_header(&headers))
        .await
        .map(Json)
        .map_err(into_http)
}

async fn http_change_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<SetStatusResponse>, HttpError> {
    let Json(request) = payload.map_err(bad_json)?;
    change_status(&state.api, admin_header(&headers), request)
        .await
        .map(Json)
        .map_err(into_http)
}

fn admin_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
}

fn bad_json(rejection: JsonRejection) -> HttpError {
    into_http(ApiError::new(ErrorCode::Validation, rejection.body_text()))
}

fn into_http(error: ApiError) -> HttpError {
    let status = match error.code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error))
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/e2e_tests.rs"]
mod e2e_tests;
