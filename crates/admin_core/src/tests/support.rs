use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use shared::{
    domain::{Attending, NewRsvp, RsvpId, RsvpRecord, RsvpStatus},
    error::{ApiError, ErrorCode},
    protocol::{
        RsvpListResponse, SetStatusRequest, SetStatusResponse, SubmitRsvpResponse,
        ADMIN_SECRET_HEADER, RSVPS_ROUTE, RSVP_STATUS_ROUTE,
    },
};
use tokio::{net::TcpListener, sync::Mutex};

pub const MOCK_SECRET: &str = "letmein";

#[derive(Clone, Default)]
pub struct MockState {
    pub records: Arc<Mutex<Vec<RsvpRecord>>>,
    pub status_requests: Arc<Mutex<Vec<(Option<String>, SetStatusRequest)>>>,
    pub submissions: Arc<Mutex<Vec<NewRsvp>>>,
    pub list_calls: Arc<Mutex<u32>>,
    pub fail_list_with: Arc<Mutex<Option<u16>>>,
    pub fail_status_with: Arc<Mutex<Option<u16>>>,
}

pub fn record(id: &str, name: &str, attending: Attending, status: RsvpStatus, minute: u32) -> RsvpRecord {
    RsvpRecord {
        id: RsvpId::from(id),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: String::new(),
        attending,
        guests: 1,
        dietary: String::new(),
        message: String::new(),
        status,
        submitted_at: Utc
            .with_ymd_and_hms(2024, 5, 1, 12, minute, 0)
            .single()
            .expect("timestamp"),
        approved_at: None,
    }
}

fn error_response(status: StatusCode, code: ErrorCode, message: &str) -> Response {
    (status, Json(ApiError::new(code, message))).into_response()
}

fn header_secret(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn list_rsvps(State(state): State<MockState>, headers: HeaderMap) -> Response {
    *state.list_calls.lock().await += 1;
    if header_secret(&headers).as_deref() != Some(MOCK_SECRET) {
        return error_response(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, "Unauthorized");
    }
    if let Some(code) = *state.fail_list_with.lock().await {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return error_response(status, ErrorCode::Internal, "list exploded");
    }
    let results = state.records.lock().await.clone();
    Json(RsvpListResponse { results }).into_response()
}

async fn set_status(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(request): Json<SetStatusRequest>,
) -> Response {
    let header = header_secret(&headers);
    state
        .status_requests
        .lock()
        .await
        .push((header.clone(), request.clone()));

    if header.as_deref() != Some(MOCK_SECRET) || request.credential != MOCK_SECRET {
        return error_response(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, "Unauthorized");
    }
    if let Some(code) = *state.fail_status_with.lock().await {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return error_response(status, ErrorCode::Upstream, "Failed to send email");
    }

    let mut records = state.records.lock().await;
    let Some(record) = records.iter_mut().find(|r| r.id == request.record_id) else {
        return error_response(StatusCode::NOT_FOUND, ErrorCode::NotFound, "RSVP not found");
    };
    if record.status != RsvpStatus::Pending {
        return error_response(StatusCode::CONFLICT, ErrorCode::Conflict, "RSVP is not pending");
    }
    record.status = request.new_status;
    record.approved_at = Some(Utc::now());
    Json(SetStatusResponse { success: true }).into_response()
}

async fn submit(State(state): State<MockState>, Json(payload): Json<NewRsvp>) -> Response {
    state.submissions.lock().await.push(payload.clone());
    let id = RsvpId::generate(Utc::now());
    match payload.into_record(id.clone(), Utc::now()) {
        Ok(record) => {
            state.records.lock().await.push(record);
            Json(SubmitRsvpResponse {
                success: true,
                id,
                message: "RSVP received! Admin will send confirmation soon.".to_string(),
            })
            .into_response()
        }
        Err(errors) => (
            StatusCode::BAD_REQUEST,
            Json(
                ApiError::new(ErrorCode::Validation, "Validation failed")
                    .with_details(errors.0),
            ),
        )
            .into_response(),
    }
}

pub async fn spawn_mock_server(records: Vec<RsvpRecord>) -> Result<(String, MockState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockState::default();
    *state.records.lock().await = records;
    let app = Router::new()
        .route(RSVPS_ROUTE, get(list_rsvps).post(submit))
        .route(RSVP_STATUS_ROUTE, post(set_status))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}
