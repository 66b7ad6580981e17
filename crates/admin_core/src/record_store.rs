use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{RsvpId, RsvpRecord, RsvpStatus},
    error::ApiError,
    protocol::{
        RsvpListResponse, SetStatusRequest, ADMIN_SECRET_HEADER, RSVPS_ROUTE, RSVP_STATUS_ROUTE,
    },
};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AdminError, AdminResult};

/// Success acknowledgment of a state-changing call. Carries no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack;

/// Authenticated access to the remote record set.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn load_all(&self, credential: &str) -> AdminResult<Vec<RsvpRecord>>;

    /// Fire-and-confirm: callers must reload to observe the new status.
    async fn set_status(
        &self,
        id: &RsvpId,
        new_status: RsvpStatus,
        credential: &str,
    ) -> AdminResult<Ack>;
}

pub struct HttpRecordStore {
    http: Client,
    server_url: String,
}

impl HttpRecordStore {
    pub fn new(server_url: &str) -> AdminResult<Self> {
        Ok(Self {
            http: Client::new(),
            server_url: normalize_server_url(server_url)?,
        })
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn load_all(&self, credential: &str) -> AdminResult<Vec<RsvpRecord>> {
        let response = self
            .http
            .get(format!("{}{RSVPS_ROUTE}", self.server_url))
            .header(ADMIN_SECRET_HEADER, credential)
            .send()
            .await?;
        let response = check_response(response, "load rsvps").await?;
        let body: RsvpListResponse = response.json().await?;
        debug!(count = body.results.len(), "records: loaded rsvp list");
        Ok(body.results)
    }

    async fn set_status(
        &self,
        id: &RsvpId,
        new_status: RsvpStatus,
        credential: &str,
    ) -> AdminResult<Ack> {
        let response = self
            .http
            .post(format!("{}{RSVP_STATUS_ROUTE}", self.server_url))
            .header(ADMIN_SECRET_HEADER, credential)
            .json(&SetStatusRequest {
                record_id: id.clone(),
                credential: credential.to_string(),
                new_status,
            })
            .send()
            .await?;
        check_response(response, "set rsvp status").await?;
        info!(record_id = %id, status = %new_status, "records: status change acknowledged");
        Ok(Ack)
    }
}

/// Maps `401` to `Auth` and any other non-success status to `Transport`.
pub(crate) async fn check_response(response: Response, operation: &str) -> AdminResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        warn!(operation, "records: credential rejected");
        return Err(AdminError::Auth);
    }

    let message = error_message(response).await;
    warn!(operation, status = status.as_u16(), %message, "records: request failed");
    Err(AdminError::transport(Some(status.as_u16()), message))
}

pub(crate) async fn error_message(response: Response) -> String {
    let status = response.status();
    let raw = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&raw) {
        Ok(api_error) => api_error.message,
        Err(_) if !raw.trim().is_empty() => raw,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
    }
}

pub(crate) fn normalize_server_url(raw: &str) -> AdminResult<String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|err| AdminError::validation(format!("invalid server url '{raw}': {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AdminError::validation(format!(
            "server url '{raw}' must use http or https"
        )));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/record_store_tests.rs"]
mod tests;
