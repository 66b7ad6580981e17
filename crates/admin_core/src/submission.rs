use reqwest::{Client, StatusCode};
use shared::{
    domain::NewRsvp,
    error::ApiError,
    protocol::{SubmitRsvpResponse, RSVPS_ROUTE},
};
use tracing::{info, warn};

use crate::{
    error::{AdminError, AdminResult},
    record_store::{error_message, normalize_server_url},
};

/// Guest-facing form submission.
pub struct RsvpSubmitter {
    http: Client,
    server_url: String,
}

impl RsvpSubmitter {
    pub fn new(server_url: &str) -> AdminResult<Self> {
        Ok(Self {
            http: Client::new(),
            server_url: normalize_server_url(server_url)?,
        })
    }

    /// Validates locally and only then posts. A `400` from the server is
    /// reported as `Validation` with the server's messages.
    pub async fn submit(&self, rsvp: &NewRsvp) -> AdminResult<SubmitRsvpResponse> {
        rsvp.validate()?;

        let response = self
            .http
            .post(format!("{}{RSVPS_ROUTE}", self.server_url))
            .json(rsvp)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let raw = response.text().await.unwrap_or_default();
            let messages = match serde_json::from_str::<ApiError>(&raw) {
                Ok(api_error) if !api_error.details.is_empty() => api_error.details,
                Ok(api_error) => vec![api_error.message],
                Err(_) => vec![raw],
            };
            warn!(count = messages.len(), "submission: rejected by server");
            return Err(AdminError::Validation(messages));
        }
        if !status.is_success() {
            let message = error_message(response).await;
            warn!(status = status.as_u16(), %message, "submission: request failed");
            return Err(AdminError::transport(Some(status.as_u16()), message));
        }

        let body: SubmitRsvpResponse = response.json().await?;
        info!(id = %body.id, "submission: accepted");
        Ok(body)
    }
}
