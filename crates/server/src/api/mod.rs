use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::{NewRsvp, RsvpId},
    error::{ApiError, ErrorCode},
    protocol::{RsvpListResponse, SetStatusRequest, SetStatusResponse, SubmitRsvpResponse},
};
use storage::{Storage, TransitionOutcome};
use tracing::{error, info, warn};

use crate::{
    config::WeddingDetails,
    email::{render_status_email, Mailer},
};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub mailer: Arc<dyn Mailer>,
    pub admin_secret: Option<String>,
    pub wedding: WeddingDetails,
}

pub async fn submit_rsvp(ctx: &ApiContext, rsvp: NewRsvp) -> Result<SubmitRsvpResponse, ApiError> {
    let now = Utc::now();
    let record = rsvp
        .into_record(RsvpId::generate(now), now)
        .map_err(|errors| {
            ApiError::new(ErrorCode::Validation, "Validation failed").with_details(errors.0)
        })?;

    ctx.storage.insert_rsvp(&record).await.map_err(internal)?;
    info!(record_id = %record.id, attending = %record.attending, "rsvp: submitted");
    Ok(SubmitRsvpResponse {
        success: true,
        id: record.id,
        message: "RSVP received! Admin will send confirmation soon.".to_string(),
    })
}

pub async fn list_rsvps(
    ctx: &ApiContext,
    credential: Option<&str>,
) -> Result<RsvpListResponse, ApiError> {
    authorize(ctx, credential)?;
    let results = ctx.storage.list_rsvps().await.map_err(internal)?;
    Ok(RsvpListResponse { results })
}

/// Mails the guest first and persists second, so a delivery failure leaves
/// the record pending.
pub async fn change_status(
    ctx: &ApiContext,
    header_credential: Option<&str>,
    request: SetStatusRequest,
) -> Result<SetStatusResponse, ApiError> {
    authorize(ctx, Some(&request.credential))?;
    if header_credential.is_some() {
        authorize(ctx, header_credential)?;
    }

    let id = request.record_id;
    let new_status = request.new_status;
    if !new_status.is_terminal() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("newStatus must be approved or declined, got {new_status}"),
        ));
    }

    let record = ctx
        .storage
        .load_rsvp(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "RSVP not found"))?;
    if !record.status.can_transition_to(new_status) {
        return Err(ApiError::new(
            ErrorCode::Conflict,
            format!("RSVP is already {}", record.status),
        ));
    }

    if let Some(message) = render_status_email(&record, new_status, &ctx.wedding) {
        ctx.mailer.send(&message).await.map_err(|err| {
            error!(record_id = %id, error = %format!("{err:#}"), "rsvp: email delivery failed");
            ApiError::new(ErrorCode::Upstream, "Failed to send email")
        })?;
    }

    match ctx
        .storage
        .transition_status(&id, new_status, Utc::now())
        .await
        .map_err(internal)?
    {
        TransitionOutcome::Applied => {
            info!(record_id = %id, status = %new_status, "rsvp: status changed");
            Ok(SetStatusResponse { success: true })
        }
        TransitionOutcome::NotFound => Err(ApiError::new(ErrorCode::NotFound, "RSVP not found")),
        TransitionOutcome::NotPending(current) => {
            warn!(record_id = %id, %current, "rsvp: lost status race after email");
            Err(ApiError::new(
                ErrorCode::Conflict,
                format!("RSVP is already {current}"),
            ))
        }
    }
}

fn authorize(ctx: &ApiContext, credential: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = ctx.admin_secret.as_deref() else {
        warn!("rsvp: admin secret is not configured, refusing privileged request");
        return Err(unauthorized());
    };
    match credential {
        Some(provided) if secrets_match(provided, expected) => Ok(()),
        _ => Err(unauthorized()),
    }
}

fn secrets_match(provided: &str, expected: &str) -> bool {
    provided.len() == expected.len()
        && provided
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn unauthorized() -> ApiError {
    ApiError::new(ErrorCode::Unauthorized, "Unauthorized")
}

fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %format!("{err:#}"), "rsvp: storage failure");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
