use super::*;
use crate::test_support::{test_context, RecordingMailer, TEST_SECRET};
use shared::domain::RsvpStatus;

fn ann() -> NewRsvp {
    NewRsvp {
        name: " Ann Lee ".to_string(),
        email: "ANN@example.com".to_string(),
        attending: Some("yes".to_string()),
        guests: Some(2),
        ..NewRsvp::default()
    }
}

fn status_request(id: &RsvpId, credential: &str, new_status: RsvpStatus) -> SetStatusRequest {
    SetStatusRequest {
        record_id: id.clone(),
        credential: credential.to_string(),
        new_status,
    }
}

#[tokio::test]
async fn submission_is_normalized_and_pending() {
    let ctx = test_context(RecordingMailer::default()).await;
    let response = submit_rsvp(&ctx, ann()).await.expect("submit");
    assert!(response.success);

    let stored = ctx
        .storage
        .load_rsvp(&response.id)
        .await
        .expect("load")
        .expect("stored");
    assert_eq!(stored.name, "Ann Lee");
    assert_eq!(stored.email, "ann@example.com");
    assert_eq!(stored.status, RsvpStatus::Pending);
    assert!(stored.approved_at.is_none());
}

#[tokio::test]
async fn invalid_submission_lists_every_problem() {
    let ctx = test_context(RecordingMailer::default()).await;
    let err = submit_rsvp(&ctx, NewRsvp::default())
        .await
        .expect_err("invalid");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(
        err.details,
        [
            "Name is required",
            "Email is required",
            "Attendance selection is required"
        ]
    );
    assert!(ctx.storage.list_rsvps().await.expect("list").is_empty());
}

#[tokio::test]
async fn listing_requires_matching_secret() {
    let ctx = test_context(RecordingMailer::default()).await;
    submit_rsvp(&ctx, ann()).await.expect("submit");

    assert_eq!(
        list_rsvps(&ctx, None).await.expect_err("missing").code,
        ErrorCode::Unauthorized
    );
    assert_eq!(
        list_rsvps(&ctx, Some("nope")).await.expect_err("wrong").code,
        ErrorCode::Unauthorized
    );
    let listed = list_rsvps(&ctx, Some(TEST_SECRET)).await.expect("list");
    assert_eq!(listed.results.len(), 1);
}

#[tokio::test]
async fn unconfigured_secret_refuses_everyone() {
    let mut ctx = test_context(RecordingMailer::default()).await;
    ctx.admin_secret = None;
    let err = list_rsvps(&ctx, Some("")).await.expect_err("no secret");
    assert_eq!(err.code, ErrorCode::Unauthorized);
}

#[tokio::test]
async fn approval_sends_email_then_persists() {
    let mailer = RecordingMailer::default();
    let ctx = test_context(mailer.clone()).await;
    let id = submit_rsvp(&ctx, ann()).await.expect("submit").id;

    let response = change_status(
        &ctx,
        Some(TEST_SECRET),
        status_request(&id, TEST_SECRET, RsvpStatus::Approved),
    )
    .await
    .expect("approve");
    assert!(response.success);

    let sent = mailer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ann@example.com");
    assert_eq!(sent[0].subject, "Your RSVP is Confirmed");

    let stored = ctx.storage.load_rsvp(&id).await.expect("load").expect("stored");
    assert_eq!(stored.status, RsvpStatus::Approved);
    assert!(stored.approved_at.is_some());
}

#[tokio::test]
async fn second_decision_is_a_conflict() {
    let mailer = RecordingMailer::default();
    let ctx = test_context(mailer.clone()).await;
    let id = submit_rsvp(&ctx, ann()).await.expect("submit").id;

    change_status(&ctx, None, status_request(&id, TEST_SECRET, RsvpStatus::Declined))
        .await
        .expect("decline");
    let err = change_status(&ctx, None, status_request(&id, TEST_SECRET, RsvpStatus::Approved))
        .await
        .expect_err("already declined");
    assert_eq!(err.code, ErrorCode::Conflict);
    assert_eq!(mailer.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn failed_email_leaves_record_pending() {
    let ctx = test_context(RecordingMailer::failing()).await;
    let id = submit_rsvp(&ctx, ann()).await.expect("submit").id;

    let err = change_status(&ctx, None, status_request(&id, TEST_SECRET, RsvpStatus::Approved))
        .await
        .expect_err("mailer down");
    assert_eq!(err.code, ErrorCode::Upstream);

    let stored = ctx.storage.load_rsvp(&id).await.expect("load").expect("stored");
    assert_eq!(stored.status, RsvpStatus::Pending);
    assert!(stored.approved_at.is_none());
}

#[tokio::test]
async fn status_change_rejects_bad_inputs() {
    let mailer = RecordingMailer::default();
    let ctx = test_context(mailer.clone()).await;
    let id = submit_rsvp(&ctx, ann()).await.expect("submit").id;

    let err = change_status(&ctx, None, status_request(&id, "wrong", RsvpStatus::Approved))
        .await
        .expect_err("bad credential");
    assert_eq!(err.code, ErrorCode::Unauthorized);

    let err = change_status(
        &ctx,
        Some("wrong"),
        status_request(&id, TEST_SECRET, RsvpStatus::Approved),
    )
    .await
    .expect_err("bad header");
    assert_eq!(err.code, ErrorCode::Unauthorized);

    let err = change_status(&ctx, None, status_request(&id, TEST_SECRET, RsvpStatus::Pending))
        .await
        .expect_err("pending target");
    assert_eq!(err.code, ErrorCode::Validation);

    let err = change_status(
        &ctx,
        None,
        status_request(&RsvpId::from("rsvp_missing"), TEST_SECRET, RsvpStatus::Approved),
    )
    .await
    .expect_err("unknown");
    assert_eq!(err.code, ErrorCode::NotFound);

    assert!(mailer.sent.lock().await.is_empty());
}

#[test]
fn secret_comparison_requires_exact_match() {
    assert!(secrets_match("abc", "abc"));
    assert!(!secrets_match("abc", "abd"));
    assert!(!secrets_match("abc", "abcd"));
    assert!(!secrets_match("", "abc"));
}
