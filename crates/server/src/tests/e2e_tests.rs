use std::sync::Arc;

use admin_core::{
    AdminError, AdminSession, Confirmer, DispatchOutcome, HttpRecordStore, MemoryCredentialStore,
    RsvpSubmitter, SessionContext,
};
use async_trait::async_trait;
use shared::domain::{NewRsvp, RsvpStatus};
use tokio::net::TcpListener;

use super::{build_router, AppState};
use crate::test_support::{test_context, RecordingMailer, TEST_SECRET};

struct AlwaysYes;

#[async_trait]
impl Confirmer for AlwaysYes {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

async fn spawn_server(mailer: RecordingMailer) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let api = test_context(mailer).await;
    let app = build_router(Arc::new(AppState { api }));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn admin_session(server_url: &str, secret: Option<&str>) -> AdminSession {
    let store = Arc::new(HttpRecordStore::new(server_url).expect("store"));
    let credentials = match secret {
        Some(secret) => MemoryCredentialStore::with_secret(secret),
        None => MemoryCredentialStore::default(),
    };
    AdminSession::new(store, SessionContext::init(Box::new(credentials)))
}

fn ann() -> NewRsvp {
    NewRsvp {
        name: "Ann Lee".to_string(),
        email: "ann@example.com".to_string(),
        attending: Some("yes".to_string()),
        guests: Some(2),
        ..NewRsvp::default()
    }
}

#[tokio::test]
async fn submit_filter_approve_and_reload() {
    let mailer = RecordingMailer::default();
    let server_url = spawn_server(mailer.clone()).await;

    let submitted = RsvpSubmitter::new(&server_url)
        .expect("submitter")
        .submit(&ann())
        .await
        .expect("submit");

    let mut session = admin_session(&server_url, None);
    session.login(TEST_SECRET).expect("login");
    session.load().await.expect("load");
    session.set_status_filter(Some(RsvpStatus::Pending));
    let page = session.current_page();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, submitted.id);
    assert_eq!(page.items[0].name, "Ann Lee");

    let outcome = session
        .approve(&submitted.id, Arc::new(AlwaysYes))
        .await
        .expect("approve");
    assert_eq!(outcome, DispatchOutcome::Applied);

    assert!(session.view().is_empty());
    session.set_status_filter(None);
    let record = session.details(&submitted.id).expect("details").record;
    assert_eq!(record.status, RsvpStatus::Approved);
    assert!(record.approved_at.is_some());

    let sent = mailer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Your RSVP is Confirmed");
}

#[tokio::test]
async fn wrong_secret_logs_the_admin_out() {
    let server_url = spawn_server(RecordingMailer::default()).await;
    let mut session = admin_session(&server_url, Some("guess"));
    assert!(session.is_authenticated());

    let err = session.load().await.expect_err("rejected");
    assert!(matches!(err, AdminError::Auth));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn mailer_outage_keeps_record_pending() {
    let server_url = spawn_server(RecordingMailer::failing()).await;
    let submitted = RsvpSubmitter::new(&server_url)
        .expect("submitter")
        .submit(&ann())
        .await
        .expect("submit");

    let mut session = admin_session(&server_url, Some(TEST_SECRET));
    session.load().await.expect("load");
    let err = session
        .decline(&submitted.id, Arc::new(AlwaysYes))
        .await
        .expect_err("mailer down");
    assert_eq!(err.status(), Some(502));

    session.load().await.expect("reload");
    let record = session.details(&submitted.id).expect("details").record;
    assert_eq!(record.status, RsvpStatus::Pending);
    assert!(record.approved_at.is_none());
}

#[tokio::test]
async fn server_side_validation_surfaces_as_validation_error() {
    let server_url = spawn_server(RecordingMailer::default()).await;
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{server_url}/rsvps"))
        .json(&serde_json::json!({ "name": "", "email": "x" }))
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 400);

    let err = RsvpSubmitter::new(&server_url)
        .expect("submitter")
        .submit(&NewRsvp::default())
        .await
        .expect_err("invalid");
    assert!(matches!(err, AdminError::Validation(ref messages) if messages.len() == 3));
}
