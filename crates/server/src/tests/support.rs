use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use storage::Storage;
use tokio::sync::Mutex;

use crate::{
    api::ApiContext,
    config::WeddingDetails,
    email::{EmailMessage, Mailer},
};

pub const TEST_SECRET: &str = "test-admin-secret";

#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<EmailMessage>>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        if self.fail {
            return Err(anyhow!("smtp relay unavailable"));
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

pub async fn test_context(mailer: RecordingMailer) -> ApiContext {
    ApiContext {
        storage: Storage::new("sqlite::memory:").await.expect("db"),
        mailer: Arc::new(mailer),
        admin_secret: Some(TEST_SECRET.to_string()),
        wedding: WeddingDetails::default(),
    }
}
