use std::{fmt, sync::Arc};

use async_trait::async_trait;
use shared::domain::{RsvpId, RsvpStatus};
use tracing::info;

use crate::{
    error::{AdminError, AdminResult},
    record_store::RecordStore,
};

/// Interactive gate in front of every state-changing action.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Approve,
    Decline,
}

impl AdminAction {
    pub fn target_status(self) -> RsvpStatus {
        match self {
            AdminAction::Approve => RsvpStatus::Approved,
            AdminAction::Decline => RsvpStatus::Declined,
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            AdminAction::Approve => "Send confirmation email to this guest?",
            AdminAction::Decline => "Send decline email to this guest?",
        }
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminAction::Approve => f.write_str("approve"),
            AdminAction::Decline => f.write_str("decline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied,
    /// The server accepted the change but refreshing the record list failed.
    AppliedReloadFailed(AdminError),
    /// The operator refused the confirmation; no remote call was made.
    Cancelled,
}

impl DispatchOutcome {
    pub fn was_applied(&self) -> bool {
        !matches!(self, DispatchOutcome::Cancelled)
    }
}

pub struct ActionDispatcher {
    store: Arc<dyn RecordStore>,
    confirmer: Arc<dyn Confirmer>,
}

impl ActionDispatcher {
    pub fn new(store: Arc<dyn RecordStore>, confirmer: Arc<dyn Confirmer>) -> Self {
        Self { store, confirmer }
    }

    /// Asks for confirmation, then issues exactly one status change.
    pub async fn dispatch(
        &self,
        action: AdminAction,
        id: &RsvpId,
        credential: &str,
    ) -> AdminResult<DispatchOutcome> {
        if !self.confirmer.confirm(action.prompt()).await {
            info!(record_id = %id, %action, "dispatch: cancelled by operator");
            return Ok(DispatchOutcome::Cancelled);
        }

        self.store
            .set_status(id, action.target_status(), credential)
            .await?;
        info!(record_id = %id, %action, "dispatch: applied");
        Ok(DispatchOutcome::Applied)
    }
}
