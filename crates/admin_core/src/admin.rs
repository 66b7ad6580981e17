use std::{fmt, sync::Arc};

use shared::domain::{Attending, RsvpId, RsvpRecord, RsvpStatus};
use tracing::{info, warn};

use crate::{
    credentials::SessionContext,
    dispatcher::{ActionDispatcher, AdminAction, Confirmer, DispatchOutcome},
    error::{AdminError, AdminResult},
    pagination::{total_pages, Page, Pager},
    record_store::RecordStore,
    view::{derive, SortColumn, SortSpec, ViewCriteria},
};

/// Counters over the derived view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub attending: usize,
    pub pending: usize,
}

/// One record prepared for display; empty optional fields render as
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDetails {
    pub record: RsvpRecord,
}

impl fmt::Display for RecordDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.record;
        writeln!(f, "Guest Details")?;
        writeln!(f)?;
        writeln!(f, "Name: {}", r.name)?;
        writeln!(f, "Email: {}", r.email)?;
        writeln!(f, "Phone: {}", or_placeholder(&r.phone, "N/A"))?;
        writeln!(f, "Attending: {}", r.attending)?;
        writeln!(f, "Guests: {}", r.guests)?;
        writeln!(f, "Dietary Restrictions: {}", or_placeholder(&r.dietary, "None"))?;
        writeln!(f, "Message: {}", or_placeholder(&r.message, "None"))?;
        writeln!(f, "Status: {}", r.status)?;
        write!(f, "Submitted: {}", r.submitted_at.to_rfc3339())?;
        if let Some(approved_at) = r.approved_at {
            write!(f, "\nReviewed: {}", approved_at.to_rfc3339())?;
        }
        Ok(())
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

/// Controller for the admin dashboard. Owns the loaded records, the view
/// criteria and the page cursor; rendering is up to the caller.
pub struct AdminSession {
    store: Arc<dyn RecordStore>,
    session: SessionContext,
    records: Vec<RsvpRecord>,
    criteria: ViewCriteria,
    view: Vec<RsvpRecord>,
    pager: Pager,
}

impl AdminSession {
    pub fn new(store: Arc<dyn RecordStore>, session: SessionContext) -> Self {
        Self {
            store,
            session,
            records: Vec::new(),
            criteria: ViewCriteria::default(),
            view: Vec::new(),
            pager: Pager::default(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.pager = Pager::new(page_size);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn login(&mut self, secret: &str) -> AdminResult<()> {
        self.session.login(secret)?;
        info!("admin: logged in");
        Ok(())
    }

    /// Clears the credential and every piece of loaded state.
    pub fn logout(&mut self) {
        self.session.logout();
        self.records.clear();
        self.view.clear();
        self.pager.reset();
        info!("admin: logged out");
    }

    /// Replaces the record set wholesale and resets to page 1.
    pub async fn load(&mut self) -> AdminResult<usize> {
        let credential = self.credential()?;
        let records = match self.store.load_all(&credential).await {
            Ok(records) => records,
            Err(err) => return Err(self.on_error(err)),
        };
        self.records = records;
        self.refresh_view();
        info!(count = self.records.len(), "admin: records loaded");
        Ok(self.records.len())
    }

    pub fn records(&self) -> &[RsvpRecord] {
        &self.records
    }

    pub fn view(&self) -> &[RsvpRecord] {
        &self.view
    }

    pub fn criteria(&self) -> &ViewCriteria {
        &self.criteria
    }

    pub fn set_attending_filter(&mut self, attending: Option<Attending>) {
        self.criteria.attending = attending;
        self.refresh_view();
    }

    pub fn set_status_filter(&mut self, status: Option<RsvpStatus>) {
        self.criteria.status = status;
        self.refresh_view();
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.criteria.search = term.into();
        self.refresh_view();
    }

    pub fn sort_by(&mut self, column: SortColumn) {
        self.criteria.sort = self.criteria.sort.toggled(column);
        self.refresh_view();
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.criteria.sort = sort;
        self.refresh_view();
    }

    pub fn next_page(&mut self) -> bool {
        self.pager.next(self.view.len())
    }

    pub fn previous_page(&mut self) -> bool {
        self.pager.previous()
    }

    pub fn go_to_page(&mut self, page_number: usize) -> AdminResult<()> {
        if self.pager.go_to(page_number, self.view.len()) {
            return Ok(());
        }
        Err(AdminError::validation(format!(
            "Page {page_number} is out of range (1-{})",
            total_pages(self.view.len(), self.pager.page_size())
        )))
    }

    pub fn current_page(&self) -> Page<'_, RsvpRecord> {
        self.pager.page(&self.view)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total: self.view.len(),
            attending: self
                .view
                .iter()
                .filter(|r| r.attending == Attending::Yes)
                .count(),
            pending: self
                .view
                .iter()
                .filter(|r| r.status == RsvpStatus::Pending)
                .count(),
        }
    }

    pub fn details(&self, id: &RsvpId) -> AdminResult<RecordDetails> {
        self.find(id).cloned().map(|record| RecordDetails { record })
    }

    pub async fn approve(
        &mut self,
        id: &RsvpId,
        confirmer: Arc<dyn Confirmer>,
    ) -> AdminResult<DispatchOutcome> {
        self.act(AdminAction::Approve, id, confirmer).await
    }

    pub async fn decline(
        &mut self,
        id: &RsvpId,
        confirmer: Arc<dyn Confirmer>,
    ) -> AdminResult<DispatchOutcome> {
        self.act(AdminAction::Decline, id, confirmer).await
    }

    async fn act(
        &mut self,
        action: AdminAction,
        id: &RsvpId,
        confirmer: Arc<dyn Confirmer>,
    ) -> AdminResult<DispatchOutcome> {
        let credential = self.credential()?;
        let current = self.find(id)?.status;
        if !current.can_transition_to(action.target_status()) {
            return Err(AdminError::validation(format!(
                "RSVP '{id}' is already {current}"
            )));
        }

        let dispatcher = ActionDispatcher::new(self.store.clone(), confirmer);
        let outcome = match dispatcher.dispatch(action, id, &credential).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.on_error(err)),
        };
        if outcome != DispatchOutcome::Applied {
            return Ok(outcome);
        }
        match self.load().await {
            Ok(_) => Ok(DispatchOutcome::Applied),
            Err(err) => {
                warn!(record_id = %id, error = %err, %action, "admin: reload after action failed");
                Ok(DispatchOutcome::AppliedReloadFailed(err))
            }
        }
    }

    fn find(&self, id: &RsvpId) -> AdminResult<&RsvpRecord> {
        self.records
            .iter()
            .find(|record| &record.id == id)
            .ok_or_else(|| AdminError::validation(format!("RSVP '{id}' not found")))
    }

    fn credential(&mut self) -> AdminResult<String> {
        match self.session.require_credential() {
            Ok(credential) => Ok(credential),
            Err(err) => Err(self.on_error(err)),
        }
    }

    fn on_error(&mut self, err: AdminError) -> AdminError {
        if err.requires_reauth() {
            warn!("admin: credential rejected, logging out");
            self.logout();
        }
        err
    }

    fn refresh_view(&mut self) {
        self.view = derive(&self.records, &self.criteria);
        self.pager.reset();
    }
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
