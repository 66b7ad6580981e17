//! Admin-side RSVP management: an authenticated record client, a pure
//! filter/sort engine, client-side pagination and the approve/decline
//! workflow. Rendering is left to callers.

pub mod admin;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod pagination;
pub mod record_store;
pub mod submission;
pub mod view;

pub use admin::{AdminSession, RecordDetails, Stats};
pub use credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionContext,
};
pub use dispatcher::{ActionDispatcher, AdminAction, Confirmer, DispatchOutcome};
pub use error::{AdminError, AdminResult};
pub use pagination::{paginate, Page, Pager, DEFAULT_PAGE_SIZE};
pub use record_store::{Ack, HttpRecordStore, RecordStore};
pub use submission::RsvpSubmitter;
pub use view::{derive, SortColumn, SortDirection, SortSpec, ViewCriteria};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
