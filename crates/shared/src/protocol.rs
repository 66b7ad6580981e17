use serde::{Deserialize, Serialize};

use crate::domain::{RsvpId, RsvpRecord, RsvpStatus};

/// Header carrying the admin credential on privileged requests.
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

pub const RSVPS_ROUTE: &str = "/rsvps";
pub const RSVP_STATUS_ROUTE: &str = "/rsvps/status";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsvpListResponse {
    #[serde(default)]
    pub results: Vec<RsvpRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub record_id: RsvpId,
    pub credential: String,
    pub new_status: RsvpStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRsvpResponse {
    pub success: bool,
    pub id: RsvpId,
    pub message: String,
}
