use shared::domain::ValidationErrors;
use thiserror::Error;

pub type AdminResult<T> = std::result::Result<T, AdminError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    /// The credential was rejected or is missing. The session has been logged out.
    #[error("admin credential rejected; please log in again")]
    Auth,
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("{}", transport_message(.status, .message))]
    Transport { status: Option<u16>, message: String },
}

impl AdminError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(self, AdminError::Auth)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AdminError::Transport { status, .. } => *status,
            AdminError::Auth => Some(401),
            AdminError::Validation(_) => None,
        }
    }
}

impl From<ValidationErrors> for AdminError {
    fn from(value: ValidationErrors) -> Self {
        AdminError::Validation(value.0)
    }
}

impl From<reqwest::Error> for AdminError {
    fn from(value: reqwest::Error) -> Self {
        AdminError::Transport {
            status: value.status().map(|s| s.as_u16()),
            message: value.to_string(),
        }
    }
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("request failed with HTTP {code}: {message}"),
        None => format!("request failed: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_lists_all_messages() {
        let err = AdminError::Validation(vec!["Name is required".into(), "Email is invalid".into()]);
        assert_eq!(err.to_string(), "Name is required, Email is invalid");
        assert!(!err.requires_reauth());
    }

    #[test]
    fn transport_carries_status() {
        let err = AdminError::transport(Some(500), "boom");
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "request failed with HTTP 500: boom");
        assert!(AdminError::Auth.requires_reauth());
    }
}
