use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RsvpId(pub String);

impl RsvpId {
    /// `rsvp_<unix millis>_<9 alphanumerics>`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let entropy = Uuid::new_v4().simple().to_string();
        Self(format!("rsvp_{}_{}", now.timestamp_millis(), &entropy[..9]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RsvpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RsvpId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attending {
    Yes,
    No,
}

impl Attending {
    pub fn as_str(self) -> &'static str {
        match self {
            Attending::Yes => "yes",
            Attending::No => "no",
        }
    }
}

impl FromStr for Attending {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Attending::Yes),
            "no" => Ok(Attending::No),
            _ => Err(ParseEnumError {
                kind: "attending",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Attending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval lifecycle of a record. `Approved` and `Declined` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    #[default]
    #[serde(alias = "Pending", alias = "Pending Review")]
    Pending,
    #[serde(alias = "Approved")]
    Approved,
    #[serde(alias = "Declined")]
    Declined,
}

impl RsvpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RsvpStatus::Pending => "pending",
            RsvpStatus::Approved => "approved",
            RsvpStatus::Declined => "declined",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RsvpStatus::Pending)
    }

    pub fn can_transition_to(self, next: RsvpStatus) -> bool {
        self == RsvpStatus::Pending && next.is_terminal()
    }
}

impl FromStr for RsvpStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "pending review" => Ok(RsvpStatus::Pending),
            "approved" => Ok(RsvpStatus::Approved),
            "declined" => Ok(RsvpStatus::Declined),
            _ => Err(ParseEnumError {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpRecord {
    pub id: RsvpId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub attending: Attending,
    #[serde(default = "default_guests")]
    pub guests: u32,
    #[serde(default)]
    pub dietary: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: RsvpStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
}

fn default_guests() -> u32 {
    1
}

/// Raw submission as it arrives from the public form. Everything is optional
/// so that validation can report every missing field at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRsvp {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub attending: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guests")]
    pub guests: Option<u32>,
    #[serde(default)]
    pub dietary: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.join(", "))]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl NewRsvp {
    /// Checks every rule and reports all violations together.
    pub fn validate(&self) -> Result<Attending, ValidationErrors> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Name is required".to_string());
        }

        if self.email.trim().is_empty() {
            errors.push("Email is required".to_string());
        } else if !is_valid_email(&self.email) {
            errors.push("Email is invalid".to_string());
        }

        let attending = match self.attending.as_deref() {
            Some("yes") => Some(Attending::Yes),
            Some("no") => Some(Attending::No),
            _ => None,
        };
        if attending.is_none() {
            errors.push("Attendance selection is required".to_string());
        }

        match attending {
            Some(attending) if errors.is_empty() => Ok(attending),
            _ => Err(ValidationErrors(errors)),
        }
    }

    /// Validates and produces the stored shape: trimmed fields, lowercased
    /// email, `pending` status.
    pub fn into_record(
        self,
        id: RsvpId,
        submitted_at: DateTime<Utc>,
    ) -> Result<RsvpRecord, ValidationErrors> {
        let attending = self.validate()?;
        Ok(RsvpRecord {
            id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            attending,
            guests: self.guests.filter(|g| *g > 0).unwrap_or(1),
            dietary: self.dietary.trim().to_string(),
            message: self.message.trim().to_string(),
            status: RsvpStatus::Pending,
            submitted_at,
            approved_at: None,
        })
    }
}

/// Basic `local@domain.tld` shape: no whitespace, exactly one `@`, and a dot
/// inside the domain with at least one character on each side.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let last = domain.len().saturating_sub(1);
    domain
        .char_indices()
        .any(|(idx, ch)| ch == '.' && idx > 0 && idx < last)
}

fn deserialize_guests<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum GuestsField {
        Number(i64),
        Float(f64),
        Text(String),
    }

    let raw = Option::<GuestsField>::deserialize(deserializer)?;
    Ok(match raw {
        Some(GuestsField::Number(n)) => u32::try_from(n).ok(),
        Some(GuestsField::Float(f)) if f.is_finite() && f >= 0.0 => u32::try_from(f as i64).ok(),
        Some(GuestsField::Text(s)) => leading_integer(&s),
        _ => None,
    })
}

// Mirrors form input semantics: "2 guests" counts as 2, garbage counts as absent.
fn leading_integer(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
