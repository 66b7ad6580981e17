//! Filter/sort engine: a pure projection of the loaded record set.

use std::{cmp::Ordering, fmt, str::FromStr};

use shared::domain::{Attending, RsvpRecord, RsvpStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    Name,
    Email,
    Phone,
    Attending,
    Guests,
    Status,
    SubmittedAt,
    ApprovedAt,
}

impl SortColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::Email => "email",
            SortColumn::Phone => "phone",
            SortColumn::Attending => "attending",
            SortColumn::Guests => "guests",
            SortColumn::Status => "status",
            SortColumn::SubmittedAt => "submittedAt",
            SortColumn::ApprovedAt => "approvedAt",
        }
    }

    fn compare(self, a: &RsvpRecord, b: &RsvpRecord) -> Ordering {
        match self {
            SortColumn::Name => compare_text(&a.name, &b.name),
            SortColumn::Email => compare_text(&a.email, &b.email),
            SortColumn::Phone => compare_text(&a.phone, &b.phone),
            SortColumn::Attending => compare_text(a.attending.as_str(), b.attending.as_str()),
            SortColumn::Guests => a.guests.cmp(&b.guests),
            SortColumn::Status => compare_text(a.status.as_str(), b.status.as_str()),
            SortColumn::SubmittedAt => a.submitted_at.cmp(&b.submitted_at),
            SortColumn::ApprovedAt => a.approved_at.cmp(&b.approved_at),
        }
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "name" => Ok(SortColumn::Name),
            "email" => Ok(SortColumn::Email),
            "phone" => Ok(SortColumn::Phone),
            "attending" => Ok(SortColumn::Attending),
            "guests" => Ok(SortColumn::Guests),
            "status" => Ok(SortColumn::Status),
            "submittedat" | "submitted" => Ok(SortColumn::SubmittedAt),
            "approvedat" | "approved" => Ok(SortColumn::ApprovedAt),
            _ => Err(format!("unknown sort column '{s}'")),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: SortColumn::SubmittedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    /// Same column flips the direction; a new column starts ascending.
    pub fn toggled(self, column: SortColumn) -> Self {
        if self.column == column {
            Self {
                column,
                direction: self.direction.flipped(),
            }
        } else {
            Self {
                column,
                direction: SortDirection::Asc,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewCriteria {
    pub attending: Option<Attending>,
    pub status: Option<RsvpStatus>,
    pub search: String,
    pub sort: SortSpec,
}

impl ViewCriteria {
    pub fn matches(&self, record: &RsvpRecord) -> bool {
        if self.attending.is_some_and(|wanted| record.attending != wanted) {
            return false;
        }
        if self.status.is_some_and(|wanted| record.status != wanted) {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }
        let term = self.search.to_lowercase();
        record.name.to_lowercase().contains(&term) || record.email.to_lowercase().contains(&term)
    }
}

/// Filters conjunctively, then sorts with a stable sort so that records with
/// equal keys keep their input order in either direction.
pub fn derive(records: &[RsvpRecord], criteria: &ViewCriteria) -> Vec<RsvpRecord> {
    let mut filtered: Vec<RsvpRecord> = records
        .iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect();

    let SortSpec { column, direction } = criteria.sort;
    filtered.sort_by(|a, b| {
        let ordering = column.compare(a, b);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    filtered
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
