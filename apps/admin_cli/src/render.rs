use std::fmt::Write as _;

use admin_core::{Page, SortDirection, Stats, ViewCriteria};
use shared::domain::RsvpRecord;

const NAME_WIDTH: usize = 24;
const EMAIL_WIDTH: usize = 28;

pub fn render_dashboard(page: &Page<'_, RsvpRecord>, stats: Stats, criteria: &ViewCriteria) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Total: {}  Attending: {}  Pending: {}",
        stats.total, stats.attending, stats.pending
    );
    let _ = writeln!(out, "Sorted by {} {}", criteria.sort.column, arrow(criteria.sort.direction));
    out.push('\n');

    if page.items.is_empty() {
        out.push_str("No RSVPs found\n");
    } else {
        let _ = writeln!(
            out,
            "{:<NAME_WIDTH$}  {:<EMAIL_WIDTH$}  {:<9}  {:>6}  {:<8}  {:<16}  ID",
            "NAME", "EMAIL", "ATTENDING", "GUESTS", "STATUS", "SUBMITTED"
        );
        for record in page.items {
            let _ = writeln!(out, "{}", render_row(record));
        }
    }

    let _ = write!(out, "\nPage {} of {}", page.page_number, page.total_pages);
    out
}

fn render_row(record: &RsvpRecord) -> String {
    format!(
        "{:<NAME_WIDTH$}  {:<EMAIL_WIDTH$}  {:<9}  {:>6}  {:<8}  {:<16}  {}",
        truncate(&record.name, NAME_WIDTH),
        truncate(&record.email, EMAIL_WIDTH),
        record.attending.as_str(),
        record.guests,
        record.status.as_str(),
        record.submitted_at.format("%Y-%m-%d %H:%M").to_string(),
        record.id
    )
}

fn arrow(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "↑",
        SortDirection::Desc => "↓",
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
