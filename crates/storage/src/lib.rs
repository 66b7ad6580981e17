use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::info;

use shared::domain::{Attending, RsvpId, RsvpRecord, RsvpStatus};

const RSVP_COLUMNS: &str = "id, name, email, phone, attending, guests, dietary, message, \
                            status, submitted_at, approved_at";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Result of a guarded `pending -> approved|declined` update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    NotFound,
    NotPending(RsvpStatus),
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every pooled connection to `sqlite::memory:` would open a separate database.
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn insert_rsvp(&self, record: &RsvpRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO rsvps (id, name, email, phone, attending, guests, dietary, message,
                                status, submitted_at, approved_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.as_str())
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(record.attending.as_str())
        .bind(i64::from(record.guests))
        .bind(&record.dietary)
        .bind(&record.message)
        .bind(record.status.as_str())
        .bind(record.submitted_at)
        .bind(record.approved_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert rsvp '{}'", record.id))?;
        Ok(())
    }

    /// Inserts records whose ids are not stored yet and returns how many were added.
    pub async fn import_rsvps(&self, records: &[RsvpRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for record in records {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO rsvps (id, name, email, phone, attending, guests, dietary,
                                              message, status, submitted_at, approved_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(record.id.as_str())
            .bind(&record.name)
            .bind(&record.email)
            .bind(&record.phone)
            .bind(record.attending.as_str())
            .bind(i64::from(record.guests.max(1)))
            .bind(&record.dietary)
            .bind(&record.message)
            .bind(record.status.as_str())
            .bind(record.submitted_at)
            .bind(record.approved_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to import rsvp '{}'", record.id))?;
            inserted += result.rows_affected() as usize;
        }
        tx.commit().await?;
        info!(inserted, total = records.len(), "storage: rsvp import finished");
        Ok(inserted)
    }

    /// Full record set, newest submission first.
    pub async fn list_rsvps(&self) -> Result<Vec<RsvpRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RSVP_COLUMNS} FROM rsvps ORDER BY submitted_at DESC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    pub async fn load_rsvp(&self, id: &RsvpId) -> Result<Option<RsvpRecord>> {
        let row = sqlx::query(&format!("SELECT {RSVP_COLUMNS} FROM rsvps WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    /// Moves a pending record to a terminal status and stamps `approved_at`.
    /// The update is conditional on the stored status still being `pending`.
    pub async fn transition_status(
        &self,
        id: &RsvpId,
        new_status: RsvpStatus,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        if !new_status.is_terminal() {
            return Err(anyhow!("cannot transition rsvp '{id}' to {new_status}"));
        }

        let result = sqlx::query(
            "UPDATE rsvps SET status = ?, approved_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(new_status.as_str())
        .bind(at)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(TransitionOutcome::Applied);
        }

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM rsvps WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match current {
            None => Ok(TransitionOutcome::NotFound),
            Some(status) => Ok(TransitionOutcome::NotPending(RsvpStatus::from_str(&status)?)),
        }
    }
}

fn record_from_row(row: &SqliteRow) -> Result<RsvpRecord> {
    let guests: i64 = row.try_get("guests")?;
    Ok(RsvpRecord {
        id: RsvpId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        attending: Attending::from_str(&row.try_get::<String, _>("attending")?)?,
        guests: u32::try_from(guests).unwrap_or(1).max(1),
        dietary: row.try_get("dietary")?,
        message: row.try_get("message")?,
        status: RsvpStatus::from_str(&row.try_get::<String, _>("status")?)?,
        submitted_at: row.try_get("submitted_at")?,
        approved_at: row.try_get("approved_at")?,
    })
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
