use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub admin_secret: Option<String>,
    pub email: EmailSettings,
    pub wedding: WeddingDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
}

/// Event facts quoted in guest emails.
#[derive(Debug, Clone, Deserialize)]
pub struct WeddingDetails {
    pub couple: String,
    pub date: String,
    pub details_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8787".into(),
            database_url: "sqlite://./data/rsvps.db".into(),
            admin_secret: None,
            email: EmailSettings {
                api_url: DEFAULT_EMAIL_API_URL.into(),
                api_key: None,
                from: "RSVP <rsvp@example.com>".into(),
            },
            wedding: WeddingDetails::default(),
        }
    }
}

impl Default for WeddingDetails {
    fn default() -> Self {
        Self {
            couple: "J-D & A-N".into(),
            date: "June 12, 2026".into(),
            details_url: "https://sevendeadly.github.io/summer_Dream/views/info.html".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string("server.toml").ok();
    load_settings_from(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `server.toml` keys, then environment overrides.
/// Later sources win; `APP__*` names win over their short forms.
pub fn load_settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, String>>(raw) {
            Ok(file_cfg) => apply(&mut settings, |key| file_cfg.get(key).cloned()),
            Err(error) => warn!(%error, "ignoring malformed server.toml"),
        }
    }

    apply(&mut settings, |key| {
        env(&format!("APP__{}", key.to_ascii_uppercase()))
            .or_else(|| env(env_alias(key)))
    });

    settings
}

fn env_alias(key: &str) -> &str {
    match key {
        "bind_addr" => "SERVER_BIND",
        "database_url" => "DATABASE_URL",
        "admin_secret" => "ADMIN_SECRET",
        "email_api_url" => "EMAIL_API_URL",
        "email_api_key" => "EMAIL_API_KEY",
        "email_from" => "EMAIL_FROM",
        "wedding_couple" => "WEDDING_COUPLE",
        "wedding_date" => "WEDDING_DATE",
        "wedding_details_url" => "WEDDING_DETAILS_URL",
        other => other,
    }
}

fn apply(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(v) = get("bind_addr") {
        settings.server_bind = v;
    }
    if let Some(v) = get("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = get("admin_secret") {
        settings.admin_secret = Some(v);
    }
    if let Some(v) = get("email_api_url") {
        settings.email.api_url = v;
    }
    if let Some(v) = get("email_api_key") {
        settings.email.api_key = Some(v);
    }
    if let Some(v) = get("email_from") {
        settings.email.from = v;
    }
    if let Some(v) = get("wedding_couple") {
        settings.wedding.couple = v;
    }
    if let Some(v) = get("wedding_date") {
        settings.wedding.date = v;
    }
    if let Some(v) = get("wedding_details_url") {
        settings.wedding.details_url = v;
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        return sqlite_url_for_path(path);
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return sqlite_url_for_path(path);
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    sqlite_url_for_path(raw_database_url)
}

// Drive-letter paths keep a single colon so sqlx does not read `C:` as a host.
fn sqlite_url_for_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    if has_drive_prefix(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
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
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
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
#[path = "tests/config_tests.rs"]
mod tests;
