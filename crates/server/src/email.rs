//! Guest notification emails and the transports that deliver them.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::domain::{Attending, RsvpRecord, RsvpStatus};
use tracing::info;

use crate::config::{EmailSettings, WeddingDetails};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Resend-compatible JSON API with bearer auth.
pub struct HttpMailer {
    http: Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct SendEmailPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&SendEmailPayload {
                from: &self.from,
                to: [&message.to],
                subject: &message.subject,
                html: &message.html,
            })
            .send()
            .await
            .context("email api request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("email api returned HTTP {status}: {body}"));
        }
        info!(to = %message.to, subject = %message.subject, "email: delivered");
        Ok(())
    }
}

/// Logs messages instead of sending them; used when no API key is configured.
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            bytes = message.html.len(),
            "email: console delivery"
        );
        Ok(())
    }
}

pub fn mailer_from_settings(settings: &EmailSettings) -> Arc<dyn Mailer> {
    match settings.api_key.as_deref() {
        Some(key) => Arc::new(HttpMailer::new(&settings.api_url, key, &settings.from)),
        None => {
            info!("email: no api key configured, logging emails instead of sending");
            Arc::new(ConsoleMailer)
        }
    }
}

/// Picks the template for a decision on `record`. Only terminal statuses
/// produce mail.
pub fn render_status_email(
    record: &RsvpRecord,
    status: RsvpStatus,
    wedding: &WeddingDetails,
) -> Option<EmailMessage> {
    let (subject, body) = match (status, record.attending) {
        (RsvpStatus::Approved, Attending::Yes) => {
            ("Your RSVP is Confirmed", confirmed_body(record, wedding))
        }
        (RsvpStatus::Approved, Attending::No) => {
            ("Thank You for Letting Us Know", regrets_body(record, wedding))
        }
        (RsvpStatus::Declined, _) => ("About Your RSVP", declined_body(record, wedding)),
        (RsvpStatus::Pending, _) => return None,
    };

    Some(EmailMessage {
        to: record.email.clone(),
        subject: subject.to_string(),
        html: layout(wedding, &body),
    })
}

fn confirmed_body(record: &RsvpRecord, wedding: &WeddingDetails) -> String {
    let mut details = format!(
        "<p><strong>Name:</strong> {}</p><p><strong>Number of Guests:</strong> {}</p>",
        escape_html(&record.name),
        record.guests
    );
    if !record.dietary.is_empty() {
        details.push_str(&format!(
            "<p><strong>Dietary Requirements:</strong> {}</p>",
            escape_html(&record.dietary)
        ));
    }
    if !record.message.is_empty() {
        details.push_str(&format!(
            "<p><strong>Your Message:</strong> &quot;{}&quot;</p>",
            escape_html(&record.message)
        ));
    }

    format!(
        "<h2>Dear {name},</h2>\
         <p>We're absolutely thrilled that you'll be joining us on our special day! \
         Your RSVP has been confirmed.</p>\
         <div class=\"details\"><h3>Your RSVP Details</h3>{details}</div>\
         <p><strong>Date:</strong> {date}</p>\
         <p><a href=\"{url}\">View Full Wedding Details</a></p>",
        name = escape_html(&record.name),
        date = escape_html(&wedding.date),
        url = escape_html(&wedding.details_url),
    )
}

fn regrets_body(record: &RsvpRecord, wedding: &WeddingDetails) -> String {
    let mut body = format!(
        "<h2>Dear {},</h2>\
         <p>Thank you so much for taking the time to let us know you won't be able \
         to join us on {}.</p>\
         <p>We're sad you can't be there, but we completely understand.</p>",
        escape_html(&record.name),
        escape_html(&wedding.date),
    );
    if !record.message.is_empty() {
        body.push_str(&format!(
            "<p><em>Your message: &quot;{}&quot;</em></p>",
            escape_html(&record.message)
        ));
    }
    body
}

fn declined_body(record: &RsvpRecord, wedding: &WeddingDetails) -> String {
    format!(
        "<h2>Dear {},</h2>\
         <p>Thank you for your RSVP. Unfortunately we are unable to confirm your \
         attendance for our celebration on {}.</p>\
         <p>If you believe this is a mistake, please reply to this email.</p>",
        escape_html(&record.name),
        escape_html(&wedding.date),
    )
}

fn layout(wedding: &WeddingDetails, body: &str) -> String {
    let couple = escape_html(&wedding.couple);
    format!(
        "<!DOCTYPE html><html><body>\
         <div class=\"header\"><h2>{couple}</h2><p>{date}</p></div>\
         <div class=\"content\">{body}<p><em>With love,</em><br><strong>{couple}</strong></p></div>\
         <div class=\"footer\"><p>This email was sent because you submitted an RSVP for our wedding.</p></div>\
         </body></html>",
        date = escape_html(&wedding.date),
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
