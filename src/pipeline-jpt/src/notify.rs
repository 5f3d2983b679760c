//! New-job emails.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use core_jpt::EmailConfig;
use data_model_jpt::models::NewJob;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::json;

/// Resend's send-email endpoint.
pub const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Email delivery is not configured: {0} is missing")]
    NotConfigured(&'static str),

    #[error("Could not reach the email service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email service rejected the message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid email address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),

    #[error("Could not build the email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Delivers one aggregate notification for a batch of new jobs. All or nothing.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, jobs: &[NewJob]) -> Result<(), NotifyError>;
}

/// Which channel a configuration delivers through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Resend,
    Smtp,
    Unconfigured,
}

impl Delivery {
    /// Resend when its API key is set, else SMTP when a password is set.
    pub fn for_config(config: &EmailConfig) -> Self {
        if config.recipient.is_none() {
            Delivery::Unconfigured
        } else if config.api_key.is_some() {
            Delivery::Resend
        } else if config.smtp.password.is_some() {
            Delivery::Smtp
        } else {
            Delivery::Unconfigured
        }
    }
}

/// The notifier for `config`. An unconfigured one fails every non-empty send with `NotConfigured`.
pub fn notifier_for(config: &EmailConfig) -> Arc<dyn Notifier> {
    match Delivery::for_config(config) {
        Delivery::Resend => Arc::new(ResendNotifier::new(config.clone())),
        Delivery::Smtp | Delivery::Unconfigured => Arc::new(SmtpNotifier::new(config.clone())),
    }
}

/// Sends through the Resend HTTP API.
pub struct ResendNotifier {
    client: reqwest::Client,
    config: EmailConfig,
    endpoint: String,
}

impl ResendNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            endpoint: RESEND_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, jobs: &[NewJob]) -> Result<(), NotifyError> {
        if jobs.is_empty() {
            tracing::debug!("No jobs to notify about");
            return Ok(());
        }
        let recipient = self
            .config
            .recipient
            .as_deref()
            .ok_or(NotifyError::NotConfigured("EMAIL_RECIPIENT"))?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(NotifyError::NotConfigured("RESEND_API_KEY"))?;

        let sent_at = Local::now();
        let message = json!({
            "from": self.config.sender,
            "to": [recipient],
            "subject": subject(jobs.len()),
            "html": render_html(jobs, sent_at),
            "text": render_text(jobs, sent_at),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&message)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Sent notification for {} new jobs to {}", jobs.len(), recipient);
        Ok(())
    }
}

/// Sends a multipart text + HTML message through an SMTP relay, upgrading with STARTTLS.
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn message(&self, recipient: &str, jobs: &[NewJob], sent_at: DateTime<Local>) -> Result<Message, NotifyError> {
        let message = Message::builder()
            .from(self.config.sender.parse::<Mailbox>()?)
            .to(recipient.parse::<Mailbox>()?)
            .subject(subject(jobs.len()))
            .multipart(MultiPart::alternative_plain_html(
                render_text(jobs, sent_at),
                render_html(jobs, sent_at),
            ))?;
        Ok(message)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, jobs: &[NewJob]) -> Result<(), NotifyError> {
        if jobs.is_empty() {
            tracing::debug!("No jobs to notify about");
            return Ok(());
        }
        let recipient = self
            .config
            .recipient
            .as_deref()
            .ok_or(NotifyError::NotConfigured("EMAIL_RECIPIENT"))?;
        let password = self
            .config
            .smtp
            .password
            .as_deref()
            .ok_or(NotifyError::NotConfigured("RESEND_API_KEY or EMAIL_PASSWORD"))?;

        let message = self.message(recipient, jobs, Local::now())?;
        let username = match &self.config.smtp.username {
            Some(username) => username.clone(),
            None => self.config.sender.parse::<Mailbox>()?.email.to_string(),
        };

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp.server)?
            .port(self.config.smtp.port)
            .credentials(Credentials::new(username, password.to_string()))
            .build();
        mailer.send(message).await?;

        tracing::info!(
            "Sent notification for {} new jobs to {} via {}",
            jobs.len(),
            recipient,
            self.config.smtp.server
        );
        Ok(())
    }
}

pub fn subject(count: usize) -> String {
    format!("{} New Job Opening{} Found!", count, if count == 1 { "" } else { "s" })
}

pub fn render_text(jobs: &[NewJob], sent_at: DateTime<Local>) -> String {
    let mut text = format!("{}\n\nThe following new positions have been posted:\n\n", subject(jobs.len()));
    for (i, job) in jobs.iter().enumerate() {
        let _ = writeln!(text, "{}. {}", i + 1, job.title);
        let _ = writeln!(text, "   Company: {}", job.company);
        let _ = writeln!(text, "   Location: {}", job.location);
        if !job.url.is_empty() {
            let _ = writeln!(text, "   Link: {}", job.url);
        }
        text.push('\n');
    }
    let _ = write!(text, "---\nSent by Job Pipeline Tracker • {}", sent_at.format("%Y-%m-%d %H:%M"));
    text
}

pub fn render_html(jobs: &[NewJob], sent_at: DateTime<Local>) -> String {
    let mut rows = String::new();
    for job in jobs {
        let title = if job.url.is_empty() {
            escape_html(&job.title)
        } else {
            format!(r#"<a href="{}">{}</a>"#, escape_html(&job.url), escape_html(&job.title))
        };
        let _ = write!(
            rows,
            r#"<tr><td style="padding: 12px; border-bottom: 1px solid #eee;"><strong>{}</strong><br><span style="color: #666;">{} • {}</span></td></tr>"#,
            title,
            escape_html(&job.company),
            escape_html(&job.location)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
<div style="max-width: 600px; margin: 0 auto; padding: 20px;">
<h1 style="color: #2563eb; border-bottom: 2px solid #2563eb; padding-bottom: 10px;">{}</h1>
<p>The following new positions have been posted:</p>
<table style="width: 100%; border-collapse: collapse; margin-top: 20px;">{}</table>
<p style="margin-top: 30px; color: #888; font-size: 12px;">Sent by Job Pipeline Tracker • {}</p>
</div>
</body>
</html>"#,
        subject(jobs.len()),
        rows,
        sent_at.format("%Y-%m-%d %H:%M")
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
