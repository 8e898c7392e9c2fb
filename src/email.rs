use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Outbound mail, behind a trait so tests can swap in a no-op transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, to: &str, activation_code: &str) -> anyhow::Result<()>;
    async fn send_password_reset(&self, to: &str, reset_token: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
    site_name: String,
    site_url: String,
}

impl SmtpMailer {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let smtp = &config.smtp;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .context("build smtp transport")?
            .port(smtp.port);
        if !smtp.user.is_empty() {
            builder = builder.credentials(Credentials::new(smtp.user.clone(), smtp.pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            sender: smtp.sender.clone(),
            site_name: config.site_name.clone(),
            site_url: config.site_url.clone(),
        })
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.sender.parse().context("parse sender address")?)
            .to(to.parse().context("parse recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email message")?;

        self.transport
            .send(message)
            .await
            .with_context(|| format!("send email to {to}"))?;
        info!(%to, %subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_welcome(&self, to: &str, activation_code: &str) -> anyhow::Result<()> {
        let subject = format!("{} - Email Verification", self.site_name);
        let body = format!(
            "Hello {to},\n\nYour account activation code is: {activation_code}\n"
        );
        self.send(to, &subject, body).await
    }

    async fn send_password_reset(&self, to: &str, reset_token: &str) -> anyhow::Result<()> {
        let subject = format!("{} - Reset Your Password", self.site_name);
        let url = format!("{}/reset-password/{}", self.site_url, reset_token);
        let body = format!(
            "Hello {to},\n\nOpen the link below to reset your password:\n\n{url}\n"
        );
        self.send(to, &subject, body).await
    }
}

/// Mailer that records nothing and always succeeds, for tests.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_welcome(&self, _to: &str, _activation_code: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn send_password_reset(&self, _to: &str, _reset_token: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fire-and-forget welcome email: failures are logged, never surfaced to the
/// request that triggered the send.
pub fn spawn_welcome(mailer: Arc<dyn Mailer>, to: String, code: String) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send_welcome(&to, &code).await {
            warn!(error = %e, %to, "welcome email failed");
        }
    });
}

/// Fire-and-forget password reset email.
pub fn spawn_password_reset(mailer: Arc<dyn Mailer>, to: String, token: String) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send_password_reset(&to, &token).await {
            warn!(error = %e, %to, "password reset email failed");
        }
    });
}
