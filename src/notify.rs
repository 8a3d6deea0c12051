//! Verification email composition and delivery.
//!
//! Implement [`MailTransport`] to plug in real delivery (SMTP, an API
//! provider, a queue). The notifier resolves the recipient, assembles
//! the full plain-text and HTML bodies, and only then dispatches, so a
//! failure never results in a partially composed message going out.

use crate::{
    backend::IdentityStore,
    config::VerifyConfig,
    error::VerifyError,
};
use email_address::EmailAddress;
use std::future::Future;
use std::str::FromStr;
use thiserror::Error;

/// Error type for mail dispatch.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Failed to deliver email.
    #[error("email delivery failed: {0}")]
    Delivery(String),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// A fully composed outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Destination address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// HTML body.
    pub html: String,
}

/// Trait for async email delivery.
///
/// Implementations may queue messages for background delivery or send
/// immediately.
pub trait MailTransport: Send + Sync + Clone + 'static {
    /// Dispatch a composed message.
    fn send(
        &self,
        email: &OutboundEmail,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Send a verification link to a user by email.
///
/// The recipient is resolved through the identity store (address to
/// user id, user id to display name); either lookup coming back empty
/// aborts delivery with [`VerifyError::IdentityResolution`]. An empty
/// subject falls back to the configured default.
pub async fn link_email_send<I: IdentityStore, M: MailTransport>(
    config: &VerifyConfig,
    identity: &I,
    mailer: &M,
    email: &str,
    link: &str,
    subject: &str,
    message: &str,
) -> Result<(), VerifyError> {
    let email = email_normalize(email)?;

    let user_id = identity
        .user_id_by_email(&email)
        .await
        .map_err(VerifyError::identity)?
        .ok_or_else(|| VerifyError::IdentityResolution(format!("no user for {email}")))?;

    let name = identity
        .display_name(&user_id)
        .await
        .map_err(VerifyError::identity)?
        .ok_or_else(|| {
            VerifyError::IdentityResolution(format!("no display name for user {user_id}"))
        })?;

    let (text, html) = email_bodies_compose(config, &name, message, link);
    let subject = if subject.trim().is_empty() {
        config.default_subject.as_str()
    } else {
        subject
    };

    let outbound = OutboundEmail {
        to: email,
        subject: subject.to_string(),
        text,
        html,
    };

    mailer.send(&outbound).await.map_err(|e| {
        tracing::error!(error = %e, to = %outbound.to, "Failed to send verification email");
        VerifyError::Transport(e.to_string())
    })?;

    tracing::info!(to = %outbound.to, "Verification email sent");
    Ok(())
}

/// Compose the plain-text and HTML bodies for a verification message.
///
/// Layout: greeting with the display name, the caller's message, the
/// link (inline in plain text, an anchor in HTML), and a fixed footer
/// naming the system and instructing the recipient not to reply.
pub fn email_bodies_compose(
    config: &VerifyConfig,
    name: &str,
    message: &str,
    link: &str,
) -> (String, String) {
    let footer = format!(
        "This message was automatically generated by the {} at {}. Please do not reply to this message.\n",
        config.system_name, config.host,
    );
    let html_footer = format!(
        "This message was automatically generated by the {} at <a href=\"{host}\">{host}</a>. Please do not reply to this message.<br/>",
        config.system_name,
        host = config.host,
    );

    let mut plain = format!("Hello {name},\n\n{message}\n");
    let mut html = plain.replace('\n', "<br/>");

    plain.push_str(link);
    plain.push_str("\n\n");
    plain.push_str(&footer);

    html.push_str(&format!("<a href=\"{link}\">{link}</a><br/><br/>"));
    html.push_str(&html_footer);

    (plain, html)
}

/// Validate and normalize an email address.
///
/// Trims whitespace, checks RFC 5322 compliance, and lowercases for
/// consistent identity lookups.
fn email_normalize(email: &str) -> Result<String, VerifyError> {
    let trimmed = email.trim();
    let parsed = EmailAddress::from_str(trimmed).map_err(|_| VerifyError::InvalidEmail)?;
    Ok(parsed.as_str().to_lowercase())
}
