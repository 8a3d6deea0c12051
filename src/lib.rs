//! # verilink
//!
//! Email verification-link issuance and delivery for Axum applications.
//!
//! ## Features
//!
//! - **Unguessable tokens** (256-bit, URL-safe) with no caller-side
//!   uniqueness bookkeeping
//! - **Single-active-token invariant** per (user, action) key, enforced
//!   by the store's atomic insert
//! - **Two issuance policies**: strict (reject when a token exists) and
//!   replace (supersede in place)
//! - **Extensible storage traits** for any database
//! - **Pluggable mail transport** with plain-text + HTML composition
//! - **Skill rating routes** as drop-in Axum handlers
//!
//! ## Quick Start
//!
//! Implement the collaborator traits for your infrastructure:
//!
//! ```rust,ignore
//! use verilink::{VerificationStore, IdentityStore, MailTransport};
//!
//! #[derive(Clone)]
//! struct PgStore { /* your db pool */ }
//!
//! impl VerificationStore for PgStore {
//!     type Error = sqlx::Error;
//!     // ... find / insert / update
//! }
//! ```
//!
//! Then build a [`Verify`] instance and issue links:
//!
//! ```rust,ignore
//! use verilink::{Verify, VerifyAction, VerifyConfig};
//!
//! let verify = Verify::new(VerifyConfig::from_env()?, store, identity, mailer)?;
//!
//! let link = verify.issue_strict(VerifyAction::EmailVerify, "42").await?;
//! verify
//!     .link_send(
//!         "student@example.com",
//!         &link,
//!         "Confirm your account",
//!         "Click the link below to confirm your account.",
//!     )
//!     .await?;
//! ```
//!
//! Issuing again for the same key fails with
//! [`VerifyError::TokenConflict`] until the confirmation handler
//! consumes the record; use [`Verify::issue_or_replace`] for resend
//! flows where the newest link should win.

mod action;
mod backend;
mod config;
mod error;
mod link;
mod notify;
pub mod skills;
pub mod testing;
mod token;

use std::sync::Arc;

pub use action::VerifyAction;
pub use backend::{IdentityStore, InsertOutcome, VerificationRecord, VerificationStore};
pub use config::{VerifyConfig, VerifyConfigError};
pub use error::VerifyError;
pub use link::{link_build, link_issue_or_replace, link_issue_strict};
pub use notify::{email_bodies_compose, link_email_send, MailTransport, OutboundEmail, TransportError};
pub use token::token_generate;

/// Verification-link issuance and delivery. Cheap to clone.
///
/// # Type Parameters
///
/// - `S`: verification storage implementing [`VerificationStore`]
/// - `I`: identity lookups implementing [`IdentityStore`]
/// - `M`: mail dispatch implementing [`MailTransport`]
#[derive(Clone)]
pub struct Verify<S: VerificationStore, I: IdentityStore, M: MailTransport> {
    config: Arc<VerifyConfig>,
    store: S,
    identity: I,
    mailer: M,
}

impl<S: VerificationStore, I: IdentityStore, M: MailTransport> Verify<S, I, M> {
    /// Create a verification instance over the given collaborators.
    pub fn new(
        config: VerifyConfig,
        store: S,
        identity: I,
        mailer: M,
    ) -> Result<Self, VerifyConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            store,
            identity,
            mailer,
        })
    }

    /// Issue a link without replacing an existing token.
    ///
    /// See [`link_issue_strict`].
    pub async fn issue_strict(
        &self,
        action: VerifyAction,
        user_id: &str,
    ) -> Result<String, VerifyError> {
        link_issue_strict(&self.config, &self.store, action, user_id).await
    }

    /// Issue a link, superseding any existing token for the key.
    ///
    /// See [`link_issue_or_replace`].
    pub async fn issue_or_replace(
        &self,
        action: VerifyAction,
        user_id: &str,
    ) -> Result<String, VerifyError> {
        link_issue_or_replace(&self.config, &self.store, action, user_id).await
    }

    /// Email a previously issued link to a user.
    ///
    /// See [`link_email_send`].
    pub async fn link_send(
        &self,
        email: &str,
        link: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), VerifyError> {
        link_email_send(
            &self.config,
            &self.identity,
            &self.mailer,
            email,
            link,
            subject,
            message,
        )
        .await
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Returns a reference to the verification store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
