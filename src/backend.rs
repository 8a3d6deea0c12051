//! Storage trait abstractions for the verification core.
//!
//! This module defines the contracts the issuance and notification
//! logic consumes, decoupling it from any particular database.

use crate::action::VerifyAction;
use std::future::Future;

/// A live verification record.
///
/// At most one record exists per `(user_id, action)` key at any time;
/// the store enforces this, not the caller (see
/// [`VerificationStore::insert`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    /// Opaque identifier of the subject user. Immutable once created.
    pub user_id: String,
    /// Action the record verifies. Immutable.
    pub action: VerifyAction,
    /// Current token. Replaced in place by replace-mode issuance.
    pub token: String,
}

/// Outcome of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was created.
    Inserted,
    /// A record already exists for this key; nothing was written.
    Conflict,
}

/// Durable mapping of `(user_id, action)` to the active token.
///
/// Implement this over your database. The issuance logic performs a
/// read before every write, but under concurrent requests for the same
/// key that ordering proves nothing: uniqueness of live records rests
/// entirely on `insert` being atomic per key (e.g. a composite
/// uniqueness constraint), so that concurrent inserts yield exactly
/// one [`InsertOutcome::Inserted`] and the rest
/// [`InsertOutcome::Conflict`].
///
/// # Example
///
/// ```rust,ignore
/// use verilink::{VerificationStore, VerificationRecord, InsertOutcome, VerifyAction};
///
/// #[derive(Clone)]
/// struct PgStore { /* your pool */ }
///
/// impl VerificationStore for PgStore {
///     type Error = sqlx::Error;
///
///     async fn find(&self, user_id: &str, action: VerifyAction)
///         -> Result<Option<VerificationRecord>, Self::Error> {
///         // SELECT ... WHERE user_id = $1 AND type = $2
///         Ok(None)
///     }
///     // ... insert (ON CONFLICT DO NOTHING, row count -> outcome), update
/// }
/// ```
pub trait VerificationStore: Clone + Send + Sync + 'static {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Look up the live record for a key, if any.
    fn find(
        &self,
        user_id: &str,
        action: VerifyAction,
    ) -> impl Future<Output = Result<Option<VerificationRecord>, Self::Error>> + Send;

    /// Atomically create a record for a key that must not already exist.
    ///
    /// A duplicate key is reported as [`InsertOutcome::Conflict`] and
    /// must leave the existing record untouched. `Err` is reserved for
    /// genuine storage failures.
    fn insert(
        &self,
        user_id: &str,
        action: VerifyAction,
        token: &str,
    ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send;

    /// Replace the token of an existing record in place.
    fn update(
        &self,
        user_id: &str,
        action: VerifyAction,
        token: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Identity lookups the notifier needs to address a recipient.
///
/// Both lookups return `None` when the subject is unknown; the
/// notifier maps that to an identity-resolution error rather than
/// sending mail to an unresolvable recipient.
pub trait IdentityStore: Clone + Send + Sync + 'static {
    /// Error type for lookup operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolve an email address to a user id.
    fn user_id_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

    /// Resolve a user id to a display name.
    fn display_name(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;
}
