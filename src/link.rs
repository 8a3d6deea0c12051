//! Verification link construction and issuance.
//!
//! Issuance comes in two policies. Strict issuance refuses to clobber
//! an existing token, which suits sensitive first-time flows; replace
//! issuance always leaves the just-generated token live, which suits
//! "resend me the link" flows.

use crate::{
    backend::{InsertOutcome, VerificationStore},
    config::VerifyConfig,
    error::VerifyError,
    token::token_generate,
    VerifyAction,
};

/// Build a verification link for a token.
///
/// The format is fixed for compatibility with confirmation handlers:
/// `http://<host>/<action>?id=<user_id>&t=<token>`, with query values
/// URL-encoded.
pub fn link_build(
    config: &VerifyConfig,
    action: VerifyAction,
    user_id: &str,
    token: &str,
) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id", user_id)
        .append_pair("t", token)
        .finish();
    format!("http://{}/{}?{}", config.host, action.as_str(), query)
}

/// Issue a verification link without replacing an existing token.
///
/// Fails with [`VerifyError::TokenConflict`] when a live record already
/// exists for the key; nothing is mutated on that path. Use
/// [`link_issue_or_replace`] if the stored token should be superseded
/// instead.
pub async fn link_issue_strict<S: VerificationStore>(
    config: &VerifyConfig,
    store: &S,
    action: VerifyAction,
    user_id: &str,
) -> Result<String, VerifyError> {
    let existing = store
        .find(user_id, action)
        .await
        .map_err(VerifyError::store)?;
    if existing.is_some() {
        return Err(VerifyError::TokenConflict);
    }

    let token = token_generate();
    match store
        .insert(user_id, action, &token)
        .await
        .map_err(VerifyError::store)?
    {
        InsertOutcome::Inserted => Ok(link_build(config, action, user_id, &token)),
        // A concurrent issuer won the insert between our read and
        // write; the store's per-key constraint guarantees exactly one
        // winner.
        InsertOutcome::Conflict => Err(VerifyError::TokenConflict),
    }
}

/// Issue a verification link, replacing any existing token for the key.
///
/// The returned link always names the token generated by this call;
/// callers never receive a link for a stale token. On a store failure
/// the generated token is discarded and stored state is unchanged.
pub async fn link_issue_or_replace<S: VerificationStore>(
    config: &VerifyConfig,
    store: &S,
    action: VerifyAction,
    user_id: &str,
) -> Result<String, VerifyError> {
    let existing = store
        .find(user_id, action)
        .await
        .map_err(VerifyError::store)?;

    // Token and link are computed before any write so the link handed
    // back is the one that ends up stored.
    let token = token_generate();
    let link = link_build(config, action, user_id, &token);

    if existing.is_some() {
        store
            .update(user_id, action, &token)
            .await
            .map_err(VerifyError::store)?;
    } else {
        match store
            .insert(user_id, action, &token)
            .await
            .map_err(VerifyError::store)?
        {
            InsertOutcome::Inserted => {}
            // A concurrent issuer created the record after our read;
            // replace its token so this link stays the live one.
            InsertOutcome::Conflict => {
                store
                    .update(user_id, action, &token)
                    .await
                    .map_err(VerifyError::store)?;
            }
        }
    }

    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::VerificationRecord;
    use crate::testing::{MemoryError, MemoryStore};

    /// Store whose reads never see the record a concurrent issuer has
    /// already inserted, forcing the find-None-then-insert-Conflict
    /// interleaving.
    #[derive(Clone)]
    struct StaleReadStore {
        inner: MemoryStore,
    }

    impl VerificationStore for StaleReadStore {
        type Error = MemoryError;

        async fn find(
            &self,
            _user_id: &str,
            _action: VerifyAction,
        ) -> Result<Option<VerificationRecord>, Self::Error> {
            Ok(None)
        }

        async fn insert(
            &self,
            user_id: &str,
            action: VerifyAction,
            token: &str,
        ) -> Result<InsertOutcome, Self::Error> {
            self.inner.insert(user_id, action, token).await
        }

        async fn update(
            &self,
            user_id: &str,
            action: VerifyAction,
            token: &str,
        ) -> Result<(), Self::Error> {
            self.inner.update(user_id, action, token).await
        }
    }

    fn test_config() -> VerifyConfig {
        VerifyConfig {
            host: "example.com".to_string(),
            ..Default::default()
        }
    }

    fn token_from_link(link: &str) -> &str {
        link.split("t=").nth(1).expect("link carries a token")
    }

    #[test]
    fn link_format_is_exact() {
        let link = link_build(&test_config(), VerifyAction::EmailVerify, "42", "abc123");
        assert_eq!(link, "http://example.com/verify?id=42&t=abc123");
    }

    #[test]
    fn link_encodes_query_values() {
        let link = link_build(
            &test_config(),
            VerifyAction::PasswordReset,
            "user&7",
            "abc123",
        );
        assert_eq!(
            link,
            "http://example.com/reset-password?id=user%267&t=abc123"
        );
    }

    #[tokio::test]
    async fn strict_issue_creates_record_for_new_key() {
        let store = MemoryStore::new();
        let link = link_issue_strict(&test_config(), &store, VerifyAction::EmailVerify, "42")
            .await
            .expect("first issuance succeeds");

        let stored = store
            .token_for("42", VerifyAction::EmailVerify)
            .expect("record created");
        assert_eq!(token_from_link(&link), stored);
    }

    #[tokio::test]
    async fn strict_issue_twice_conflicts_without_mutation() {
        let store = MemoryStore::new();
        let config = test_config();

        let first = link_issue_strict(&config, &store, VerifyAction::EmailVerify, "42")
            .await
            .expect("first issuance succeeds");
        let second = link_issue_strict(&config, &store, VerifyAction::EmailVerify, "42").await;

        assert!(matches!(second, Err(VerifyError::TokenConflict)));
        assert_eq!(
            store.token_for("42", VerifyAction::EmailVerify).as_deref(),
            Some(token_from_link(&first)),
            "conflicting issuance must not change the stored token",
        );
    }

    #[tokio::test]
    async fn replace_issue_supersedes_previous_token() {
        let store = MemoryStore::new();
        let config = test_config();

        let first = link_issue_or_replace(&config, &store, VerifyAction::EmailVerify, "42")
            .await
            .expect("first issuance succeeds");
        let second = link_issue_or_replace(&config, &store, VerifyAction::EmailVerify, "42")
            .await
            .expect("second issuance succeeds");

        assert_ne!(first, second);
        assert_ne!(token_from_link(&first), token_from_link(&second));
        assert_eq!(
            store.token_for("42", VerifyAction::EmailVerify).as_deref(),
            Some(token_from_link(&second)),
            "the stored token must be the most recently issued one",
        );
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn replace_issue_inserts_for_new_key() {
        let store = MemoryStore::new();
        let link = link_issue_or_replace(&test_config(), &store, VerifyAction::PasswordReset, "9")
            .await
            .expect("issuance succeeds");

        assert_eq!(
            store.token_for("9", VerifyAction::PasswordReset).as_deref(),
            Some(token_from_link(&link)),
        );
    }

    #[tokio::test]
    async fn keys_with_different_actions_are_independent() {
        let store = MemoryStore::new();
        let config = test_config();

        link_issue_strict(&config, &store, VerifyAction::EmailVerify, "42")
            .await
            .expect("verify issuance succeeds");
        link_issue_strict(&config, &store, VerifyAction::PasswordReset, "42")
            .await
            .expect("reset issuance for same user succeeds");

        assert_eq!(store.record_count(), 2);
    }

    #[tokio::test]
    async fn at_most_one_record_per_key_after_mixed_issuance() {
        let store = MemoryStore::new();
        let config = test_config();

        let _ = link_issue_strict(&config, &store, VerifyAction::EmailVerify, "42").await;
        let _ = link_issue_strict(&config, &store, VerifyAction::EmailVerify, "42").await;
        let _ = link_issue_or_replace(&config, &store, VerifyAction::EmailVerify, "42").await;
        let _ = link_issue_or_replace(&config, &store, VerifyAction::EmailVerify, "42").await;

        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn strict_lost_insert_race_yields_conflict() {
        let store = StaleReadStore {
            inner: MemoryStore::new(),
        };
        store
            .inner
            .insert("42", VerifyAction::EmailVerify, "winner")
            .await
            .expect("seed concurrent winner");

        let result =
            link_issue_strict(&test_config(), &store, VerifyAction::EmailVerify, "42").await;

        assert!(matches!(result, Err(VerifyError::TokenConflict)));
        assert_eq!(
            store
                .inner
                .token_for("42", VerifyAction::EmailVerify)
                .as_deref(),
            Some("winner"),
            "losing the insert race must leave the winner's record untouched",
        );
    }

    #[tokio::test]
    async fn replace_lost_insert_race_still_stores_the_returned_token() {
        let store = StaleReadStore {
            inner: MemoryStore::new(),
        };
        store
            .inner
            .insert("42", VerifyAction::EmailVerify, "winner")
            .await
            .expect("seed concurrent winner");

        let link = link_issue_or_replace(&test_config(), &store, VerifyAction::EmailVerify, "42")
            .await
            .expect("replace issuance succeeds despite the lost race");

        let stored = store
            .inner
            .token_for("42", VerifyAction::EmailVerify)
            .expect("record exists");
        assert_eq!(
            token_from_link(&link),
            stored,
            "the returned link must name the token that ended up stored",
        );
        assert_ne!(stored, "winner");
        assert_eq!(store.inner.record_count(), 1);
    }

    #[tokio::test]
    async fn replace_write_failure_leaves_record_unchanged() {
        let store = MemoryStore::new();
        let config = test_config();

        let first = link_issue_or_replace(&config, &store, VerifyAction::EmailVerify, "42")
            .await
            .expect("seeding issuance succeeds");

        store.fail_writes(true);
        let result = link_issue_or_replace(&config, &store, VerifyAction::EmailVerify, "42").await;

        assert!(matches!(result, Err(VerifyError::Store(_))));
        assert_eq!(
            store.token_for("42", VerifyAction::EmailVerify).as_deref(),
            Some(token_from_link(&first)),
            "a failed write must not disturb the pre-existing record",
        );
    }

    #[tokio::test]
    async fn insert_failure_leaves_key_absent() {
        let store = MemoryStore::new();
        store.fail_writes(true);

        let result =
            link_issue_strict(&test_config(), &store, VerifyAction::EmailVerify, "42").await;

        assert!(matches!(result, Err(VerifyError::Store(_))));
        assert_eq!(store.record_count(), 0);
    }

    #[tokio::test]
    async fn strict_then_conflict_then_replace_scenario() {
        let store = MemoryStore::new();
        let config = test_config();

        let first = link_issue_strict(&config, &store, VerifyAction::EmailVerify, "7")
            .await
            .expect("brand-new key issues");
        let first_token = token_from_link(&first).to_string();
        assert_eq!(
            store.token_for("7", VerifyAction::EmailVerify),
            Some(first_token.clone())
        );

        let conflict = link_issue_strict(&config, &store, VerifyAction::EmailVerify, "7").await;
        assert!(matches!(conflict, Err(VerifyError::TokenConflict)));
        assert_eq!(
            store.token_for("7", VerifyAction::EmailVerify),
            Some(first_token.clone())
        );

        let replaced = link_issue_or_replace(&config, &store, VerifyAction::EmailVerify, "7")
            .await
            .expect("replace issuance succeeds");
        let replaced_token = token_from_link(&replaced);
        assert_ne!(replaced_token, first_token);
        assert_eq!(
            store.token_for("7", VerifyAction::EmailVerify).as_deref(),
            Some(replaced_token),
            "the superseded token must no longer match the record",
        );
    }
}
