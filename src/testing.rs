//! In-memory collaborator implementations.
//!
//! These back this crate's own tests and are public so downstream
//! users can exercise their issuance and notification flows without a
//! database or mail server. Write failures can be switched on to test
//! failure-isolation behavior.

use crate::{
    backend::{IdentityStore, InsertOutcome, VerificationRecord, VerificationStore},
    notify::{MailTransport, OutboundEmail, TransportError},
    skills::{ClassSkill, RatedSkill, SkillBackend},
    VerifyAction,
};
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use thiserror::Error;

/// Injected failure from an in-memory collaborator.
#[derive(Debug, Clone, Error)]
#[error("injected in-memory collaborator failure")]
pub struct MemoryError;

/// In-memory [`VerificationStore`] keyed by `(user_id, action)`.
///
/// Inserts are atomic under an internal lock and report duplicates as
/// [`InsertOutcome::Conflict`], matching the uniqueness-constraint
/// behavior real stores must provide.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<(String, VerifyAction), String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `insert`/`update` calls fail. Reads still succeed.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The stored token for a key, if any (for test assertions).
    pub fn token_for(&self, user_id: &str, action: VerifyAction) -> Option<String> {
        self.records
            .lock()
            .expect("store lock")
            .get(&(user_id.to_string(), action))
            .cloned()
    }

    /// Number of live records (for test assertions).
    pub fn record_count(&self) -> usize {
        self.records.lock().expect("store lock").len()
    }
}

impl VerificationStore for MemoryStore {
    type Error = MemoryError;

    async fn find(
        &self,
        user_id: &str,
        action: VerifyAction,
    ) -> Result<Option<VerificationRecord>, Self::Error> {
        let records = self.records.lock().expect("store lock");
        Ok(records
            .get(&(user_id.to_string(), action))
            .map(|token| VerificationRecord {
                user_id: user_id.to_string(),
                action,
                token: token.clone(),
            }))
    }

    async fn insert(
        &self,
        user_id: &str,
        action: VerifyAction,
        token: &str,
    ) -> Result<InsertOutcome, Self::Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MemoryError);
        }
        let mut records = self.records.lock().expect("store lock");
        let key = (user_id.to_string(), action);
        if records.contains_key(&key) {
            return Ok(InsertOutcome::Conflict);
        }
        records.insert(key, token.to_string());
        Ok(InsertOutcome::Inserted)
    }

    async fn update(
        &self,
        user_id: &str,
        action: VerifyAction,
        token: &str,
    ) -> Result<(), Self::Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MemoryError);
        }
        let mut records = self.records.lock().expect("store lock");
        records.insert((user_id.to_string(), action), token.to_string());
        Ok(())
    }
}

/// In-memory [`IdentityStore`] mapping emails to ids and ids to names.
#[derive(Clone, Default)]
pub struct MemoryIdentity {
    ids: Arc<Mutex<HashMap<String, String>>>,
    names: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryIdentity {
    /// Create an empty identity store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with both an address and a display name.
    pub fn user_add(&self, email: &str, user_id: &str, name: &str) {
        self.email_add(email, user_id);
        self.names
            .lock()
            .expect("identity lock")
            .insert(user_id.to_string(), name.to_string());
    }

    /// Register an address without a display name.
    pub fn email_add(&self, email: &str, user_id: &str) {
        self.ids
            .lock()
            .expect("identity lock")
            .insert(email.to_string(), user_id.to_string());
    }
}

impl IdentityStore for MemoryIdentity {
    type Error = MemoryError;

    async fn user_id_by_email(&self, email: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.ids.lock().expect("identity lock").get(email).cloned())
    }

    async fn display_name(&self, user_id: &str) -> Result<Option<String>, Self::Error> {
        Ok(self
            .names
            .lock()
            .expect("identity lock")
            .get(user_id)
            .cloned())
    }
}

/// In-memory [`MailTransport`] that records every dispatched message.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<OutboundEmail>>>,
    fail_sends: Arc<AtomicBool>,
}

impl MemoryMailer {
    /// Create an empty mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `send` calls fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Every message dispatched so far (for test assertions).
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.outbox.lock().expect("mailer lock").clone()
    }
}

impl MailTransport for MemoryMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Delivery(
                "injected delivery failure".to_string(),
            ));
        }
        self.outbox.lock().expect("mailer lock").push(email.clone());
        Ok(())
    }
}

/// In-memory [`SkillBackend`] for route tests.
#[derive(Clone, Default)]
pub struct MemorySkills {
    students: Arc<Mutex<HashMap<String, String>>>,
    class_skills: Arc<Mutex<Vec<ClassSkill>>>,
    ratings: Arc<Mutex<HashMap<(String, i64), f64>>>,
}

impl MemorySkills {
    /// Create an empty skill backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a student profile for a user.
    pub fn student_add(&self, user_id: &str, student_id: &str) {
        self.students
            .lock()
            .expect("skills lock")
            .insert(user_id.to_string(), student_id.to_string());
    }

    /// Register a class skill available for rating.
    pub fn class_skill_add(&self, class_skill_id: i64, name: &str) {
        self.class_skills.lock().expect("skills lock").push(ClassSkill {
            class_skill_id,
            name: name.to_string(),
        });
    }

    /// The stored rating for a key, if any (for test assertions).
    pub fn rating_for(&self, student_id: &str, class_skill_id: i64) -> Option<f64> {
        self.ratings
            .lock()
            .expect("skills lock")
            .get(&(student_id.to_string(), class_skill_id))
            .copied()
    }
}

impl SkillBackend for MemorySkills {
    type Error = MemoryError;

    async fn student_id_for_user(&self, user_id: &str) -> Result<Option<String>, Self::Error> {
        Ok(self
            .students
            .lock()
            .expect("skills lock")
            .get(user_id)
            .cloned())
    }

    async fn user_rated_skills(&self, user_id: &str) -> Result<Vec<RatedSkill>, Self::Error> {
        let Some(student_id) = self
            .students
            .lock()
            .expect("skills lock")
            .get(user_id)
            .cloned()
        else {
            return Ok(Vec::new());
        };

        let class_skills = self.class_skills.lock().expect("skills lock").clone();
        let ratings = self.ratings.lock().expect("skills lock");
        Ok(class_skills
            .iter()
            .filter_map(|skill| {
                ratings
                    .get(&(student_id.clone(), skill.class_skill_id))
                    .map(|&rating| RatedSkill {
                        class_skill_id: skill.class_skill_id,
                        name: skill.name.clone(),
                        rating,
                    })
            })
            .collect())
    }

    async fn class_skills(&self, _user_id: &str) -> Result<Vec<ClassSkill>, Self::Error> {
        Ok(self.class_skills.lock().expect("skills lock").clone())
    }

    async fn skill_rating_update(
        &self,
        student_id: &str,
        class_skill_id: i64,
        rating: f64,
    ) -> Result<(), Self::Error> {
        self.ratings
            .lock()
            .expect("skills lock")
            .insert((student_id.to_string(), class_skill_id), rating);
        Ok(())
    }

    async fn skill_rating_insert(
        &self,
        student_id: &str,
        class_skill_id: i64,
        rating: f64,
    ) -> Result<(), Self::Error> {
        self.ratings
            .lock()
            .expect("skills lock")
            .insert((student_id.to_string(), class_skill_id), rating);
        Ok(())
    }
}
