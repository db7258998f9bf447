//! Typed entity access over the flat key-value namespace.
//!
//! The repository is a thin layer: key construction, serialization, and the
//! write ordering that keeps the index usable. Every create stores the
//! entity record first and attaches relationship pointers second; every
//! delete removes the entity first and retracts pointers second. Readers
//! above this crate rely on that ordering: a pointer whose entity is gone
//! means "deletion in progress" and is treated as absence.
//!
//! Point reads return `Option` rather than failing; only `update_profile`
//! reports `NotFound`, because a merge needs a record to merge into.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

use banyan_index::{entity_key, entity_prefix, IndexMaintainer};
use banyan_kv::{KvError, KvStore};
use banyan_types::{
    DomainId, EntityKind, Message, MessageId, NewDomain, NewMessage, Paper, PaperId,
    ProfileUpdate, ResearchDomain, UserId, UserProfile,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository-layer errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] KvError),
}

/// Typed access to the four entity kinds.
#[derive(Clone)]
pub struct EntityRepository {
    kv: Arc<dyn KvStore>,
    index: IndexMaintainer,
}

impl EntityRepository {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        let index = IndexMaintainer::new(Arc::clone(&kv));
        Self { kv, index }
    }

    /// Access the underlying key-value store.
    pub fn kv(&self) -> Arc<dyn KvStore> {
        Arc::clone(&self.kv)
    }

    // ── users ──────────────────────────────────────────────────────

    /// Store a freshly built profile record. User ids come from the
    /// identity provider, so the record arrives fully formed.
    pub async fn insert_profile(&self, profile: &UserProfile) -> RepositoryResult<()> {
        let key = entity_key(EntityKind::User, profile.id.as_str());
        self.kv.set(&key, encode(profile)?).await?;
        Ok(())
    }

    pub async fn get_profile(&self, id: &UserId) -> RepositoryResult<Option<UserProfile>> {
        self.get_entity(EntityKind::User, id.as_str()).await
    }

    /// Read-merge-write profile update. Fields absent from `update` keep
    /// their current values.
    pub async fn update_profile(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> RepositoryResult<UserProfile> {
        let mut profile =
            self.get_profile(id)
                .await?
                .ok_or_else(|| RepositoryError::NotFound {
                    kind: EntityKind::User,
                    id: id.as_str().to_string(),
                })?;

        update.apply(&mut profile);
        self.insert_profile(&profile).await?;
        debug!(id = %id, "updated profile");
        Ok(profile)
    }

    /// All profile records, in key order.
    ///
    /// Inbox and sent-list pointers share the `user:` prefix, so the scan
    /// skips values that do not decode as profiles.
    pub async fn list_profiles(&self) -> RepositoryResult<Vec<UserProfile>> {
        let values = self.kv.scan_prefix(&entity_prefix(EntityKind::User)).await?;
        Ok(values
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect())
    }

    // ── domains ────────────────────────────────────────────────────

    /// Build and store a new domain owned by `teacher_id`, then attach its
    /// teacher pointer.
    pub async fn create_domain(
        &self,
        teacher_id: &UserId,
        draft: NewDomain,
    ) -> RepositoryResult<ResearchDomain> {
        let domain = ResearchDomain {
            id: DomainId::generate(),
            name: draft.name,
            description: draft.description.unwrap_or_default(),
            teacher_id: teacher_id.clone(),
            created_at: Utc::now(),
        };

        let key = entity_key(EntityKind::Domain, domain.id.as_str());
        self.kv.set(&key, encode(&domain)?).await?;
        self.index.attach(&domain).await?;
        debug!(id = %domain.id, teacher = %teacher_id, "created domain");
        Ok(domain)
    }

    pub async fn get_domain(&self, id: &DomainId) -> RepositoryResult<Option<ResearchDomain>> {
        self.get_entity(EntityKind::Domain, id.as_str()).await
    }

    // ── papers ─────────────────────────────────────────────────────

    /// Store a paper record and attach its pointers. The caller builds the
    /// record because the blob path embeds the paper id and the upload
    /// happens before this write.
    pub async fn insert_paper(&self, paper: &Paper) -> RepositoryResult<()> {
        let key = entity_key(EntityKind::Paper, paper.id.as_str());
        self.kv.set(&key, encode(paper)?).await?;
        self.index.attach(paper).await?;
        debug!(id = %paper.id, teacher = %paper.teacher_id, "stored paper");
        Ok(())
    }

    pub async fn get_paper(&self, id: &PaperId) -> RepositoryResult<Option<Paper>> {
        self.get_entity(EntityKind::Paper, id.as_str()).await
    }

    /// Remove a paper record, then retract its pointers.
    pub async fn delete_paper(&self, paper: &Paper) -> RepositoryResult<()> {
        let key = entity_key(EntityKind::Paper, paper.id.as_str());
        self.kv.delete(&key).await?;
        self.index.detach(paper).await?;
        debug!(id = %paper.id, "deleted paper");
        Ok(())
    }

    // ── messages ───────────────────────────────────────────────────

    /// Build and store a message from `sender_id`, then fan out its inbox
    /// and sent-list pointers.
    pub async fn create_message(
        &self,
        sender_id: &UserId,
        draft: NewMessage,
    ) -> RepositoryResult<Message> {
        let message = Message {
            id: MessageId::generate(),
            sender_id: sender_id.clone(),
            receiver_id: draft.receiver_id,
            subject: draft.subject,
            content: draft.content,
            read: false,
            created_at: Utc::now(),
        };

        let key = entity_key(EntityKind::Message, message.id.as_str());
        self.kv.set(&key, encode(&message)?).await?;
        self.index.attach(&message).await?;
        debug!(id = %message.id, receiver = %message.receiver_id, "created message");
        Ok(message)
    }

    pub async fn get_message(&self, id: &MessageId) -> RepositoryResult<Option<Message>> {
        self.get_entity(EntityKind::Message, id.as_str()).await
    }

    /// Write back a mutated message record. Pointer sets depend only on
    /// immutable fields, so no index work is needed here.
    pub async fn upsert_message(&self, message: &Message) -> RepositoryResult<()> {
        let key = entity_key(EntityKind::Message, message.id.as_str());
        self.kv.set(&key, encode(message)?).await?;
        Ok(())
    }

    async fn get_entity<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> RepositoryResult<Option<T>> {
        let value = self.kv.get(&entity_key(kind, id)).await?;
        value.map(decode).transpose()
    }
}

fn encode<T: Serialize>(record: &T) -> RepositoryResult<Value> {
    serde_json::to_value(record).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: Value) -> RepositoryResult<T> {
    serde_json::from_value(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}
