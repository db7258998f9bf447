//! Messaging between campus users.
//!
//! A message is stored exactly once; delivery is two pointers, one into the
//! receiver's inbox and one into the sender's sent-list. Listings resolve
//! those pointers back through the entity record, so there is never a
//! second copy of the body to keep in sync.
//!
//! The receiver must exist at send time. The sender is deliberately not
//! re-checked: inbox rows for a sender whose profile has vanished fall back
//! to placeholder display fields instead of disappearing.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

use banyan_query::{InboxEntry, QueryError, QueryResolver};
use banyan_repository::{EntityRepository, RepositoryError};
use banyan_types::{EntityKind, Message, MessageId, NewMessage, UserId};
use thiserror::Error;
use tracing::info;

/// Result type for messaging operations.
pub type MessagingResult<T> = Result<T, MessagingError>;

/// Messaging-surface errors.
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("receiver {0} not found")]
    ReceiverNotFound(UserId),

    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dependency failure: {0}")]
    Dependency(String),
}

impl From<RepositoryError> for MessagingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound {
                kind: EntityKind::Message,
                id,
            } => MessagingError::MessageNotFound(MessageId::new(id)),
            other => MessagingError::Dependency(other.to_string()),
        }
    }
}

impl From<QueryError> for MessagingError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Repository(inner) => inner.into(),
            QueryError::Store(inner) => MessagingError::Dependency(inner.to_string()),
        }
    }
}

/// Send, list, and acknowledge messages.
pub struct MessagingService {
    repo: EntityRepository,
    query: QueryResolver,
}

impl MessagingService {
    pub fn new(repo: EntityRepository, query: QueryResolver) -> Self {
        Self { repo, query }
    }

    /// Store one message and fan out its inbox and sent-list pointers.
    pub async fn send(&self, sender: &UserId, draft: NewMessage) -> MessagingResult<Message> {
        if draft.receiver_id.as_str().is_empty()
            || draft.subject.trim().is_empty()
            || draft.content.trim().is_empty()
        {
            return Err(MessagingError::InvalidInput(
                "missing required fields: receiver, subject, content".to_string(),
            ));
        }
        if self.repo.get_profile(&draft.receiver_id).await?.is_none() {
            return Err(MessagingError::ReceiverNotFound(draft.receiver_id));
        }

        let message = self.repo.create_message(sender, draft).await?;
        info!(id = %message.id, sender = %sender, receiver = %message.receiver_id, "sent message");
        Ok(message)
    }

    /// The user's inbox joined with sender display fields, newest first.
    pub async fn inbox(&self, user_id: &UserId) -> MessagingResult<Vec<InboxEntry>> {
        Ok(self.query.inbox(user_id).await?)
    }

    /// Messages the user has sent, newest first.
    pub async fn sent(&self, user_id: &UserId) -> MessagingResult<Vec<Message>> {
        Ok(self.query.sent(user_id).await?)
    }

    /// Flip a message's read flag. Receiver only; repeat calls are
    /// harmless.
    pub async fn mark_read(
        &self,
        caller: &UserId,
        message_id: &MessageId,
    ) -> MessagingResult<Message> {
        let mut message = self
            .repo
            .get_message(message_id)
            .await?
            .ok_or_else(|| MessagingError::MessageNotFound(message_id.clone()))?;

        if message.receiver_id != *caller {
            return Err(MessagingError::Unauthorized(
                "only the receiver can mark a message read".to_string(),
            ));
        }

        message.read = true;
        self.repo.upsert_message(&message).await?;
        info!(id = %message_id, "marked message read");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banyan_kv::InMemoryKvStore;
    use banyan_types::{Role, UserProfile};
    use chrono::Utc;
    use std::sync::Arc;

    struct Fixture {
        repo: EntityRepository,
        service: MessagingService,
    }

    fn setup() -> Fixture {
        let kv = Arc::new(InMemoryKvStore::new());
        let repo = EntityRepository::new(kv);
        let query = QueryResolver::new(repo.clone());
        let service = MessagingService::new(repo.clone(), query);
        Fixture { repo, service }
    }

    async fn seed_user(repo: &EntityRepository, id: &str, name: &str) {
        repo.insert_profile(&UserProfile {
            id: UserId::new(id),
            email: format!("{id}@example.edu"),
            name: name.to_string(),
            role: Role::Student,
            bio: String::new(),
            institution: String::new(),
            research_interests: vec![],
            created_at: Utc::now(),
        })
        .await
        .expect("seed user");
    }

    fn draft(receiver: &str, subject: &str) -> NewMessage {
        NewMessage {
            receiver_id: UserId::new(receiver),
            subject: subject.to_string(),
            content: "body".to_string(),
        }
    }

    #[tokio::test]
    async fn send_requires_subject_and_content() {
        let fx = setup();
        seed_user(&fx.repo, "u-2", "Receiver").await;

        let result = fx
            .service
            .send(
                &UserId::new("u-1"),
                NewMessage {
                    receiver_id: UserId::new("u-2"),
                    subject: "  ".to_string(),
                    content: "body".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(MessagingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn send_rejects_unknown_receivers() {
        let fx = setup();
        let result = fx
            .service
            .send(&UserId::new("u-1"), draft("ghost", "hello"))
            .await;
        assert!(matches!(result, Err(MessagingError::ReceiverNotFound(_))));
    }

    #[tokio::test]
    async fn send_then_inbox_returns_one_unread_entry() {
        let fx = setup();
        seed_user(&fx.repo, "u-1", "Grace").await;
        seed_user(&fx.repo, "u-2", "Alan").await;

        fx.service
            .send(&UserId::new("u-1"), draft("u-2", "collaboration"))
            .await
            .unwrap();

        let inbox = fx.service.inbox(&UserId::new("u-2")).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].message.subject, "collaboration");
        assert_eq!(inbox[0].sender_name, "Grace");
        assert_eq!(inbox[0].sender_email, "u-1@example.edu");
        assert!(!inbox[0].message.read);
    }

    #[tokio::test]
    async fn mark_read_is_receiver_only_and_idempotent() {
        let fx = setup();
        seed_user(&fx.repo, "u-1", "Grace").await;
        seed_user(&fx.repo, "u-2", "Alan").await;
        let message = fx
            .service
            .send(&UserId::new("u-1"), draft("u-2", "hello"))
            .await
            .unwrap();

        let denied = fx
            .service
            .mark_read(&UserId::new("u-1"), &message.id)
            .await;
        assert!(matches!(denied, Err(MessagingError::Unauthorized(_))));

        let first = fx
            .service
            .mark_read(&UserId::new("u-2"), &message.id)
            .await
            .unwrap();
        assert!(first.read);
        let second = fx
            .service
            .mark_read(&UserId::new("u-2"), &message.id)
            .await
            .unwrap();
        assert!(second.read);

        let still_denied = fx
            .service
            .mark_read(&UserId::new("u-1"), &message.id)
            .await;
        assert!(matches!(still_denied, Err(MessagingError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn mark_read_on_missing_message_is_not_found() {
        let fx = setup();
        let result = fx
            .service
            .mark_read(&UserId::new("u-1"), &MessageId::new("ghost"))
            .await;
        assert!(matches!(result, Err(MessagingError::MessageNotFound(_))));
    }

    #[tokio::test]
    async fn sent_listing_tracks_the_sender() {
        let fx = setup();
        seed_user(&fx.repo, "u-2", "Alan").await;
        fx.service
            .send(&UserId::new("u-1"), draft("u-2", "first"))
            .await
            .unwrap();
        fx.service
            .send(&UserId::new("u-1"), draft("u-2", "second"))
            .await
            .unwrap();

        let sent = fx.service.sent(&UserId::new("u-1")).await.unwrap();
        assert_eq!(sent.len(), 2);
        let inbox = fx.service.inbox(&UserId::new("u-2")).await.unwrap();
        assert_eq!(inbox.len(), 2);
    }
}
