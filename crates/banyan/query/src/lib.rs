//! Read-side resolution over the relationship index.
//!
//! "List the children of parent X" runs in two steps: scan the pointer
//! prefix to enumerate candidate ids, then resolve each id through the
//! repository. Resolution fans out concurrently, and pointers whose entity
//! is missing are dropped rather than surfaced; a delete in progress looks
//! like absence, never like corruption.
//!
//! Listings come back newest-first, ties broken by descending id so paging
//! stays deterministic when two records share a timestamp.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

use banyan_index::Relation;
use banyan_kv::{KvError, KvStore};
use banyan_repository::{EntityRepository, RepositoryError, RepositoryResult};
use banyan_types::{DomainId, Message, MessageId, Paper, PaperId, ResearchDomain, UserId};
use futures::future;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Result type for resolver operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Resolver-layer errors.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Store(#[from] KvError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One inbox listing row: the message joined with its sender's current
/// display fields. Serializes flat, with the sender fields alongside the
/// message fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: String,
    pub sender_email: String,
}

/// Placeholder name shown when a sender's profile cannot be resolved.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Resolves pointer prefixes into materialized, ordered listings.
#[derive(Clone)]
pub struct QueryResolver {
    kv: Arc<dyn KvStore>,
    repo: EntityRepository,
}

impl QueryResolver {
    pub fn new(repo: EntityRepository) -> Self {
        Self { kv: repo.kv(), repo }
    }

    /// Domains owned by a teacher, newest first.
    pub async fn domains_of(&self, teacher_id: &UserId) -> QueryResult<Vec<ResearchDomain>> {
        let ids = self
            .pointer_targets(&Relation::TeacherDomains.prefix(teacher_id.as_str()))
            .await?;
        let repo = self.repo.clone();
        let mut domains = resolve_each(ids, move |id| {
            let repo = repo.clone();
            async move { repo.get_domain(&DomainId::new(id)).await }
        })
        .await?;
        domains.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(domains)
    }

    /// Papers owned by a teacher, newest first.
    pub async fn papers_of(&self, teacher_id: &UserId) -> QueryResult<Vec<Paper>> {
        self.list_papers(&Relation::TeacherPapers.prefix(teacher_id.as_str()))
            .await
    }

    /// Papers filed under a domain, newest first.
    pub async fn papers_in(&self, domain_id: &DomainId) -> QueryResult<Vec<Paper>> {
        self.list_papers(&Relation::DomainPapers.prefix(domain_id.as_str()))
            .await
    }

    /// A user's inbox joined with sender display fields, newest first.
    ///
    /// A vanished sender does not drop the message; the entry carries
    /// placeholder fields instead.
    pub async fn inbox(&self, user_id: &UserId) -> QueryResult<Vec<InboxEntry>> {
        let messages = self
            .list_messages(&Relation::UserInbox.prefix(user_id.as_str()))
            .await?;

        let senders = future::join_all(messages.iter().map(|message| {
            let repo = self.repo.clone();
            let sender_id = message.sender_id.clone();
            async move { repo.get_profile(&sender_id).await }
        }))
        .await;

        let mut entries = Vec::with_capacity(messages.len());
        for (message, sender) in messages.into_iter().zip(senders) {
            let entry = match sender? {
                Some(profile) => InboxEntry {
                    message,
                    sender_name: profile.name,
                    sender_email: profile.email,
                },
                None => {
                    warn!(
                        message = %message.id,
                        sender = %message.sender_id,
                        "sender profile missing, using placeholder"
                    );
                    InboxEntry {
                        message,
                        sender_name: UNKNOWN_SENDER.to_string(),
                        sender_email: String::new(),
                    }
                }
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Messages a user has sent, newest first.
    pub async fn sent(&self, user_id: &UserId) -> QueryResult<Vec<Message>> {
        self.list_messages(&Relation::UserSent.prefix(user_id.as_str()))
            .await
    }

    async fn list_papers(&self, prefix: &str) -> QueryResult<Vec<Paper>> {
        let ids = self.pointer_targets(prefix).await?;
        let repo = self.repo.clone();
        let mut papers = resolve_each(ids, move |id| {
            let repo = repo.clone();
            async move { repo.get_paper(&PaperId::new(id)).await }
        })
        .await?;
        papers.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(papers)
    }

    async fn list_messages(&self, prefix: &str) -> QueryResult<Vec<Message>> {
        let ids = self.pointer_targets(prefix).await?;
        let repo = self.repo.clone();
        let mut messages = resolve_each(ids, move |id| {
            let repo = repo.clone();
            async move { repo.get_message(&MessageId::new(id)).await }
        })
        .await?;
        messages.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(messages)
    }

    /// Child ids stored under a pointer prefix. Pointer values are plain id
    /// strings; anything else under the prefix is skipped.
    async fn pointer_targets(&self, prefix: &str) -> QueryResult<Vec<String>> {
        let values = self.kv.scan_prefix(prefix).await?;
        Ok(values
            .into_iter()
            .filter_map(|value| match value {
                Value::String(id) => Some(id),
                _ => None,
            })
            .collect())
    }
}

/// Resolve every id concurrently, dropping those whose entity is gone.
async fn resolve_each<T, F, Fut>(ids: Vec<String>, fetch: F) -> Result<Vec<T>, RepositoryError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = RepositoryResult<Option<T>>>,
{
    let resolved = future::join_all(ids.into_iter().map(fetch)).await;
    let mut records = Vec::with_capacity(resolved.len());
    for item in resolved {
        if let Some(record) = item? {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use banyan_kv::InMemoryKvStore;
    use banyan_types::{NewMessage, Role, UserProfile};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn setup() -> (Arc<InMemoryKvStore>, EntityRepository, QueryResolver) {
        let kv = Arc::new(InMemoryKvStore::new());
        let repo = EntityRepository::new(kv.clone());
        let resolver = QueryResolver::new(repo.clone());
        (kv, repo, resolver)
    }

    fn profile(id: &str, name: &str, role: Role) -> UserProfile {
        UserProfile {
            id: UserId::new(id),
            email: format!("{id}@example.edu"),
            name: name.to_string(),
            role,
            bio: String::new(),
            institution: String::new(),
            research_interests: vec![],
            created_at: Utc::now(),
        }
    }

    async fn seed_paper(kv: &InMemoryKvStore, paper: &Paper) {
        kv.set(
            &format!("paper:{}", paper.id),
            serde_json::to_value(paper).unwrap(),
        )
        .await
        .unwrap();
        kv.set(
            &format!("teacher:{}:paper:{}", paper.teacher_id, paper.id),
            json!(paper.id.as_str()),
        )
        .await
        .unwrap();
        if let Some(domain_id) = &paper.domain_id {
            kv.set(
                &format!("domain:{}:paper:{}", domain_id, paper.id),
                json!(paper.id.as_str()),
            )
            .await
            .unwrap();
        }
    }

    fn paper_at(id: &str, teacher: &str, domain: Option<&str>, minutes: i64) -> Paper {
        Paper {
            id: PaperId::new(id),
            title: format!("paper {id}"),
            description: String::new(),
            domain_id: domain.map(DomainId::new),
            teacher_id: UserId::new(teacher),
            file_name: format!("{id}.pdf"),
            file_path: format!("{teacher}/{id}.pdf"),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn papers_of_lists_newest_first() {
        let (kv, _repo, resolver) = setup();
        seed_paper(&kv, &paper_at("p-old", "t-1", None, 0)).await;
        seed_paper(&kv, &paper_at("p-new", "t-1", None, 5)).await;

        let papers = resolver.papers_of(&UserId::new("t-1")).await.unwrap();
        let ids: Vec<_> = papers.iter().map(|p| p.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["p-new", "p-old"]);
    }

    #[tokio::test]
    async fn timestamp_ties_break_by_descending_id() {
        let (kv, _repo, resolver) = setup();
        seed_paper(&kv, &paper_at("p-a", "t-1", None, 0)).await;
        seed_paper(&kv, &paper_at("p-b", "t-1", None, 0)).await;

        let papers = resolver.papers_of(&UserId::new("t-1")).await.unwrap();
        let ids: Vec<_> = papers.iter().map(|p| p.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["p-b", "p-a"]);
    }

    #[tokio::test]
    async fn dangling_pointers_are_dropped_from_listings() {
        let (kv, _repo, resolver) = setup();
        seed_paper(&kv, &paper_at("p-1", "t-1", Some("d-1"), 0)).await;
        kv.set("teacher:t-1:paper:p-gone", json!("p-gone"))
            .await
            .unwrap();

        let papers = resolver.papers_of(&UserId::new("t-1")).await.unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].id.as_str(), "p-1");
    }

    #[tokio::test]
    async fn papers_in_scopes_to_one_domain() {
        let (kv, _repo, resolver) = setup();
        seed_paper(&kv, &paper_at("p-1", "t-1", Some("d-1"), 0)).await;
        seed_paper(&kv, &paper_at("p-2", "t-1", Some("d-2"), 1)).await;
        seed_paper(&kv, &paper_at("p-3", "t-1", None, 2)).await;

        let papers = resolver.papers_in(&DomainId::new("d-1")).await.unwrap();
        let ids: Vec<_> = papers.iter().map(|p| p.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["p-1"]);
    }

    #[tokio::test]
    async fn inbox_joins_sender_fields() {
        let (_kv, repo, resolver) = setup();
        repo.insert_profile(&profile("u-1", "Grace", Role::Teacher))
            .await
            .unwrap();
        repo.create_message(
            &UserId::new("u-1"),
            NewMessage {
                receiver_id: UserId::new("u-2"),
                subject: "collab".to_string(),
                content: "interested?".to_string(),
            },
        )
        .await
        .unwrap();

        let entries = resolver.inbox(&UserId::new("u-2")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sender_name, "Grace");
        assert_eq!(entries[0].sender_email, "u-1@example.edu");
        assert!(!entries[0].message.read);
    }

    #[tokio::test]
    async fn inbox_falls_back_when_sender_is_gone() {
        let (_kv, repo, resolver) = setup();
        repo.create_message(
            &UserId::new("ghost"),
            NewMessage {
                receiver_id: UserId::new("u-2"),
                subject: "hello".to_string(),
                content: "from nowhere".to_string(),
            },
        )
        .await
        .unwrap();

        let entries = resolver.inbox(&UserId::new("u-2")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sender_name, UNKNOWN_SENDER);
        assert_eq!(entries[0].sender_email, "");
    }

    #[tokio::test]
    async fn sent_lists_only_the_senders_messages() {
        let (_kv, repo, resolver) = setup();
        repo.create_message(
            &UserId::new("u-1"),
            NewMessage {
                receiver_id: UserId::new("u-2"),
                subject: "first".to_string(),
                content: "one".to_string(),
            },
        )
        .await
        .unwrap();
        repo.create_message(
            &UserId::new("u-3"),
            NewMessage {
                receiver_id: UserId::new("u-2"),
                subject: "second".to_string(),
                content: "two".to_string(),
            },
        )
        .await
        .unwrap();

        let sent = resolver.sent(&UserId::new("u-1")).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "first");

        let inbox = resolver.inbox(&UserId::new("u-2")).await.unwrap();
        assert_eq!(inbox.len(), 2);
    }

    #[tokio::test]
    async fn inbox_entries_serialize_flat() {
        let (_kv, repo, resolver) = setup();
        repo.insert_profile(&profile("u-1", "Grace", Role::Student))
            .await
            .unwrap();
        repo.create_message(
            &UserId::new("u-1"),
            NewMessage {
                receiver_id: UserId::new("u-2"),
                subject: "flat".to_string(),
                content: "shape".to_string(),
            },
        )
        .await
        .unwrap();

        let entries = resolver.inbox(&UserId::new("u-2")).await.unwrap();
        let value = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(value["subject"], "flat");
        assert_eq!(value["senderName"], "Grace");
        assert!(value.get("message").is_none());
    }
}
