use crate::keys::Relation;
use banyan_kv::{KvResult, KvStore};
use banyan_types::{Message, Paper, ResearchDomain};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// One relationship pointer: the composite key plus the child id stored as
/// its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerEntry {
    pub key: String,
    pub target: String,
}

/// Derives the relationship pointers implied by a record's foreign keys.
///
/// The derivation must be pure: create and delete call it on the same
/// record and rely on getting the same set both times.
pub trait PointerSet {
    fn pointers(&self) -> Vec<PointerEntry>;
}

impl PointerSet for ResearchDomain {
    fn pointers(&self) -> Vec<PointerEntry> {
        vec![PointerEntry {
            key: Relation::TeacherDomains.key(self.teacher_id.as_str(), self.id.as_str()),
            target: self.id.as_str().to_string(),
        }]
    }
}

impl PointerSet for Paper {
    fn pointers(&self) -> Vec<PointerEntry> {
        let mut entries = vec![PointerEntry {
            key: Relation::TeacherPapers.key(self.teacher_id.as_str(), self.id.as_str()),
            target: self.id.as_str().to_string(),
        }];
        if let Some(domain_id) = &self.domain_id {
            entries.push(PointerEntry {
                key: Relation::DomainPapers.key(domain_id.as_str(), self.id.as_str()),
                target: self.id.as_str().to_string(),
            });
        }
        entries
    }
}

impl PointerSet for Message {
    fn pointers(&self) -> Vec<PointerEntry> {
        vec![
            PointerEntry {
                key: Relation::UserInbox.key(self.receiver_id.as_str(), self.id.as_str()),
                target: self.id.as_str().to_string(),
            },
            PointerEntry {
                key: Relation::UserSent.key(self.sender_id.as_str(), self.id.as_str()),
                target: self.id.as_str().to_string(),
            },
        ]
    }
}

/// Writes and retracts relationship pointers for entity lifecycle events.
///
/// Callers sequence the entity write first, then `attach`; on delete, the
/// entity removal first, then `detach`. A reader can therefore observe a
/// pointer without its entity only inside the delete window, and treats
/// that as absence.
#[derive(Clone)]
pub struct IndexMaintainer {
    kv: Arc<dyn KvStore>,
}

impl IndexMaintainer {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Write one pointer per foreign key of `record`.
    pub async fn attach<R: PointerSet>(&self, record: &R) -> KvResult<()> {
        for entry in record.pointers() {
            self.kv
                .set(&entry.key, Value::String(entry.target.clone()))
                .await?;
            debug!(key = %entry.key, "attached pointer");
        }
        Ok(())
    }

    /// Remove exactly the pointers `attach` wrote for `record`.
    pub async fn detach<R: PointerSet>(&self, record: &R) -> KvResult<()> {
        for entry in record.pointers() {
            self.kv.delete(&entry.key).await?;
            debug!(key = %entry.key, "retracted pointer");
        }
        Ok(())
    }
}
