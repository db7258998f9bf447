use crate::ids::{DomainId, MessageId, PaperId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Account role. Teachers may own domains and papers; students may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    pub fn is_teacher(&self) -> bool {
        matches!(self, Role::Teacher)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a role string is neither `student` nor `teacher`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role `{0}`, expected `student` or `teacher`")]
pub struct InvalidRole(pub String);

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            other => Err(InvalidRole(other.to_string())),
        }
    }
}

/// The four persisted entity kinds. Each occupies one key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Domain,
    Paper,
    Message,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Domain => "domain",
            EntityKind::Paper => "paper",
            EntityKind::Message => "message",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(EntityKind::User),
            "domain" => Some(EntityKind::Domain),
            "paper" => Some(EntityKind::Paper),
            "message" => Some(EntityKind::Message),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistent user profile record. Created once at registration; the id and
/// role never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub bio: String,
    pub institution: String,
    pub research_interests: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Persistent research domain record, owned by one teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchDomain {
    pub id: DomainId,
    pub name: String,
    pub description: String,
    pub teacher_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Persistent paper record. `file_path` points into the blob store; the
/// record itself never carries file bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: PaperId,
    pub title: String,
    pub description: String,
    pub domain_id: Option<DomainId>,
    pub teacher_id: UserId,
    pub file_name: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

/// Persistent message record, stored once and referenced from both the
/// receiver's inbox and the sender's sent-list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub subject: String,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Registration payload. Bio, institution, and interests start empty and are
/// filled in later through profile updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Profile update payload. Absent fields mean "leave unchanged"; the id,
/// email, and role are not updatable through this path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub research_interests: Option<Vec<String>>,
}

impl ProfileUpdate {
    /// Shallow-merge the supplied fields over the current record.
    pub fn apply(self, current: &mut UserProfile) {
        if let Some(name) = self.name {
            current.name = name;
        }
        if let Some(bio) = self.bio {
            current.bio = bio;
        }
        if let Some(institution) = self.institution {
            current.institution = institution;
        }
        if let Some(interests) = self.research_interests {
            current.research_interests = interests;
        }
    }
}

/// Domain creation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDomain {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Paper creation payload. The file bytes travel alongside, not inside,
/// this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPaper {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub domain_id: Option<DomainId>,
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Message send payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub receiver_id: UserId,
    pub subject: String,
    pub content: String,
}
