//! Campus directory operations: profiles, research domains, papers.
//!
//! This crate is the write-side policy layer over the repository and
//! resolver. It owns the rules the storage layers do not know about: who
//! may create what, which fields are required, and how blob uploads
//! interleave with record writes.
//!
//! Error taxonomy at this surface:
//! - `NotFound` — the named record does not exist (or is not visible in the
//!   requested role, e.g. a student looked up as a teacher)
//! - `Unauthorized` — the caller exists but lacks the right
//! - `InvalidInput` — a required field is missing or references a record
//!   that does not exist
//! - `Dependency` — the key-value table or blob store failed
//!
//! Lower-layer errors fold into the last variant; nothing is silently
//! coerced into success except the documented blob-delete tolerance during
//! paper deletion.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

use banyan_connectors::{BlobError, BlobStore};
use banyan_query::{QueryError, QueryResolver};
use banyan_repository::{EntityRepository, RepositoryError};
use banyan_types::{
    DomainId, EntityKind, NewDomain, NewPaper, NewProfile, Paper, PaperId, ProfileUpdate,
    ResearchDomain, UserId, UserProfile,
};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Default lifetime of signed download URLs.
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

const DEFAULT_CONTENT_TYPE: &str = "application/pdf";

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Directory-surface errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dependency failure: {0}")]
    Dependency(String),
}

impl From<RepositoryError> for DirectoryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { kind, id } => DirectoryError::NotFound { kind, id },
            other => DirectoryError::Dependency(other.to_string()),
        }
    }
}

impl From<QueryError> for DirectoryError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Repository(inner) => inner.into(),
            QueryError::Store(inner) => DirectoryError::Dependency(inner.to_string()),
        }
    }
}

impl From<BlobError> for DirectoryError {
    fn from(err: BlobError) -> Self {
        DirectoryError::Dependency(err.to_string())
    }
}

/// Profile, domain, and paper operations.
pub struct DirectoryService {
    repo: EntityRepository,
    query: QueryResolver,
    blobs: Arc<dyn BlobStore>,
    signed_url_ttl_seconds: u64,
    blob_path_prefix: Option<String>,
}

impl DirectoryService {
    pub fn new(repo: EntityRepository, query: QueryResolver, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            repo,
            query,
            blobs,
            signed_url_ttl_seconds: DEFAULT_SIGNED_URL_TTL_SECS,
            blob_path_prefix: None,
        }
    }

    /// Override the signed-URL lifetime.
    pub fn with_signed_url_ttl(mut self, ttl_seconds: u64) -> Self {
        self.signed_url_ttl_seconds = ttl_seconds;
        self
    }

    /// Namespace uploaded blobs under a fixed path prefix, for deployments
    /// where the bucket is shared with other applications.
    pub fn with_blob_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.blob_path_prefix = Some(prefix.into());
        self
    }

    // ── profiles ───────────────────────────────────────────────────

    /// Create the profile record for a freshly issued account. The
    /// identity provider owns the id; this writes the directory's view of
    /// it. Bio, institution, and interests start empty.
    pub async fn register_profile(
        &self,
        user_id: &UserId,
        draft: NewProfile,
    ) -> DirectoryResult<UserProfile> {
        if draft.email.trim().is_empty() || draft.name.trim().is_empty() {
            return Err(DirectoryError::InvalidInput(
                "missing required fields: email, name, role".to_string(),
            ));
        }
        if self.repo.get_profile(user_id).await?.is_some() {
            return Err(DirectoryError::InvalidInput(format!(
                "profile already exists for user {user_id}"
            )));
        }

        let profile = UserProfile {
            id: user_id.clone(),
            email: draft.email,
            name: draft.name,
            role: draft.role,
            bio: String::new(),
            institution: String::new(),
            research_interests: vec![],
            created_at: Utc::now(),
        };
        self.repo.insert_profile(&profile).await?;
        info!(id = %user_id, role = %profile.role, "registered profile");
        Ok(profile)
    }

    pub async fn profile(&self, user_id: &UserId) -> DirectoryResult<UserProfile> {
        self.repo
            .get_profile(user_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound {
                kind: EntityKind::User,
                id: user_id.as_str().to_string(),
            })
    }

    /// Shallow-merge `update` over the caller's profile. Absent fields
    /// stay as they are; the id, email, and role never change here.
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> DirectoryResult<UserProfile> {
        let updated = self.repo.update_profile(user_id, update).await?;
        info!(id = %user_id, "updated profile");
        Ok(updated)
    }

    /// Every profile holding the teacher role, in key order.
    pub async fn teachers(&self) -> DirectoryResult<Vec<UserProfile>> {
        let profiles = self.repo.list_profiles().await?;
        Ok(profiles
            .into_iter()
            .filter(|profile| profile.role.is_teacher())
            .collect())
    }

    /// Look up one teacher. A profile with the student role is reported as
    /// absent, not as a role error.
    pub async fn teacher(&self, teacher_id: &UserId) -> DirectoryResult<UserProfile> {
        let not_found = || DirectoryError::NotFound {
            kind: EntityKind::User,
            id: teacher_id.as_str().to_string(),
        };
        let profile = self
            .repo
            .get_profile(teacher_id)
            .await?
            .ok_or_else(not_found)?;
        if !profile.role.is_teacher() {
            return Err(not_found());
        }
        Ok(profile)
    }

    // ── domains ────────────────────────────────────────────────────

    /// Create a research domain owned by the caller. Teachers only.
    pub async fn create_domain(
        &self,
        caller: &UserId,
        draft: NewDomain,
    ) -> DirectoryResult<ResearchDomain> {
        self.require_teacher(caller, "only teachers can create research domains")
            .await?;
        if draft.name.trim().is_empty() {
            return Err(DirectoryError::InvalidInput(
                "domain name is required".to_string(),
            ));
        }

        let domain = self.repo.create_domain(caller, draft).await?;
        info!(id = %domain.id, teacher = %caller, "created domain");
        Ok(domain)
    }

    pub async fn domains_of(&self, teacher_id: &UserId) -> DirectoryResult<Vec<ResearchDomain>> {
        Ok(self.query.domains_of(teacher_id).await?)
    }

    // ── papers ─────────────────────────────────────────────────────

    /// Upload a paper: blob first, record second. Teachers only; when the
    /// draft names a domain it must exist and belong to the caller.
    ///
    /// If the record write fails after the upload succeeded, the blob is
    /// left behind for manual cleanup; the reverse order would risk records
    /// pointing at bytes that never arrived.
    pub async fn upload_paper(
        &self,
        caller: &UserId,
        draft: NewPaper,
        payload: Bytes,
    ) -> DirectoryResult<Paper> {
        self.require_teacher(caller, "only teachers can upload papers")
            .await?;
        if draft.title.trim().is_empty() || draft.file_name.trim().is_empty() || payload.is_empty()
        {
            return Err(DirectoryError::InvalidInput(
                "missing required fields: title, file name, file data".to_string(),
            ));
        }

        if let Some(domain_id) = &draft.domain_id {
            let domain = self.repo.get_domain(domain_id).await?.ok_or_else(|| {
                DirectoryError::InvalidInput(format!("domain {domain_id} does not exist"))
            })?;
            if domain.teacher_id != *caller {
                return Err(DirectoryError::Unauthorized(format!(
                    "domain {domain_id} belongs to another teacher"
                )));
            }
        }

        let paper_id = PaperId::generate();
        let file_path = match &self.blob_path_prefix {
            Some(prefix) => format!("{}/{}/{}_{}", prefix, caller, paper_id, draft.file_name),
            None => format!("{}/{}_{}", caller, paper_id, draft.file_name),
        };
        let content_type = draft
            .content_type
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_TYPE);
        self.blobs
            .put_object(&file_path, payload, content_type)
            .await?;

        let paper = Paper {
            id: paper_id,
            title: draft.title,
            description: draft.description.unwrap_or_default(),
            domain_id: draft.domain_id,
            teacher_id: caller.clone(),
            file_name: draft.file_name,
            file_path,
            created_at: Utc::now(),
        };
        self.repo.insert_paper(&paper).await?;
        info!(id = %paper.id, teacher = %caller, "uploaded paper");
        Ok(paper)
    }

    pub async fn paper(&self, paper_id: &PaperId) -> DirectoryResult<Paper> {
        self.repo
            .get_paper(paper_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound {
                kind: EntityKind::Paper,
                id: paper_id.as_str().to_string(),
            })
    }

    pub async fn papers_of(&self, teacher_id: &UserId) -> DirectoryResult<Vec<Paper>> {
        Ok(self.query.papers_of(teacher_id).await?)
    }

    pub async fn papers_in(&self, domain_id: &DomainId) -> DirectoryResult<Vec<Paper>> {
        Ok(self.query.papers_in(domain_id).await?)
    }

    /// Signed download URL for a paper's stored file.
    pub async fn download_url(&self, paper_id: &PaperId) -> DirectoryResult<String> {
        let paper = self.paper(paper_id).await?;
        let url = self
            .blobs
            .create_signed_url(&paper.file_path, self.signed_url_ttl_seconds)
            .await?;
        Ok(url)
    }

    /// Delete a paper the caller owns: blob, then entity, then pointers.
    ///
    /// A blob-store failure is logged and deletion proceeds; the record and
    /// its pointers must not outlive a file that was meant to go away.
    pub async fn delete_paper(&self, caller: &UserId, paper_id: &PaperId) -> DirectoryResult<()> {
        let paper = self.paper(paper_id).await?;
        if paper.teacher_id != *caller {
            return Err(DirectoryError::Unauthorized(
                "only the owning teacher can delete a paper".to_string(),
            ));
        }

        if let Err(err) = self.blobs.delete_object(&paper.file_path).await {
            warn!(
                path = %paper.file_path,
                error = %err,
                "blob delete failed, continuing with record removal"
            );
        }
        self.repo.delete_paper(&paper).await?;
        info!(id = %paper_id, teacher = %caller, "deleted paper");
        Ok(())
    }

    async fn require_teacher(&self, caller: &UserId, denial: &str) -> DirectoryResult<UserProfile> {
        let profile = self.repo.get_profile(caller).await?;
        match profile {
            Some(profile) if profile.role.is_teacher() => Ok(profile),
            _ => Err(DirectoryError::Unauthorized(denial.to_string())),
        }
    }
}
