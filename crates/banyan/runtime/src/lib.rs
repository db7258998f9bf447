//! Bootstrap facade for the Banyan data core.
//!
//! One call wires the whole stack: a key-value backend, the entity
//! repository and query resolver on top of it, the external-collaborator
//! connectors, and the two service surfaces (directory, messaging). The
//! boundary layer holds a [`Runtime`] and talks to the services through its
//! accessors; `authenticate` is the passthrough it uses to turn a bearer
//! token into a caller id before invoking anything else.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

use banyan_connectors::{
    BlobStore, IdentityError, IdentityProvider, InMemoryBlobStore, StaticTokenDirectory,
};
use banyan_directory::DirectoryService;
use banyan_kv::{InMemoryKvStore, KvError, KvStore};
use banyan_messaging::MessagingService;
use banyan_query::QueryResolver;
use banyan_repository::EntityRepository;
use banyan_types::UserId;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced while wiring or using the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage bootstrap failed: {0}")]
    Storage(#[from] KvError),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("identity provider failure: {0}")]
    Identity(String),
}

impl From<IdentityError> for RuntimeError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unauthenticated(reason) => RuntimeError::Unauthenticated(reason),
            IdentityError::Backend(reason) => RuntimeError::Identity(reason),
        }
    }
}

/// Key-value backend selection.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Keep the whole namespace in process memory.
    Memory,
    /// Persist the namespace in PostgreSQL; the schema is created on
    /// bootstrap. Requires the `postgres` cargo feature.
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::Memory
    }

    pub fn postgres(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self::Postgres {
            database_url: database_url.into(),
            max_connections,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Memory
    }
}

/// Everything the bootstrap needs to decide.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub storage: StorageConfig,
    /// Lifetime of signed download URLs issued by the directory service.
    pub signed_url_ttl_seconds: u64,
    /// Optional namespace prepended to uploaded blob paths.
    pub blob_path_prefix: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::Memory,
            signed_url_ttl_seconds: banyan_directory::DEFAULT_SIGNED_URL_TTL_SECS,
            blob_path_prefix: None,
        }
    }
}

impl RuntimeConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn postgres(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            storage: StorageConfig::postgres(database_url, max_connections),
            ..Self::default()
        }
    }
}

/// The wired data core.
pub struct Runtime {
    kv: Arc<dyn KvStore>,
    identity: Arc<dyn IdentityProvider>,
    directory: DirectoryService,
    messaging: MessagingService,
    backend_label: &'static str,
}

impl Runtime {
    /// Wire the stack with in-memory connector adapters. Production
    /// deployments that implement the identity/blob contracts against real
    /// services use [`Runtime::bootstrap_with`] instead.
    pub async fn bootstrap(config: RuntimeConfig) -> RuntimeResult<Self> {
        let identity: Arc<dyn IdentityProvider> = Arc::new(StaticTokenDirectory::new());
        let blobs: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
        Self::bootstrap_with(config, identity, blobs).await
    }

    /// Wire the stack against caller-supplied identity and blob connectors.
    pub async fn bootstrap_with(
        config: RuntimeConfig,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStore>,
    ) -> RuntimeResult<Self> {
        let backend_label = config.storage.label();
        let kv = open_store(&config.storage).await?;

        let repo = EntityRepository::new(kv.clone());
        let mut directory = DirectoryService::new(
            repo.clone(),
            QueryResolver::new(repo.clone()),
            blobs,
        )
        .with_signed_url_ttl(config.signed_url_ttl_seconds);
        if let Some(prefix) = config.blob_path_prefix {
            directory = directory.with_blob_prefix(prefix);
        }
        let messaging = MessagingService::new(repo.clone(), QueryResolver::new(repo));

        info!(backend = backend_label, "banyan runtime ready");
        Ok(Self {
            kv,
            identity,
            directory,
            messaging,
            backend_label,
        })
    }

    /// Resolve a bearer token to the caller's user id.
    pub async fn authenticate(&self, bearer_token: &str) -> RuntimeResult<UserId> {
        Ok(self.identity.resolve(bearer_token).await?)
    }

    pub fn directory(&self) -> &DirectoryService {
        &self.directory
    }

    pub fn messaging(&self) -> &MessagingService {
        &self.messaging
    }

    /// The underlying key-value store, for operational tooling.
    pub fn kv(&self) -> Arc<dyn KvStore> {
        self.kv.clone()
    }

    pub fn backend_label(&self) -> &'static str {
        self.backend_label
    }
}

async fn open_store(storage: &StorageConfig) -> RuntimeResult<Arc<dyn KvStore>> {
    match storage {
        StorageConfig::Memory => Ok(Arc::new(InMemoryKvStore::new())),
        #[cfg(feature = "postgres")]
        StorageConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store =
                banyan_kv::PostgresKvStore::connect_with_options(database_url, *max_connections, 5)
                    .await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        StorageConfig::Postgres { .. } => Err(RuntimeError::Config(
            "postgres storage requires the `postgres` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_labels_name_the_backend() {
        assert_eq!(StorageConfig::memory().label(), "memory");
        assert_eq!(
            StorageConfig::postgres("postgres://localhost/banyan", 4).label(),
            "postgres"
        );
    }

    #[tokio::test]
    async fn memory_bootstrap_wires_both_services() {
        let runtime = Runtime::bootstrap(RuntimeConfig::default())
            .await
            .expect("memory bootstrap");
        assert_eq!(runtime.backend_label(), "memory");

        let teachers = runtime.directory().teachers().await.unwrap();
        assert!(teachers.is_empty());
        let inbox = runtime
            .messaging()
            .inbox(&UserId::new("nobody"))
            .await
            .unwrap();
        assert!(inbox.is_empty());
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn postgres_config_without_the_feature_is_rejected() {
        let result =
            Runtime::bootstrap(RuntimeConfig::postgres("postgres://localhost/banyan", 4)).await;
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }

    #[tokio::test]
    async fn default_identity_provider_knows_no_tokens() {
        let runtime = Runtime::bootstrap(RuntimeConfig::default()).await.unwrap();
        let result = runtime.authenticate("tok-1").await;
        assert!(matches!(result, Err(RuntimeError::Unauthenticated(_))));
    }
}
