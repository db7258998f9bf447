use async_trait::async_trait;
use banyan_types::UserId;
use dashmap::DashMap;
use thiserror::Error;

/// Identity provider errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Resolves bearer credentials to stable user ids.
///
/// Account creation, passwords, and token issuance all live on the provider
/// side; the data core only ever asks "whose token is this".
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, bearer_token: &str) -> Result<UserId, IdentityError>;
}

/// In-memory token directory for tests and single-process runs.
#[derive(Default)]
pub struct StaticTokenDirectory {
    tokens: DashMap<String, UserId>,
}

impl StaticTokenDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a bearer token with a user id.
    pub fn register(&self, token: impl Into<String>, user_id: UserId) {
        self.tokens.insert(token.into(), user_id);
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenDirectory {
    async fn resolve(&self, bearer_token: &str) -> Result<UserId, IdentityError> {
        self.tokens
            .get(bearer_token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| IdentityError::Unauthenticated("unknown bearer token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_token_resolves_to_its_user() {
        let directory = StaticTokenDirectory::new();
        directory.register("tok-1", UserId::new("u-1"));

        let resolved = directory.resolve("tok-1").await.unwrap();
        assert_eq!(resolved, UserId::new("u-1"));
    }

    #[tokio::test]
    async fn unknown_token_is_unauthenticated() {
        let directory = StaticTokenDirectory::new();
        let result = directory.resolve("tok-none").await;
        assert!(matches!(result, Err(IdentityError::Unauthenticated(_))));
    }
}
