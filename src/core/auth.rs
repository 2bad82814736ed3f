use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::core::error::StoreError;
use crate::core::store::EntryStore;
use crate::core::store::types::ApiToken;

/// Why a well-formed token was refused. Only logged; callers see a single
/// "invalid or inactive" error either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCause {
    Unknown,
    Inactive,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication token required")]
    MissingToken,

    #[error("Invalid Authorization header format. Use: Bearer <token>")]
    MalformedToken,

    #[error("Invalid or inactive API token")]
    InvalidToken(RejectCause),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE.encode(bytes)
}

/// Extracts the secret from an `Authorization: Bearer <secret>` value.
/// The scheme is matched case-insensitively.
fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let (scheme, secret) = header
        .split_once(' ')
        .ok_or(AuthError::MalformedToken)?;
    let secret = secret.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || secret.is_empty() {
        return Err(AuthError::MalformedToken);
    }
    Ok(secret)
}

#[derive(Clone)]
pub struct TokenAuthenticator {
    store: EntryStore,
}

impl TokenAuthenticator {
    pub fn new(store: EntryStore) -> Self {
        Self { store }
    }

    /// Creates a new active token. The returned secret is the only copy of
    /// the plaintext; the store keeps just its hash.
    pub async fn issue(&self, name: &str) -> Result<(String, ApiToken), StoreError> {
        let secret = generate_secret();
        let token = self.store.insert_api_token(name, &hash_token(&secret)).await?;
        Ok((secret, token))
    }

    /// Resolves the presented `Authorization` header value to an active token
    /// and records its use.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<ApiToken, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let secret = parse_bearer(header)?;

        let token = match self.store.token_by_hash(&hash_token(secret)).await? {
            Some(token) if token.is_active => token,
            Some(token) => {
                warn!(token_id = token.id, "Rejected inactive API token");
                return Err(AuthError::InvalidToken(RejectCause::Inactive));
            }
            None => {
                warn!("Rejected unknown API token");
                return Err(AuthError::InvalidToken(RejectCause::Unknown));
            }
        };

        if let Err(e) = self.store.touch_token(token.id).await {
            warn!(token_id = token.id, "Failed to update token last_used_at: {}", e);
        }
        debug!(token_id = token.id, "API token authenticated");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> (TokenAuthenticator, EntryStore) {
        let store = EntryStore::open_in_memory().expect("in-memory store");
        (TokenAuthenticator::new(store.clone()), store)
    }

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            hash_token("asd123"),
            "54d5cb2d332dbdb4850293caae4559ce88b65163f1ea5d4e4b3ac49d772ded14"
        );
    }

    #[test]
    fn generated_secrets_are_unique() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
        assert_eq!(a.len(), 44);
    }

    #[test]
    fn parse_bearer_accepts_any_scheme_case() {
        assert_eq!(parse_bearer("Bearer abc").unwrap(), "abc");
        assert_eq!(parse_bearer("bearer abc").unwrap(), "abc");
        assert!(matches!(
            parse_bearer("Basic abc"),
            Err(AuthError::MalformedToken)
        ));
        assert!(matches!(parse_bearer("abc"), Err(AuthError::MalformedToken)));
        assert!(matches!(
            parse_bearer("Bearer  "),
            Err(AuthError::MalformedToken)
        ));
    }

    #[tokio::test]
    async fn issued_token_authenticates_and_is_touched() {
        let (auth, store) = authenticator();
        let (secret, token) = auth.issue("importer").await.unwrap();
        assert_ne!(secret, token.token_hash);

        let resolved = auth
            .authenticate(Some(&format!("Bearer {secret}")))
            .await
            .unwrap();
        assert_eq!(resolved.id, token.id);

        let stored = store.token_by_hash(&token.token_hash).await.unwrap().unwrap();
        assert!(stored.last_used_at.is_some());
    }

    #[tokio::test]
    async fn missing_and_malformed_are_distinct() {
        let (auth, _) = authenticator();
        assert!(matches!(
            auth.authenticate(None).await,
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            auth.authenticate(Some("Token abc")).await,
            Err(AuthError::MalformedToken)
        ));
    }

    #[tokio::test]
    async fn unknown_and_inactive_share_one_external_error() {
        let (auth, store) = authenticator();
        let (secret, token) = auth.issue("").await.unwrap();
        store.deactivate_api_token(token.id).await.unwrap();

        let inactive = auth
            .authenticate(Some(&format!("Bearer {secret}")))
            .await
            .unwrap_err();
        let unknown = auth.authenticate(Some("Bearer nope")).await.unwrap_err();

        assert!(matches!(
            inactive,
            AuthError::InvalidToken(RejectCause::Inactive)
        ));
        assert!(matches!(unknown, AuthError::InvalidToken(RejectCause::Unknown)));
        assert_eq!(inactive.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn failed_touch_does_not_block_authentication() {
        let (auth, store) = authenticator();
        let (secret, token) = auth.issue("importer").await.unwrap();
        store
            .execute_raw(
                "CREATE TRIGGER freeze_tokens BEFORE UPDATE ON api_tokens
                 BEGIN SELECT RAISE(ABORT, 'read only'); END;",
            )
            .await;

        let resolved = auth
            .authenticate(Some(&format!("Bearer {secret}")))
            .await
            .unwrap();
        assert_eq!(resolved.id, token.id);

        let stored = store.token_by_hash(&token.token_hash).await.unwrap().unwrap();
        assert_eq!(stored.last_used_at, None);
    }

    #[tokio::test]
    async fn failed_lookup_is_a_storage_error() {
        let (auth, store) = authenticator();
        store.execute_raw("DROP TABLE api_tokens;").await;

        let err = auth.authenticate(Some("Bearer abc")).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(StoreError::Unavailable(_))));
    }
}
