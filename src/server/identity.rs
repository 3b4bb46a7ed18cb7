//! Identity verification at the join boundary.
//!
//! Grounded on the teacher's `auth::middleware::AuthMiddleware`: a trait seam
//! so a database-backed implementation can replace the in-memory one without
//! touching call sites, and a "disabled" mode that accepts every claimed
//! identity, used by default since the design carries no credential format.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::UserId;

#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("token did not resolve to a known user")]
    Unauthenticated,
}

/// Resolves a client-presented token and claimed user id to a verified
/// `Principal`. Implementations may call out to a database or auth service;
/// the method is `async` so that substitution never requires a call-site
/// change.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(
        &self,
        token: &str,
        claimed_user_id: Uuid,
        claimed_username: &str,
    ) -> Result<Principal, IdentityError>;
}

/// Accepts every claimed identity as-is. The default provider: nothing in
/// the design specifies a credential format, so verification is a seam for
/// deployments to fill in rather than a built-in policy.
pub struct TrustingIdentityProvider;

#[async_trait]
impl IdentityProvider for TrustingIdentityProvider {
    async fn verify(
        &self,
        _token: &str,
        claimed_user_id: Uuid,
        claimed_username: &str,
    ) -> Result<Principal, IdentityError> {
        Ok(Principal {
            user_id: claimed_user_id,
            username: claimed_username.to_string(),
        })
    }
}
