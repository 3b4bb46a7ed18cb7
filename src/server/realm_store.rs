//! Durable lookups behind the join protocol: the realm's map data, and a
//! joining user's profile (username, skin). Grounded on the trait-seam
//! pattern the teacher uses for its database layer — a trait plus an
//! in-memory implementation that a real deployment swaps out.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{RealmId, UserId};

#[derive(Debug, Clone)]
pub struct RealmRecord {
    pub owner_id: UserId,
    pub share_id: Option<Uuid>,
    pub map_data: String,
}

#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub username: String,
    pub skin: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("realm {0} does not exist")]
    RealmNotFound(RealmId),
    #[error("profile for user {0} does not exist")]
    ProfileNotFound(UserId),
}

#[async_trait]
pub trait RealmStore: Send + Sync {
    async fn load_realm(&self, realm_id: RealmId) -> Result<RealmRecord, StoreError>;
    async fn load_profile(&self, user_id: UserId) -> Result<ProfileRecord, StoreError>;
}

/// In-memory `RealmStore` seeded at startup or via `put_realm`/`put_profile`.
/// Stands in for a real persistence layer; the trait boundary is what
/// matters, not this implementation.
#[derive(Default)]
pub struct InMemoryRealmStore {
    realms: DashMap<RealmId, RealmRecord>,
    profiles: DashMap<UserId, ProfileRecord>,
}

impl InMemoryRealmStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_realm(
        &self,
        realm_id: RealmId,
        owner_id: UserId,
        share_id: Option<Uuid>,
        map_data: impl Into<String>,
    ) {
        self.realms.insert(
            realm_id,
            RealmRecord {
                owner_id,
                share_id,
                map_data: map_data.into(),
            },
        );
    }

    pub fn put_profile(&self, user_id: UserId, username: impl Into<String>, skin: impl Into<String>) {
        self.profiles.insert(
            user_id,
            ProfileRecord {
                username: username.into(),
                skin: skin.into(),
            },
        );
    }
}

#[async_trait]
impl RealmStore for InMemoryRealmStore {
    async fn load_realm(&self, realm_id: RealmId) -> Result<RealmRecord, StoreError> {
        self.realms
            .get(&realm_id)
            .map(|r| r.clone())
            .ok_or(StoreError::RealmNotFound(realm_id))
    }

    async fn load_profile(&self, user_id: UserId) -> Result<ProfileRecord, StoreError> {
        self.profiles
            .get(&user_id)
            .map(|p| p.clone())
            .ok_or(StoreError::ProfileNotFound(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn missing_realm_is_not_found() {
        let store = InMemoryRealmStore::new();
        let err = store.load_realm(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::RealmNotFound(_)));
    }

    #[tokio::test]
    async fn seeded_realm_is_found() {
        let store = InMemoryRealmStore::new();
        let realm_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        store.put_realm(realm_id, owner_id, None, "{}");
        let record = store.load_realm(realm_id).await.unwrap();
        assert_eq!(record.map_data, "{}");
        assert_eq!(record.owner_id, owner_id);
        assert_eq!(record.share_id, None);
    }

    #[tokio::test]
    async fn seeded_profile_is_found() {
        let store = InMemoryRealmStore::new();
        let user_id = Uuid::new_v4();
        store.put_profile(user_id, "alice", "default");
        let profile = store.load_profile(user_id).await.unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.skin, "default");
    }
}
