//! In-memory map of authenticated principals, keyed by user id.
//!
//! Separate from [`crate::domain::session::Session::players`] because a user
//! may be authenticated (handshake succeeded, socket open) without yet
//! being a member of any session, or transiently between disconnect and
//! full session cleanup. Grounded on the teacher's `AuthMiddleware`
//! (`auth/middleware.rs`) for the "small guarded map of principals" shape,
//! simplified since this crate has no app-id/credential layer of its own.

use dashmap::DashMap;
use uuid::Uuid;

use super::session::{SocketId, UserId};

/// An authenticated principal, as produced by the identity provider.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub socket_id: SocketId,
}

/// Registry of currently-connected, authenticated users.
#[derive(Default)]
pub struct UserRegistry {
    principals: DashMap<UserId, Principal>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `principal` on successful handshake authentication.
    pub fn insert(&self, principal: Principal) {
        self.principals.insert(principal.user_id, principal);
    }

    pub fn get(&self, user_id: UserId) -> Option<Principal> {
        self.principals.get(&user_id).map(|p| p.clone())
    }

    /// Removes `user_id` on disconnect.
    pub fn remove(&self, user_id: UserId) {
        self.principals.remove(&user_id);
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let registry = UserRegistry::new();
        let user_id = Uuid::new_v4();
        registry.insert(Principal {
            user_id,
            username: "alice".into(),
            socket_id: Uuid::new_v4(),
        });
        assert_eq!(registry.get(user_id).unwrap().username, "alice");
    }

    #[test]
    fn remove_clears_entry() {
        let registry = UserRegistry::new();
        let user_id = Uuid::new_v4();
        registry.insert(Principal {
            user_id,
            username: "alice".into(),
            socket_id: Uuid::new_v4(),
        });
        registry.remove(user_id);
        assert!(registry.get(user_id).is_none());
        assert!(registry.is_empty());
    }
}
