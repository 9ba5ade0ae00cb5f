// src/storage/registry.rs
use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::utils::error::Result;

/// The set of user ids that have completed verification.
///
/// `register` is the commit point: it must insert atomically and report
/// whether this call was the one that inserted, so that concurrent
/// verifications of the same user cannot both succeed.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn is_registered(&self, user_id: &str) -> Result<bool>;

    /// Returns `false` when the user was already present.
    async fn register(&self, user_id: &str) -> Result<bool>;

    async fn count(&self) -> Result<usize>;
}

#[derive(Default)]
pub struct MemoryRegistry {
    users: RwLock<HashSet<String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: RwLock::new(users.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistry {
    async fn is_registered(&self, user_id: &str) -> Result<bool> {
        Ok(self.users.read().contains(user_id))
    }

    async fn register(&self, user_id: &str) -> Result<bool> {
        Ok(self.users.write().insert(user_id.to_string()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.users.read().len())
    }
}
