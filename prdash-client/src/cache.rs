//! Short-lived lookup caches shared by the provider clients.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Login of the authenticated user per provider.
pub const CURRENT_USER_TTL: Duration = Duration::from_secs(10 * 60);

/// Numeric GitLab project id per `provider:path`.
pub const PROJECT_ID_TTL: Duration = Duration::from_secs(15 * 60);

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

/// Mutex-guarded map with lazy expiry on read.
///
/// The lock is held only for the lookup or update itself.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value for `key`; an expired entry is removed and reported
    /// as missing.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry
                .expires_at
                .is_some_and(|expires_at| Instant::now() > expires_at),
        };
        if expired {
            entries.remove(key);
            tracing::trace!(key, "Cache entry expired");
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.insert(key.into(), value, Instant::now().checked_add(ttl));
    }

    /// Store without expiry.
    pub fn set_permanent(&self, key: impl Into<String>, value: V) {
        self.insert(key.into(), value, None);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: String, value: V, expires_at: Option<Instant>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, Entry { value, expires_at });
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The caches one dashboard process shares across clients.
///
/// GitLab user ids are stored without expiry: usernames map to stable ids.
#[derive(Default)]
pub struct ProviderCaches {
    pub current_user: TtlCache<String>,
    pub project_ids: TtlCache<u64>,
    pub user_ids: TtlCache<u64>,
}

impl ProviderCaches {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Key for per-provider lookups of a case-insensitive identifier.
pub fn scoped_key(provider_id: &str, identifier: &str) -> String {
    format!("{}:{}", provider_id, identifier.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set() {
        let cache = TtlCache::new();
        assert_eq!(cache.get("gitlab:gitlab.com"), None);
        cache.set("gitlab:gitlab.com", "alice".to_string(), CURRENT_USER_TTL);
        assert_eq!(cache.get("gitlab:gitlab.com"), Some("alice".to_string()));
    }

    #[test]
    fn test_set_overwrites() {
        let cache = TtlCache::new();
        cache.set("k", 1u64, PROJECT_ID_TTL);
        cache.set("k", 2u64, PROJECT_ID_TTL);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let cache = TtlCache::new();
        cache.set("k", 1u64, Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_permanent_entry_never_expires() {
        let cache = TtlCache::new();
        cache.set_permanent("k", 9u64);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), Some(9));
    }

    #[test]
    fn test_scoped_key_lowercases_identifier() {
        assert_eq!(
            scoped_key("gitlab:gitlab.com", "Group/Repo"),
            "gitlab:gitlab.com:group/repo"
        );
    }
}
