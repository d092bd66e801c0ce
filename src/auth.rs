//! Privilege resolution for group commands

use crate::config::GameSettings;
use crate::types::{Access, GroupId, UserId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Answers whether a user administers a group
#[async_trait]
pub trait AdminCheck: Send + Sync {
    async fn is_admin(&self, group_id: GroupId, user_id: UserId) -> bool;
}

/// Fixed set of administrator ids, valid in every group
#[derive(Debug, Clone, Default)]
pub struct StaticAdmins {
    ids: HashSet<UserId>,
}

impl StaticAdmins {
    pub fn new(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AdminCheck for StaticAdmins {
    async fn is_admin(&self, _group_id: GroupId, user_id: UserId) -> bool {
        self.ids.contains(&user_id)
    }
}

/// Caches answers of an inner check per (group, user) for a fixed TTL
pub struct CachedAdminCheck<A> {
    inner: A,
    ttl: Duration,
    cache: Mutex<HashMap<(GroupId, UserId), (bool, Instant)>>,
}

impl<A: AdminCheck> CachedAdminCheck<A> {
    pub fn new(inner: A) -> Self {
        Self::with_ttl(inner, GameSettings::ADMIN_CACHE_TTL)
    }

    pub fn with_ttl(inner: A, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<A: AdminCheck> AdminCheck for CachedAdminCheck<A> {
    async fn is_admin(&self, group_id: GroupId, user_id: UserId) -> bool {
        let key = (group_id, user_id);
        {
            let cache = self.cache.lock().await;
            if let Some((answer, at)) = cache.get(&key) {
                if at.elapsed() < self.ttl {
                    return *answer;
                }
            }
        }

        // Lock is not held across the inner lookup
        let answer = self.inner.is_admin(group_id, user_id).await;
        let mut cache = self.cache.lock().await;
        cache.retain(|_, (_, at)| at.elapsed() < self.ttl);
        cache.insert(key, (answer, Instant::now()));
        answer
    }
}

/// Resolve the sender's privileges for one command
pub async fn resolve_access(
    owner_id: Option<UserId>,
    admins: &dyn AdminCheck,
    group_id: GroupId,
    user_id: UserId,
) -> Access {
    Access {
        is_owner: owner_id == Some(user_id),
        is_admin: admins.is_admin(group_id, user_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingAdmins {
        calls: Arc<AtomicUsize>,
        admin: UserId,
    }

    #[async_trait]
    impl AdminCheck for CountingAdmins {
        async fn is_admin(&self, _group_id: GroupId, user_id: UserId) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            user_id == self.admin
        }
    }

    #[tokio::test]
    async fn test_static_admins() {
        let admins = StaticAdmins::new([1, 2]);
        assert!(admins.is_admin(-100, 1).await);
        assert!(!admins.is_admin(-100, 3).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_admin_check_expires() {
        let calls = Arc::new(AtomicUsize::new(0));
        let check = CachedAdminCheck::new(CountingAdmins {
            calls: calls.clone(),
            admin: 7,
        });

        assert!(check.is_admin(-1, 7).await);
        assert!(check.is_admin(-1, 7).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Different group is a different key
        assert!(check.is_admin(-2, 7).await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(16)).await;
        assert!(check.is_admin(-1, 7).await);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_admin_check_evicts_expired_entries() {
        let check = CachedAdminCheck::with_ttl(StaticAdmins::new([7]), Duration::from_secs(10));
        for user_id in 1..=5 {
            check.is_admin(-1, user_id).await;
        }
        assert_eq!(check.cache.lock().await.len(), 5);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(check.is_admin(-2, 7).await);
        let cache = check.cache.lock().await;
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key(&(-2, 7)));
    }

    #[tokio::test]
    async fn test_resolve_access() {
        let admins = StaticAdmins::new([5]);

        let owner = resolve_access(Some(1), &admins, -1, 1).await;
        assert!(owner.is_owner && !owner.is_admin);
        assert!(owner.is_privileged());

        let admin = resolve_access(Some(1), &admins, -1, 5).await;
        assert!(admin.is_admin && admin.is_privileged());

        let nobody = resolve_access(None, &admins, -1, 9).await;
        assert!(!nobody.is_privileged());
    }
}
