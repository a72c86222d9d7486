//! 查询缓存：连接成功后全部失效，使依赖的视图重新获取数据。
//! Query cache invalidated after every successful connect so dependent views
//! refetch against the new client.

use dashmap::DashMap;
use std::{hash::Hash, sync::Arc};
use tokio::sync::watch;
use tracing::debug;

/// The operation the lifecycle manager needs from a query cache.
///
/// 生命周期管理器对查询缓存所需的操作。
pub trait QueryCache: Send + Sync + 'static {
    /// Marks every cached result stale.
    /// 将所有缓存结果标记为过期。
    fn invalidate_all(&self);
}

impl<T: QueryCache + ?Sized> QueryCache for Arc<T> {
    fn invalidate_all(&self) {
        (**self).invalidate_all()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    generation: u64,
}

/// An in-memory query cache keyed by query key.
///
/// Entries written before the latest `invalidate_all` are kept but reported as
/// stale. Views subscribe to the generation counter to learn when to refetch.
///
/// 按查询键索引的内存查询缓存。
///
/// 在最近一次 `invalidate_all` 之前写入的条目会被保留，但被报告为过期。
/// 视图订阅代计数器以得知何时需要重新获取。
#[derive(Debug)]
pub struct MemoryQueryCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
    generation: watch::Sender<u64>,
}

impl<K, V> MemoryQueryCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            entries: DashMap::new(),
            generation,
        }
    }

    /// Stores a result fetched under the current generation.
    /// 存储在当前代下获取的结果。
    pub fn insert(&self, key: K, value: V) {
        let generation = *self.generation.borrow();
        self.entries.insert(key, CacheEntry { value, generation });
    }

    /// Returns the cached value only if it is still fresh.
    /// 仅当缓存值仍然新鲜时才返回。
    pub fn get_fresh(&self, key: &K) -> Option<V> {
        let current = *self.generation.borrow();
        self.entries
            .get(key)
            .filter(|entry| entry.generation == current)
            .map(|entry| entry.value.clone())
    }

    /// Returns the cached value whether or not it is stale, along with its
    /// freshness, so views can render old data while refetching.
    ///
    /// 返回缓存值（无论是否过期）及其新鲜度，以便视图在重新获取时显示旧数据。
    pub fn get(&self, key: &K) -> Option<(V, bool)> {
        let current = *self.generation.borrow();
        self.entries
            .get(key)
            .map(|entry| (entry.value.clone(), entry.generation == current))
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The current generation; bumped by every `invalidate_all`.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}

impl<K, V> Default for MemoryQueryCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> QueryCache for MemoryQueryCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn invalidate_all(&self) {
        self.generation.send_modify(|generation| *generation += 1);
        debug!(
            generation = *self.generation.borrow(),
            entries = self.entries.len(),
            "Query cache invalidated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_all_marks_entries_stale() {
        let cache: MemoryQueryCache<&'static str, u32> = MemoryQueryCache::new();
        cache.insert("trades", 3);
        assert_eq!(cache.get_fresh(&"trades"), Some(3));

        cache.invalidate_all();

        assert_eq!(cache.get_fresh(&"trades"), None);
        assert_eq!(cache.get(&"trades"), Some((3, false)));
        assert_eq!(cache.generation(), 1);

        cache.insert("trades", 4);
        assert_eq!(cache.get_fresh(&"trades"), Some(4));
    }

    #[tokio::test]
    async fn test_subscribers_see_generation_bump() {
        let cache: Arc<MemoryQueryCache<String, String>> = Arc::new(MemoryQueryCache::new());
        let mut rx = cache.subscribe();

        cache.invalidate_all();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }
}
