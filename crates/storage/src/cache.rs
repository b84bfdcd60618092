//! Small bounded read cache sitting in front of the database shims.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::num::NonZeroUsize;

use parking_lot::Mutex;
use velum_db::{errors::DbError, DbResult};

use crate::exec::DbRecv;

struct CacheState<K, V> {
    entries: HashMap<K, V>,
    /// Insertion order, oldest first; evicted from the front.
    order: VecDeque<K>,
}

/// Bounded map from entity key to fetched value.  Misses run the supplied
/// fetch and populate the table; writers purge the key they touched.
pub struct CacheTable<K, V> {
    state: Mutex<CacheState<K, V>>,
    cap: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> CacheTable<K, V> {
    pub fn new(cap: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            cap: cap.get(),
        }
    }

    fn lookup(&self, k: &K) -> Option<V> {
        self.state.lock().entries.get(k).cloned()
    }

    fn insert(&self, k: K, v: V) {
        let mut st = self.state.lock();
        if st.entries.insert(k.clone(), v).is_none() {
            st.order.push_back(k);
        }
        while st.entries.len() > self.cap {
            let Some(old) = st.order.pop_front() else {
                break;
            };
            st.entries.remove(&old);
        }
    }

    pub fn purge_blocking(&self, k: &K) {
        let mut st = self.state.lock();
        if st.entries.remove(k).is_some() {
            st.order.retain(|e| e != k);
        }
    }

    pub async fn purge_async(&self, k: &K) {
        self.purge_blocking(k);
    }

    pub fn get_or_fetch_blocking(
        &self,
        k: &K,
        fetch: impl FnOnce() -> DbResult<V>,
    ) -> DbResult<V> {
        if let Some(v) = self.lookup(k) {
            return Ok(v);
        }
        let v = fetch()?;
        self.insert(k.clone(), v.clone());
        Ok(v)
    }

    pub async fn get_or_fetch_async(
        &self,
        k: &K,
        fetch: impl FnOnce() -> DbRecv<V>,
    ) -> DbResult<V> {
        if let Some(v) = self.lookup(k) {
            return Ok(v);
        }
        let resp_rx = fetch();
        let v = match resp_rx.await {
            Ok(res) => res?,
            Err(_) => return Err(DbError::WorkerFailedStrangely),
        };
        self.insert(k.clone(), v.clone());
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::CacheTable;

    #[test]
    fn test_fetch_once_then_cached() {
        let cache: CacheTable<u32, u32> = CacheTable::new(NonZeroUsize::new(4).unwrap());
        let mut calls = 0;
        let v = cache
            .get_or_fetch_blocking(&1, || {
                calls += 1;
                Ok(10)
            })
            .unwrap();
        assert_eq!(v, 10);
        let v = cache
            .get_or_fetch_blocking(&1, || {
                calls += 1;
                Ok(99)
            })
            .unwrap();
        assert_eq!(v, 10);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_purge_refetches() {
        let cache: CacheTable<u32, u32> = CacheTable::new(NonZeroUsize::new(4).unwrap());
        cache.get_or_fetch_blocking(&1, || Ok(10)).unwrap();
        cache.purge_blocking(&1);
        let v = cache.get_or_fetch_blocking(&1, || Ok(20)).unwrap();
        assert_eq!(v, 20);
    }

    #[test]
    fn test_eviction_respects_cap() {
        let cache: CacheTable<u32, u32> = CacheTable::new(NonZeroUsize::new(2).unwrap());
        for k in 0..5u32 {
            cache.get_or_fetch_blocking(&k, || Ok(k)).unwrap();
        }
        let st = cache.state.lock();
        assert!(st.entries.len() <= 2);
    }
}
