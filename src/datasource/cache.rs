// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{collections::HashMap, fmt::Display, future::Future};

use chrono::{DateTime, Utc};
use log::warn;
use tokio::sync::Mutex;

use crate::{query::ColumnKind, transport::TransportError};

/// Cache key for one discovery scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    Keyspaces,
    Tables(String),
    Columns(String, String, ColumnKind),
}

impl Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyspaces => write!(f, "keyspaces"),
            Self::Tables(keyspace) => write!(f, "tables({keyspace})"),
            Self::Columns(keyspace, table, kind) => {
                write!(f, "columns({keyspace}.{table}, {kind})")
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    names: Vec<String>,
    fetched_at: DateTime<Utc>,
}

/// Per-instance cache of discovered keyspace/table/column names. Entries
/// are created lazily, survive until explicitly invalidated (no TTL) and
/// converge to the most recently completed fetch per key.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: Mutex<HashMap<ScopeKey, CacheEntry>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value if present, otherwise runs `fetch` exactly once and
    /// stores the result. Fetch failures are logged and downgraded to an
    /// empty list without poisoning the cache; the next call retries.
    ///
    /// The lock is held across the fetch, so at most one discovery call is
    /// in flight and concurrent callers observe the completed value.
    pub async fn get_or_fetch<F, Fut>(&self, key: ScopeKey, fetch: F) -> Vec<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, TransportError>>,
    {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(&key) {
            return entry.names.clone();
        }

        match fetch().await {
            Ok(names) => {
                entries.insert(
                    key,
                    CacheEntry {
                        names: names.clone(),
                        fetched_at: Utc::now(),
                    },
                );
                names
            }
            Err(err) => {
                warn!("metadata fetch for {key} failed: {err}");
                Vec::new()
            }
        }
    }

    pub async fn invalidate(&self, key: &ScopeKey) {
        self.entries.lock().await.remove(key);
    }

    /// When the entry for `key` was last populated, if it is cached.
    pub async fn fetched_at(&self, key: &ScopeKey) -> Option<DateTime<Utc>> {
        self.entries.lock().await.get(key).map(|entry| entry.fetched_at)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn fetch_counter() -> AtomicUsize {
        AtomicUsize::new(0)
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = MetadataCache::new();
        let calls = fetch_counter();
        let calls = &calls;
        let key = ScopeKey::Tables("ks1".to_string());

        for _ in 0..2 {
            let names = cache
                .get_or_fetch(key.clone(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["sensors".to_string(), "readings".to_string()])
                })
                .await;
            assert_eq!(names, ["sensors", "readings"]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_fetch_independently() {
        let cache = MetadataCache::new();
        let calls = fetch_counter();
        let calls = &calls;

        for keyspace in ["ks1", "ks2"] {
            cache
                .get_or_fetch(ScopeKey::Tables(keyspace.to_string()), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Vec::new())
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_returns_empty_and_is_not_cached() {
        let _ = env_logger::builder().is_test(true).try_init();
        let cache = MetadataCache::new();
        let calls = fetch_counter();
        let calls = &calls;

        let names = cache
            .get_or_fetch(ScopeKey::Keyspaces, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TransportError::Config("connection refused".to_string()))
            })
            .await;
        assert!(names.is_empty());
        assert!(cache.fetched_at(&ScopeKey::Keyspaces).await.is_none());

        // retry succeeds and populates the entry
        let names = cache
            .get_or_fetch(ScopeKey::Keyspaces, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["system".to_string()])
            })
            .await;
        assert_eq!(names, ["system"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.fetched_at(&ScopeKey::Keyspaces).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_forces_a_refetch() {
        let cache = MetadataCache::new();
        let calls = fetch_counter();
        let calls = &calls;
        let key = ScopeKey::Keyspaces;

        for _ in 0..2 {
            cache
                .get_or_fetch(key.clone(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["system".to_string()])
                })
                .await;
            cache.invalidate(&key).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
