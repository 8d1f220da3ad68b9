//! Client-side query cache.
//!
//! Reads are keyed by a [`QueryKey`]. While a read is in flight, identical
//! reads await the same future instead of issuing their own request. Writes
//! call [`QueryCache::invalidate`] with a key prefix; the next read of any
//! matching key goes back to the server.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Ordered key segments, e.g. `["products", "list", "{\"page\":2}"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(root: &str) -> Self {
        Self(vec![root.to_string()])
    }

    pub fn with(mut self, segment: impl ToString) -> Self {
        self.0.push(segment.to_string());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// The keys screens read under. Writes invalidate by the coarser prefixes.
pub mod keys {
    use serde::Serialize;
    use uuid::Uuid;

    use super::QueryKey;

    fn fingerprint<Q: Serialize>(query: &Q) -> String {
        serde_json::to_string(query).unwrap_or_default()
    }

    pub fn products() -> QueryKey {
        QueryKey::new("products")
    }

    pub fn product_list<Q: Serialize>(query: &Q) -> QueryKey {
        products().with("list").with(fingerprint(query))
    }

    pub fn featured() -> QueryKey {
        products().with("featured")
    }

    pub fn product(id: Uuid) -> QueryKey {
        products().with("detail").with(id)
    }

    pub fn stores() -> QueryKey {
        QueryKey::new("stores")
    }

    pub fn store_list<Q: Serialize>(query: &Q) -> QueryKey {
        stores().with("list").with(fingerprint(query))
    }

    pub fn store(id: Uuid) -> QueryKey {
        stores().with("detail").with(id)
    }

    pub fn my_store() -> QueryKey {
        QueryKey::new("my-store")
    }

    pub fn chats() -> QueryKey {
        QueryKey::new("chats")
    }

    pub fn profile() -> QueryKey {
        QueryKey::new("profile")
    }

    pub fn notifications() -> QueryKey {
        QueryKey::new("notifications")
    }

    pub fn counties() -> QueryKey {
        QueryKey::new("counties")
    }

    pub fn sub_counties(county_id: i64) -> QueryKey {
        counties().with(county_id).with("sub-counties")
    }

    pub fn wards(sub_county_id: i64) -> QueryKey {
        QueryKey::new("wards").with(sub_county_id)
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Value>>>;

enum Entry {
    Ready(Value),
    Pending(SharedFetch),
}

#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, or the result of `fetch`. `fetch` is only
    /// called when nothing is cached or in flight for the key. Failures are
    /// not cached.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let pending = {
            let mut entries = self.entries.lock().await;
            match entries.get(&key) {
                Some(Entry::Ready(value)) => return decode(value.clone()),
                Some(Entry::Pending(shared)) => shared.clone(),
                None => {
                    debug!("cache miss {}", key);
                    let fut = fetch();
                    let value: BoxFuture<'static, Result<Value>> = Box::pin(async move {
                        let value = fut.await?;
                        Ok(serde_json::to_value(value)?)
                    });
                    let shared = value.shared();
                    entries.insert(key.clone(), Entry::Pending(shared.clone()));
                    shared
                }
            }
        };

        let result = pending.clone().await;

        let mut entries = self.entries.lock().await;
        // An invalidate may have dropped or replaced this fetch meanwhile.
        let still_ours = matches!(entries.get(&key), Some(Entry::Pending(p)) if p.ptr_eq(&pending));
        if still_ours {
            match &result {
                Ok(value) => {
                    entries.insert(key, Entry::Ready(value.clone()));
                }
                Err(_) => {
                    entries.remove(&key);
                }
            }
        }
        drop(entries);

        decode(result?)
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many went.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!("invalidated {} cache entries under {}", dropped, prefix);
        }
        dropped
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        matches!(self.entries.lock().await.get(key), Some(Entry::Ready(_)))
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}
