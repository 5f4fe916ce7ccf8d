// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Read-through caching: deterministic keys, TTL stores (in-memory and document-store backed), tiered get_or_fetch
// role: cache/read-through
// inputs: CacheKey (operation + sorted args), a Clock, JSON-serializable payloads
// outputs: Cached or freshly fetched payloads
// side_effects: DocumentCache reads/writes the `epic_progress_cache` collection
// invariants:
// - an entry with now - fetched_at >= ttl is a MISS
// - force_refresh skips lookup entirely and overwrites after a successful fetch
// - fetch errors propagate and are never cached
// - shared-store failures degrade to MISS / skipped write (logged), never to an error
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{DocumentStore, EPIC_PROGRESS_CACHE};

pub const LOCAL_TTL: Duration = Duration::from_secs(5 * 60);
pub const SHARED_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const PROXY_TTL: Duration = Duration::from_secs(30 * 60);

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock pinned to an instant; `--now-override` and tests.
pub struct FixedClock {
  now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
  pub fn new(now: DateTime<Utc>) -> Self {
    Self { now: Mutex::new(now) }
  }

  pub fn advance(&self, by: chrono::Duration) {
    if let Ok(mut now) = self.now.lock() {
      *now += by;
    }
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.now.lock().map(|n| *n).unwrap_or_else(|_| Utc::now())
  }
}

/// `operation:arg1,arg2` with args sorted, so argument order never splits the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn new(operation: &str, args: &[String]) -> Self {
    let mut sorted = args.to_vec();
    sorted.sort();
    CacheKey(format!("{}:{}", operation, sorted.join(",")))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
  pub key: String,
  pub payload: serde_json::Value,
  pub fetched_at_ms: i64,
}

impl CacheEntry {
  fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
    let age_ms = now.timestamp_millis() - self.fetched_at_ms;
    age_ms < ttl.as_millis() as i64
  }
}

pub trait CacheStore: Send + Sync {
  /// `None` is a MISS: absent or expired.
  fn get(&self, key: &CacheKey) -> Option<serde_json::Value>;
  /// Unconditional overwrite stamped with the current time.
  fn put(&self, key: &CacheKey, payload: serde_json::Value);
}

pub struct MemoryCache {
  ttl: Duration,
  clock: Arc<dyn Clock>,
  entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
  pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
    Self { ttl, clock, entries: Mutex::new(HashMap::new()) }
  }
}

impl CacheStore for MemoryCache {
  fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
    let now = self.clock.now();
    let entries = self.entries.lock().ok()?;
    entries
      .get(key)
      .filter(|e| e.is_fresh(now, self.ttl))
      .map(|e| e.payload.clone())
  }

  fn put(&self, key: &CacheKey, payload: serde_json::Value) {
    let entry = CacheEntry {
      key: key.as_str().to_string(),
      payload,
      fetched_at_ms: self.clock.now().timestamp_millis(),
    };
    if let Ok(mut entries) = self.entries.lock() {
      entries.insert(key.clone(), entry);
    }
  }
}

/// Shared cache persisted in the document store; last write wins.
pub struct DocumentCache {
  ttl: Duration,
  clock: Arc<dyn Clock>,
  store: Arc<dyn DocumentStore>,
}

impl DocumentCache {
  pub fn new(ttl: Duration, clock: Arc<dyn Clock>, store: Arc<dyn DocumentStore>) -> Self {
    Self { ttl, clock, store }
  }
}

impl CacheStore for DocumentCache {
  fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
    let doc = match self.store.get(EPIC_PROGRESS_CACHE, key.as_str()) {
      Ok(doc) => doc?,
      Err(e) => {
        warn!(key = key.as_str(), error = %e, "shared cache read failed");
        return None;
      }
    };

    let entry: CacheEntry = match serde_json::from_value(doc) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(key = key.as_str(), error = %e, "ignoring malformed shared cache entry");
        return None;
      }
    };

    entry.is_fresh(self.clock.now(), self.ttl).then_some(entry.payload)
  }

  fn put(&self, key: &CacheKey, payload: serde_json::Value) {
    let entry = CacheEntry {
      key: key.as_str().to_string(),
      payload,
      fetched_at_ms: self.clock.now().timestamp_millis(),
    };

    let doc = match serde_json::to_value(&entry) {
      Ok(doc) => doc,
      Err(e) => {
        warn!(key = key.as_str(), error = %e, "shared cache entry not serializable");
        return;
      }
    };

    if let Err(e) = self.store.upsert(EPIC_PROGRESS_CACHE, key.as_str(), doc, false) {
      warn!(key = key.as_str(), error = %e, "shared cache write failed");
    }
  }
}

/// Read-through lookup. A payload that no longer deserializes as `T` counts as a MISS.
pub fn get_or_fetch<T, F>(store: &dyn CacheStore, key: &CacheKey, force_refresh: bool, fetch: F) -> Result<T>
where
  T: Serialize + DeserializeOwned,
  F: FnOnce() -> Result<T>,
{
  if !force_refresh {
    if let Some(v) = store.get(key) {
      match serde_json::from_value::<T>(v) {
        Ok(hit) => {
          debug!(key = key.as_str(), "cache hit");
          return Ok(hit);
        }
        Err(e) => warn!(key = key.as_str(), error = %e, "cached payload has unexpected shape"),
      }
    }
  }

  let fresh = fetch()?;

  match serde_json::to_value(&fresh) {
    Ok(v) => store.put(key, v),
    Err(e) => warn!(key = key.as_str(), error = %e, "fetched payload not cacheable"),
  }

  Ok(fresh)
}

/// Local (short TTL) in front of the optional shared (long TTL) cache.
pub struct TieredCache {
  local: MemoryCache,
  shared: Option<DocumentCache>,
}

impl TieredCache {
  pub fn new(local: MemoryCache, shared: Option<DocumentCache>) -> Self {
    Self { local, shared }
  }

  pub fn get_or_fetch<T, F>(&self, key: &CacheKey, force_refresh: bool, fetch: F) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T>,
  {
    get_or_fetch(&self.local, key, force_refresh, || match &self.shared {
      Some(shared) => get_or_fetch(shared, key, force_refresh, fetch),
      None => fetch(),
    })
  }
}
