// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Injectable application state (config, clock, document store, tiered cache, Jira backend) passed to every operation
// role: orchestration/context
// inputs: AppConfig; optional pre-built parts for tests
// outputs: CachedJiraSource instances bound to the shared cache
// invariants:
// - one TieredCache per context, shared by every source it hands out
// - the Jira backend is built lazily, so store-only commands never require credentials
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::sync::Arc;

use crate::cache::{Clock, DocumentCache, FixedClock, MemoryCache, SystemClock, TieredCache};
use crate::config::AppConfig;
use crate::error::Result;
use crate::jira::api::{build_api, JiraApi};
use crate::jira::source::{CachedJiraSource, JiraSource};
use crate::store::{DocumentStore, FileDocumentStore};

pub struct AppContext {
  pub config: AppConfig,
  pub clock: Arc<dyn Clock>,
  pub store: Arc<dyn DocumentStore>,
  pub cache: Arc<TieredCache>,
  api: Option<Arc<dyn JiraApi>>,
}

impl AppContext {
  /// Production wiring: file store under `store_dir`, system (or pinned) clock.
  pub fn new(config: AppConfig) -> Self {
    let clock: Arc<dyn Clock> = match config.now_override {
      Some(now) => Arc::new(FixedClock::new(now)),
      None => Arc::new(SystemClock),
    };
    let store: Arc<dyn DocumentStore> = Arc::new(FileDocumentStore::new(&config.store_dir));
    Self::with_parts(config, clock, store, None)
  }

  pub fn with_parts(
    config: AppConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn DocumentStore>,
    api: Option<Arc<dyn JiraApi>>,
  ) -> Self {
    let cache = Arc::new(TieredCache::new(
      MemoryCache::new(config.local_ttl, clock.clone()),
      Some(DocumentCache::new(config.shared_ttl, clock.clone(), store.clone())),
    ));
    Self { config, clock, store, cache, api }
  }

  fn api(&self, force_refresh: bool) -> Result<Arc<dyn JiraApi>> {
    match &self.api {
      Some(api) => Ok(api.clone()),
      None => Ok(Arc::from(build_api(
        self.config.credentials.as_ref(),
        self.config.proxy_ttl,
        self.clock.clone(),
        force_refresh,
      )?)),
    }
  }

  pub fn source(&self, force_refresh: bool) -> Result<CachedJiraSource> {
    let source = JiraSource::new(self.api(force_refresh)?, self.config.batch.clone());
    Ok(CachedJiraSource::new(source, self.cache.clone(), force_refresh))
  }
}
