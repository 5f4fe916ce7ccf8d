// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Jira data source operations (epic tree, epics by keys, epics by project) with throttled batching and read-through caching
// role: jira/source
// inputs: JiraApi backend, BatchPolicy, TieredCache, force-refresh flag
// outputs: EpicDetail trees and Issue lists; BatchOutcome with per-key failures
// side_effects: Network calls through the backend; sleeps between batches
// invariants:
// - epic, then children, then subtasks: strictly sequential per epic; subtasks in one round trip
// - epic-level aggregate time is recomputed from children once, here, before caching
// - batch: per-key isolation; only when every key fails is the first (request-order) error returned
// - batches of `batch_size` keys, `delay` between batches; results correlated by key, not completion order
// errors: Propagated unmodified to callers
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, TieredCache};
use crate::error::{DashboardError, Result};
use crate::jira::api::JiraApi;
use crate::jira::mapping::{issue_from_json, issues_from_search};
use crate::jira::StatusFilter;
use crate::model::{ChildIssue, EpicDetail, Issue};
use crate::util::parse_jira_timestamp;

/// Throttling applied to multi-epic fetches to stay under Jira's rate limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPolicy {
  pub batch_size: usize,
  pub delay: Duration,
}

impl Default for BatchPolicy {
  fn default() -> Self {
    Self { batch_size: 1, delay: Duration::from_millis(750) }
  }
}

#[derive(Debug)]
pub struct BatchOutcome<T> {
  /// Successful results in request order.
  pub loaded: Vec<(String, T)>,
  pub failures: Vec<(String, DashboardError)>,
}

impl<T> BatchOutcome<T> {
  pub fn values(self) -> Vec<T> {
    self.loaded.into_iter().map(|(_, v)| v).collect()
  }
}

/// Run `fetch` for every key in throttled batches and keep every outcome.
///
/// Keys inside one batch run concurrently; `policy.delay` separates batches.
pub fn collect_batched<T, F>(keys: &[String], policy: &BatchPolicy, fetch: F) -> BatchOutcome<T>
where
  T: Send,
  F: Fn(&str) -> Result<T> + Sync,
{
  let size = policy.batch_size.max(1);
  let mut results: Vec<(String, Result<T>)> = Vec::with_capacity(keys.len());

  for (i, chunk) in keys.chunks(size).enumerate() {
    if i > 0 && !policy.delay.is_zero() {
      debug!(delay_ms = policy.delay.as_millis() as u64, "throttling between batches");
      std::thread::sleep(policy.delay);
    }
    let batch: Vec<(String, Result<T>)> = chunk.par_iter().map(|k| (k.clone(), fetch(k))).collect();
    results.extend(batch);
  }

  let mut loaded = Vec::new();
  let mut failures = Vec::new();
  for (key, res) in results {
    match res {
      Ok(v) => loaded.push((key, v)),
      Err(e) => {
        warn!(key = %key, error = %e, "batch item failed");
        failures.push((key, e));
      }
    }
  }

  BatchOutcome { loaded, failures }
}

/// Like [`collect_batched`], but a batch where every key failed returns the first
/// failure in request order.
pub fn fetch_batched<T, F>(keys: &[String], policy: &BatchPolicy, fetch: F) -> Result<BatchOutcome<T>>
where
  T: Send,
  F: Fn(&str) -> Result<T> + Sync,
{
  let mut outcome = collect_batched(keys, policy, fetch);
  if outcome.loaded.is_empty() && !outcome.failures.is_empty() {
    return Err(outcome.failures.remove(0).1);
  }
  Ok(outcome)
}

/// Overwrite the epic's aggregate time with the sum over its children.
///
/// Each child contributes its aggregate when present, else its own time. Epics without
/// children keep the value Jira reported.
pub fn correct_epic_time(detail: &mut EpicDetail) {
  if detail.children.is_empty() {
    return;
  }
  let total: u64 = detail
    .children
    .iter()
    .map(|c| c.issue.aggregate_time_spent_seconds.unwrap_or(c.issue.time_spent_seconds))
    .sum();
  detail.epic.aggregate_time_spent_seconds = Some(total);
}

pub struct JiraSource {
  api: Arc<dyn JiraApi>,
  policy: BatchPolicy,
}

impl JiraSource {
  pub fn new(api: Arc<dyn JiraApi>, policy: BatchPolicy) -> Self {
    Self { api, policy }
  }

  pub fn policy(&self) -> &BatchPolicy {
    &self.policy
  }

  fn fetch_issue(&self, key: &str) -> Result<Issue> {
    let raw = self.api.get_issue_json(key)?;
    issue_from_json(&raw).ok_or_else(|| DashboardError::Unavailable(format!("malformed issue record for {}", key)))
  }

  pub fn fetch_epic_with_children(&self, epic_key: &str) -> Result<EpicDetail> {
    let epic = self.fetch_issue(epic_key)?;

    let majors: Vec<Issue> = issues_from_search(&self.api.search_children_json(epic_key)?)
      .into_iter()
      .filter(|i| !i.issue_type.is_subtask)
      .collect();

    let mut by_parent: HashMap<String, Vec<Issue>> = HashMap::new();
    if !majors.is_empty() {
      let parent_keys: Vec<String> = majors.iter().map(|c| c.key.clone()).collect();
      for sub in issues_from_search(&self.api.search_subtasks_json(&parent_keys)?) {
        if let Some(parent) = sub.parent_key.clone() {
          by_parent.entry(parent).or_default().push(sub);
        }
      }
    }

    let children = majors
      .into_iter()
      .map(|issue| {
        let subtasks = by_parent.remove(&issue.key).unwrap_or_default();
        ChildIssue { issue, subtasks }
      })
      .collect();

    let mut detail = EpicDetail { epic, children };
    correct_epic_time(&mut detail);

    debug!(epic = epic_key, children = detail.children.len(), "epic loaded");
    Ok(detail)
  }

  pub fn fetch_epics_by_keys(&self, keys: &[String]) -> Result<Vec<Issue>> {
    Ok(fetch_batched(keys, &self.policy, |k| self.fetch_issue(k))?.values())
  }

  pub fn fetch_epics_by_project(&self, project: &str, filter: &StatusFilter) -> Result<Vec<Issue>> {
    let mut epics = issues_from_search(&self.api.search_project_epics_json(project, filter)?);
    epics.sort_by_key(|e| {
      std::cmp::Reverse(e.created.as_deref().and_then(parse_jira_timestamp).map(|dt| dt.timestamp()))
    });
    Ok(epics)
  }

  pub fn fetch_epic_details(&self, keys: &[String]) -> Result<BatchOutcome<EpicDetail>> {
    fetch_batched(keys, &self.policy, |k| self.fetch_epic_with_children(k))
  }
}

/// Data source operations behind the read-through cache.
pub struct CachedJiraSource {
  source: JiraSource,
  cache: Arc<TieredCache>,
  force_refresh: bool,
}

impl CachedJiraSource {
  pub fn new(source: JiraSource, cache: Arc<TieredCache>, force_refresh: bool) -> Self {
    Self { source, cache, force_refresh }
  }

  pub fn fetch_epic_with_children(&self, epic_key: &str) -> Result<EpicDetail> {
    let key = CacheKey::new("fetchEpicWithChildren", &[epic_key.to_string()]);
    self
      .cache
      .get_or_fetch(&key, self.force_refresh, || self.source.fetch_epic_with_children(epic_key))
  }

  pub fn fetch_epics_by_keys(&self, keys: &[String]) -> Result<Vec<Issue>> {
    let key = CacheKey::new("fetchEpicsByKeys", keys);
    self
      .cache
      .get_or_fetch(&key, self.force_refresh, || self.source.fetch_epics_by_keys(keys))
  }

  pub fn fetch_epics_by_project(&self, project: &str, filter: &StatusFilter) -> Result<Vec<Issue>> {
    let key = CacheKey::new("fetchEpicsByProject", &[project.to_string(), filter.describe()]);
    self
      .cache
      .get_or_fetch(&key, self.force_refresh, || self.source.fetch_epics_by_project(project, filter))
  }

  /// Full trees for many epics; each epic is cached individually.
  pub fn fetch_epic_details(&self, keys: &[String]) -> Result<BatchOutcome<EpicDetail>> {
    info!(epics = keys.len(), batch_size = self.source.policy().batch_size, "loading epics");
    fetch_batched(keys, self.source.policy(), |k| self.fetch_epic_with_children(k))
  }

  /// Best-effort trees for epics referenced outside the selection; never fails as a whole.
  pub fn load_epic_details(&self, keys: &[String]) -> BatchOutcome<EpicDetail> {
    collect_batched(keys, self.source.policy(), |k| self.fetch_epic_with_children(k))
  }
}
