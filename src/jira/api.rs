// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Jira transport seam: credential model, REST backend (ureq), fixture backend, proxy-side response cache
// role: jira/api
// inputs: JiraCredentials; env ION_TEST_JIRA_JSON / ION_TEST_JIRA_FIXTURE for the fixture backend
// outputs: Raw issue JSON and search responses ({"issues": [...]}) as serde_json::Value
// side_effects: Network calls to the configured Jira base URL
// invariants:
// - Non-2xx statuses are classified via DashboardError::from_status; transport failures are Unavailable
// - Search results are fully paginated before returning
// - The proxy cache stores successful responses only
// errors: Propagated to the data source; never swallowed here
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use serde_json::json;
use tracing::debug;

use crate::cache::{get_or_fetch, CacheKey, Clock, MemoryCache};
use crate::error::{DashboardError, Result};
use crate::ext::serde_json::JsonFetch;
use crate::jira::mapping::ISSUE_FIELDS;
use crate::jira::StatusFilter;
use crate::util::parse_jira_timestamp;

const PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JiraAuth {
  Basic { email: String, api_token: String },
  Bearer(String),
}

impl JiraAuth {
  fn header_value(&self) -> String {
    match self {
      JiraAuth::Basic { email, api_token } => {
        let raw = format!("{}:{}", email, api_token);
        format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
      }
      JiraAuth::Bearer(token) => format!("Bearer {}", token),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraCredentials {
  pub base_url: String,
  pub auth: JiraAuth,
}

// --- Trait seam for the Jira REST API ---
pub trait JiraApi: Send + Sync {
  fn get_issue_json(&self, key: &str) -> Result<serde_json::Value>;
  /// Issues whose parent is the epic (subtasks are filtered later).
  fn search_children_json(&self, epic_key: &str) -> Result<serde_json::Value>;
  /// One round trip for all subtasks of the given parents (`parent in (...)`).
  fn search_subtasks_json(&self, parent_keys: &[String]) -> Result<serde_json::Value>;
  /// Epics of a project, newest first.
  fn search_project_epics_json(&self, project: &str, filter: &StatusFilter) -> Result<serde_json::Value>;
}

// --- Proxy-side response cache ---
// Mirrors the backend proxy's 30 minute cache in front of the REST calls.
// A forced refresh skips the lookup but still stores the fresh response.
pub struct JiraCachedApi {
  inner: Box<dyn JiraApi>,
  responses: MemoryCache,
  force_refresh: bool,
}

impl JiraCachedApi {
  pub fn new(inner: Box<dyn JiraApi>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
    Self { inner, responses: MemoryCache::new(ttl, clock), force_refresh: false }
  }

  pub fn force_refresh(mut self, force_refresh: bool) -> Self {
    self.force_refresh = force_refresh;
    self
  }
}

impl JiraApi for JiraCachedApi {
  fn get_issue_json(&self, key: &str) -> Result<serde_json::Value> {
    let ck = CacheKey::new("issue", &[key.to_string()]);
    get_or_fetch(&self.responses, &ck, self.force_refresh, || self.inner.get_issue_json(key))
  }

  fn search_children_json(&self, epic_key: &str) -> Result<serde_json::Value> {
    let ck = CacheKey::new("children", &[epic_key.to_string()]);
    get_or_fetch(&self.responses, &ck, self.force_refresh, || self.inner.search_children_json(epic_key))
  }

  fn search_subtasks_json(&self, parent_keys: &[String]) -> Result<serde_json::Value> {
    let ck = CacheKey::new("subtasks", parent_keys);
    get_or_fetch(&self.responses, &ck, self.force_refresh, || self.inner.search_subtasks_json(parent_keys))
  }

  fn search_project_epics_json(&self, project: &str, filter: &StatusFilter) -> Result<serde_json::Value> {
    let ck = CacheKey::new("project_epics", &[project.to_string(), filter.describe()]);
    get_or_fetch(&self.responses, &ck, self.force_refresh, || self.inner.search_project_epics_json(project, filter))
  }
}

pub struct JiraHttpApi {
  credentials: JiraCredentials,
  agent: ureq::Agent,
}

impl JiraHttpApi {
  pub fn new(credentials: JiraCredentials) -> Self {
    let agent: ureq::Agent = ureq::Agent::config_builder()
      .http_status_as_error(false)
      .timeout_global(Some(Duration::from_secs(30)))
      .build()
      .into();
    Self { credentials, agent }
  }

  fn get_json(&self, path: &str, query: &[(&str, String)], subject: &str) -> Result<serde_json::Value> {
    let url = format!("{}{}", self.credentials.base_url.trim_end_matches('/'), path);
    debug!(%url, subject, "jira request");

    let mut req = self
      .agent
      .get(&url)
      .header("Accept", "application/json")
      .header("User-Agent", "ion-dashboard")
      .header("Authorization", &self.credentials.auth.header_value());

    for (k, v) in query {
      req = req.query(*k, v.as_str());
    }

    let mut resp = req
      .call()
      .map_err(|e| DashboardError::Unavailable(format!("{}: {}", subject, e)))?;

    let status = resp.status().as_u16();
    if !(200..300).contains(&status) {
      return Err(DashboardError::from_status(status, subject));
    }

    resp
      .body_mut()
      .read_json::<serde_json::Value>()
      .map_err(|e| DashboardError::Unavailable(format!("{}: invalid JSON: {}", subject, e)))
  }

  /// Run a JQL search, following `startAt` pagination until `total` is reached.
  fn search(&self, jql: &str, subject: &str) -> Result<serde_json::Value> {
    let mut issues: Vec<serde_json::Value> = Vec::new();
    let mut start_at = 0u64;

    loop {
      let page = self.get_json(
        "/rest/api/2/search",
        &[
          ("jql", jql.to_string()),
          ("fields", ISSUE_FIELDS.to_string()),
          ("startAt", start_at.to_string()),
          ("maxResults", PAGE_SIZE.to_string()),
        ],
        subject,
      )?;

      let batch = page.fetch("issues").to::<Vec<serde_json::Value>>().unwrap_or_default();
      let total = page.fetch("total").to::<u64>().unwrap_or(0);
      let n = batch.len() as u64;
      issues.extend(batch);
      start_at += n;

      if n == 0 || start_at >= total {
        break;
      }
    }

    let total = issues.len();
    Ok(json!({ "issues": issues, "total": total }))
  }
}

impl JiraApi for JiraHttpApi {
  fn get_issue_json(&self, key: &str) -> Result<serde_json::Value> {
    let path = format!("/rest/api/2/issue/{}", key);
    self.get_json(&path, &[("fields", ISSUE_FIELDS.to_string())], key)
  }

  fn search_children_json(&self, epic_key: &str) -> Result<serde_json::Value> {
    let jql = format!("parent = {} ORDER BY created ASC", epic_key);
    self.search(&jql, epic_key)
  }

  fn search_subtasks_json(&self, parent_keys: &[String]) -> Result<serde_json::Value> {
    if parent_keys.is_empty() {
      return Ok(json!({ "issues": [], "total": 0 }));
    }
    let jql = format!("parent in ({}) ORDER BY created ASC", parent_keys.join(", "));
    self.search(&jql, "subtasks")
  }

  fn search_project_epics_json(&self, project: &str, filter: &StatusFilter) -> Result<serde_json::Value> {
    let mut jql = format!("project = {} AND issuetype = Epic", project);
    if let Some(clause) = filter.jql() {
      jql.push_str(" AND ");
      jql.push_str(&clause);
    }
    jql.push_str(" ORDER BY created DESC");
    self.search(&jql, project)
  }
}

/// In-process Jira backed by a JSON fixture.
///
/// Shape: `{"issues": [<raw Jira issue>...], "failures": {"ION-9": 404, "*": 401}}`.
/// A failure entry for `"*"` applies to every call.
pub struct JiraFixtureApi {
  issues: Vec<serde_json::Value>,
  failures: HashMap<String, u16>,
  calls: AtomicUsize,
}

impl JiraFixtureApi {
  pub fn from_value(v: &serde_json::Value) -> Self {
    Self {
      issues: v.fetch("issues").to::<Vec<serde_json::Value>>().unwrap_or_default(),
      failures: v.fetch("failures").to::<HashMap<String, u16>>().unwrap_or_default(),
      calls: AtomicUsize::new(0),
    }
  }

  /// Build from `ION_TEST_JIRA_JSON` (inline) or `ION_TEST_JIRA_FIXTURE` (file path).
  pub fn from_env() -> Result<Option<Self>> {
    if let Ok(s) = std::env::var("ION_TEST_JIRA_JSON") {
      let v: serde_json::Value = serde_json::from_str(&s)
        .map_err(|e| DashboardError::Misconfigured(format!("ION_TEST_JIRA_JSON: {}", e)))?;
      return Ok(Some(Self::from_value(&v)));
    }

    if let Ok(path) = std::env::var("ION_TEST_JIRA_FIXTURE") {
      let raw = std::fs::read_to_string(&path)
        .map_err(|e| DashboardError::Misconfigured(format!("ION_TEST_JIRA_FIXTURE {}: {}", path, e)))?;
      let v: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| DashboardError::Misconfigured(format!("ION_TEST_JIRA_FIXTURE {}: {}", path, e)))?;
      return Ok(Some(Self::from_value(&v)));
    }

    Ok(None)
  }

  /// Number of backend calls served so far.
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn check(&self, subject: &str) -> Result<()> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let status = self.failures.get(subject).or_else(|| self.failures.get("*"));
    match status {
      Some(s) => Err(DashboardError::from_status(*s, subject)),
      None => Ok(()),
    }
  }

  fn parent_of(v: &serde_json::Value) -> Option<String> {
    v.fetch("fields.parent.key").to::<String>()
  }

  fn search_result(issues: Vec<serde_json::Value>) -> serde_json::Value {
    let total = issues.len();
    json!({ "issues": issues, "total": total })
  }
}

impl JiraApi for JiraFixtureApi {
  fn get_issue_json(&self, key: &str) -> Result<serde_json::Value> {
    self.check(key)?;
    self
      .issues
      .iter()
      .find(|v| v.fetch("key").to::<String>().as_deref() == Some(key))
      .cloned()
      .ok_or_else(|| DashboardError::NotFound { key: key.to_string() })
  }

  fn search_children_json(&self, epic_key: &str) -> Result<serde_json::Value> {
    self.check(&format!("children:{}", epic_key))?;
    let children = self
      .issues
      .iter()
      .filter(|v| Self::parent_of(v).as_deref() == Some(epic_key))
      .cloned()
      .collect();
    Ok(Self::search_result(children))
  }

  fn search_subtasks_json(&self, parent_keys: &[String]) -> Result<serde_json::Value> {
    self.check("subtasks")?;
    let subtasks = self
      .issues
      .iter()
      .filter(|v| Self::parent_of(v).map(|p| parent_keys.contains(&p)).unwrap_or(false))
      .cloned()
      .collect();
    Ok(Self::search_result(subtasks))
  }

  fn search_project_epics_json(&self, project: &str, filter: &StatusFilter) -> Result<serde_json::Value> {
    self.check(project)?;
    let prefix = format!("{}-", project);

    let mut epics: Vec<serde_json::Value> = self
      .issues
      .iter()
      .filter(|v| v.fetch("key").to::<String>().map(|k| k.starts_with(&prefix)).unwrap_or(false))
      .filter(|v| {
        crate::jira::mapping::issue_from_json(v)
          .map(|issue| issue.is_epic() && filter.matches(&issue))
          .unwrap_or(false)
      })
      .cloned()
      .collect();

    epics.sort_by_key(|v| {
      std::cmp::Reverse(
        v.fetch("fields.created")
          .to::<String>()
          .and_then(|s| parse_jira_timestamp(&s))
          .map(|dt| dt.timestamp()),
      )
    });

    Ok(Self::search_result(epics))
  }
}

impl<T: JiraApi + ?Sized> JiraApi for Arc<T> {
  fn get_issue_json(&self, key: &str) -> Result<serde_json::Value> {
    (**self).get_issue_json(key)
  }

  fn search_children_json(&self, epic_key: &str) -> Result<serde_json::Value> {
    (**self).search_children_json(epic_key)
  }

  fn search_subtasks_json(&self, parent_keys: &[String]) -> Result<serde_json::Value> {
    (**self).search_subtasks_json(parent_keys)
  }

  fn search_project_epics_json(&self, project: &str, filter: &StatusFilter) -> Result<serde_json::Value> {
    (**self).search_project_epics_json(project, filter)
  }
}

/// Select the backend: fixture when requested through the environment, otherwise HTTP
/// behind the proxy cache. Missing credentials fail before any network call.
pub fn build_api(
  credentials: Option<&JiraCredentials>,
  proxy_ttl: Duration,
  clock: Arc<dyn Clock>,
  force_refresh: bool,
) -> Result<Box<dyn JiraApi>> {
  if let Some(fixture) = JiraFixtureApi::from_env()? {
    debug!("using fixture Jira backend");
    return Ok(Box::new(fixture));
  }

  let Some(creds) = credentials else {
    return Err(DashboardError::Misconfigured(
      "no Jira credentials (set JIRA_BASE_URL and JIRA_EMAIL/JIRA_API_TOKEN or JIRA_BEARER_TOKEN)".into(),
    ));
  };

  let inner: Box<dyn JiraApi> = Box::new(JiraHttpApi::new(creds.clone()));
  Ok(Box::new(JiraCachedApi::new(inner, proxy_ttl, clock).force_refresh(force_refresh)))
}
