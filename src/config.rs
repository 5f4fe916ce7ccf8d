// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Resolve the effective configuration from CLI overrides, environment and an optional TOML file
// role: config/resolution
// inputs: ion-dashboard.toml (or --config), JIRA_* environment variables, CLI overrides
// outputs: AppConfig (credentials, epic selection defaults, batching policy, cache TTLs, store location)
// invariants:
// - precedence: CLI > environment > file > defaults
// - blank values count as absent
// - incomplete credentials resolve to None; the Jira layer reports Misconfigured before any call
// errors: Misconfigured for unreadable/invalid files, bad base URLs, malformed configured keys
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::cache::{LOCAL_TTL, PROXY_TTL, SHARED_TTL};
use crate::error::{DashboardError, Result};
use crate::jira::api::{JiraAuth, JiraCredentials};
use crate::jira::source::BatchPolicy;
use crate::util::parse_now;

pub const DEFAULT_CONFIG_FILE: &str = "ion-dashboard.toml";
pub const DEFAULT_STORE_DIR: &str = ".ion-dashboard";

static ISSUE_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*-[0-9]+$").expect("valid issue key regex"));
static PROJECT_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("valid project key regex"));

pub fn is_issue_key(s: &str) -> bool {
  ISSUE_KEY_RE.is_match(s)
}

pub fn is_project_key(s: &str) -> bool {
  PROJECT_KEY_RE.is_match(s)
}

/// Trim, drop blanks, and reject anything that is not an issue key.
pub fn validate_issue_keys(keys: &[String], origin: &str) -> Result<Vec<String>> {
  let mut out = Vec::new();
  for key in keys.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
    if !is_issue_key(key) {
      return Err(DashboardError::Misconfigured(format!("{}: '{}' is not an issue key", origin, key)));
    }
    out.push(key.to_string());
  }
  Ok(out)
}

pub fn validate_project_key(key: &str, origin: &str) -> Result<String> {
  let key = key.trim();
  if !is_project_key(key) {
    return Err(DashboardError::Misconfigured(format!("{}: '{}' is not a project key", origin, key)));
  }
  Ok(key.to_string())
}

// --- TOML file ---

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JiraSection {
  pub base_url: Option<String>,
  pub email: Option<String>,
  pub api_token: Option<String>,
  pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSection {
  pub size: Option<usize>,
  pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
  pub local_ttl_secs: Option<u64>,
  pub shared_ttl_secs: Option<u64>,
  pub proxy_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
  pub jira: JiraSection,
  pub okr_epics: Vec<String>,
  pub extra_epics: Vec<String>,
  pub default_project: Option<String>,
  pub store_dir: Option<PathBuf>,
  pub batch: BatchSection,
  pub cache: CacheSection,
}

impl FileConfig {
  pub fn parse(raw: &str, origin: &Path) -> Result<Self> {
    toml::from_str(raw).map_err(|e| DashboardError::Misconfigured(format!("{}: {}", origin.display(), e)))
  }

  /// An explicit path must exist; the default file is optional.
  pub fn load(explicit: Option<&Path>) -> Result<Self> {
    let (path, required) = match explicit {
      Some(p) => (p.to_path_buf(), true),
      None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    match std::fs::read_to_string(&path) {
      Ok(raw) => {
        debug!(path = %path.display(), "loaded config file");
        Self::parse(&raw, &path)
      }
      Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
      Err(e) => Err(DashboardError::Misconfigured(format!("{}: {}", path.display(), e))),
    }
  }
}

// --- Environment ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
  pub base_url: Option<String>,
  pub email: Option<String>,
  pub api_token: Option<String>,
  pub bearer_token: Option<String>,
}

impl EnvConfig {
  pub fn from_env() -> Self {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
    Self {
      base_url: non_blank(lookup("JIRA_BASE_URL")),
      email: non_blank(lookup("JIRA_EMAIL")),
      api_token: non_blank(lookup("JIRA_API_TOKEN")),
      bearer_token: non_blank(lookup("JIRA_BEARER_TOKEN")),
    }
  }
}

fn non_blank(v: Option<String>) -> Option<String> {
  v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// --- CLI overrides ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
  pub store_dir: Option<PathBuf>,
  pub now_override: Option<String>,
}

// --- Effective configuration ---

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  pub credentials: Option<JiraCredentials>,
  pub okr_epics: Vec<String>,
  pub extra_epics: Vec<String>,
  pub default_project: Option<String>,
  pub store_dir: PathBuf,
  pub batch: BatchPolicy,
  pub local_ttl: Duration,
  pub shared_ttl: Duration,
  pub proxy_ttl: Duration,
  pub now_override: Option<DateTime<Utc>>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      credentials: None,
      okr_epics: Vec::new(),
      extra_epics: Vec::new(),
      default_project: None,
      store_dir: PathBuf::from(DEFAULT_STORE_DIR),
      batch: BatchPolicy::default(),
      local_ttl: LOCAL_TTL,
      shared_ttl: SHARED_TTL,
      proxy_ttl: PROXY_TTL,
      now_override: None,
    }
  }
}

fn resolve_credentials(file: &JiraSection, env: &EnvConfig) -> Result<Option<JiraCredentials>> {
  let pick = |e: &Option<String>, f: &Option<String>| e.clone().or_else(|| non_blank(f.clone()));

  let Some(base_url) = pick(&env.base_url, &file.base_url) else {
    return Ok(None);
  };
  if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
    return Err(DashboardError::Misconfigured(format!("Jira base URL must be http(s): {}", base_url)));
  }
  let base_url = base_url.trim_end_matches('/').to_string();

  let auth = if let Some(token) = pick(&env.bearer_token, &file.bearer_token) {
    JiraAuth::Bearer(token)
  } else {
    match (pick(&env.email, &file.email), pick(&env.api_token, &file.api_token)) {
      (Some(email), Some(api_token)) => JiraAuth::Basic { email, api_token },
      _ => return Ok(None),
    }
  };

  Ok(Some(JiraCredentials { base_url, auth }))
}

impl AppConfig {
  pub fn resolve(file: FileConfig, env: &EnvConfig, overrides: &ConfigOverrides) -> Result<Self> {
    let defaults = AppConfig::default();

    let credentials = resolve_credentials(&file.jira, env)?;
    let okr_epics = validate_issue_keys(&file.okr_epics, "okr_epics")?;
    let extra_epics = validate_issue_keys(&file.extra_epics, "extra_epics")?;
    let default_project = match non_blank(file.default_project) {
      Some(p) => Some(validate_project_key(&p, "default_project")?),
      None => None,
    };

    let batch = BatchPolicy {
      batch_size: file.batch.size.unwrap_or(defaults.batch.batch_size).max(1),
      delay: file.batch.delay_ms.map(Duration::from_millis).unwrap_or(defaults.batch.delay),
    };

    let now_override = match overrides.now_override.as_deref() {
      Some(raw) => Some(
        parse_now(Some(raw)).ok_or_else(|| DashboardError::Misconfigured(format!("unparseable --now-override '{}'", raw)))?,
      ),
      None => None,
    };

    Ok(Self {
      credentials,
      okr_epics,
      extra_epics,
      default_project,
      store_dir: overrides.store_dir.clone().or(file.store_dir).unwrap_or(defaults.store_dir),
      batch,
      local_ttl: file.cache.local_ttl_secs.map(Duration::from_secs).unwrap_or(defaults.local_ttl),
      shared_ttl: file.cache.shared_ttl_secs.map(Duration::from_secs).unwrap_or(defaults.shared_ttl),
      proxy_ttl: file.cache.proxy_ttl_secs.map(Duration::from_secs).unwrap_or(defaults.proxy_ttl),
      now_override,
    })
  }

  /// Load the file, read the environment and apply CLI overrides.
  pub fn load(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
    let file = FileConfig::load(config_path)?;
    Self::resolve(file, &EnvConfig::from_env(), overrides)
  }
}
