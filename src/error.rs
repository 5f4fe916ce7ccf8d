// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Error taxonomy shared by data source, cache, store and orchestration layers
// role: errors/types
// outputs: DashboardError with HTTP-like classification and user-facing messages
// invariants:
// - 401/403 -> Unauthorized, 404 -> NotFound, any other failure status or transport error -> Unavailable
// - Misconfigured is raised before any network call
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
  #[error("unauthorized: Jira rejected the configured credentials")]
  Unauthorized,

  #[error("issue {key} not found or not accessible")]
  NotFound { key: String },

  #[error("Jira unavailable: {0}")]
  Unavailable(String),

  #[error("misconfigured: {0}")]
  Misconfigured(String),

  #[error("document store: {0}")]
  Store(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
  /// Classify an HTTP status returned by Jira for the given subject (issue key or operation).
  pub fn from_status(status: u16, subject: &str) -> Self {
    match status {
      401 | 403 => DashboardError::Unauthorized,
      404 => DashboardError::NotFound { key: subject.to_string() },
      s => DashboardError::Unavailable(format!("HTTP {} for {}", s, subject)),
    }
  }

  /// Message suitable for an inline error next to the affected panel.
  pub fn user_message(&self) -> String {
    match self {
      DashboardError::Unauthorized | DashboardError::Misconfigured(_) => {
        format!("{}; check configuration", self)
      }
      DashboardError::Unavailable(_) => "could not load data from Jira, try again later".to_string(),
      other => other.to_string(),
    }
  }
}

impl From<std::io::Error> for DashboardError {
  fn from(e: std::io::Error) -> Self {
    DashboardError::Store(e.to_string())
  }
}

impl From<serde_json::Error> for DashboardError {
  fn from(e: serde_json::Error) -> Self {
    DashboardError::Store(e.to_string())
  }
}
