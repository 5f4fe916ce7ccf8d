// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Namespace for the Jira data source (transport backends, JSON mapping, fetch orchestration)
// role: jira/namespace
// outputs: Public submodules and the StatusFilter used by project-wide epic queries
// invariants: Each backend isolates external integration; only `mapping` sees raw JSON shapes
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod api;
pub mod mapping;
pub mod source;

use serde::{Deserialize, Serialize};

/// Which epics a project-wide query returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StatusFilter {
  /// Everything whose status category is not done.
  #[default]
  NotDone,
  /// Only the named statuses (case-insensitive).
  Named(Vec<String>),
  Any,
}

impl StatusFilter {
  pub fn from_names(names: &[String]) -> Self {
    let names: Vec<String> = names.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    if names.is_empty() {
      StatusFilter::NotDone
    } else if names.iter().any(|n| n == "*") {
      StatusFilter::Any
    } else {
      StatusFilter::Named(names)
    }
  }

  /// JQL clause, or None when no filtering applies.
  pub fn jql(&self) -> Option<String> {
    match self {
      StatusFilter::NotDone => Some("statusCategory != Done".to_string()),
      StatusFilter::Named(names) => {
        let quoted: Vec<String> = names.iter().map(|n| format!("\"{}\"", n.replace('"', "\\\""))).collect();
        Some(format!("status in ({})", quoted.join(", ")))
      }
      StatusFilter::Any => None,
    }
  }

  /// Stable string used in cache keys.
  pub fn describe(&self) -> String {
    match self {
      StatusFilter::NotDone => "not-done".to_string(),
      StatusFilter::Named(names) => {
        let mut sorted = names.clone();
        sorted.sort();
        format!("status={}", sorted.join("|"))
      }
      StatusFilter::Any => "any".to_string(),
    }
  }

  pub fn matches(&self, issue: &crate::model::Issue) -> bool {
    match self {
      StatusFilter::NotDone => !issue.is_done(),
      StatusFilter::Named(names) => names.iter().any(|n| n.eq_ignore_ascii_case(&issue.status.name)),
      StatusFilter::Any => true,
    }
  }
}
