// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the strict data model (issues, epic trees, objectives, assessments, report output) shared by every layer
// role: model/types
// outputs: Serializable structs with stable field names; optional fields stay optional end to end
// invariants:
// - "done" is derived only from StatusCategory::Done
// - cancellation is a separate heuristic on the status name, never a fourth category
// - time fields are whole seconds >= 0; missing time_spent is 0
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Jira's three-valued completion tag, orthogonal to the status display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
  #[default]
  New,
  Indeterminate,
  Done,
}

impl StatusCategory {
  /// Map a Jira `statusCategory.key`; unknown keys (e.g. "undefined") count as new.
  pub fn from_key(key: &str) -> Self {
    match key.to_ascii_lowercase().as_str() {
      "done" => StatusCategory::Done,
      "indeterminate" => StatusCategory::Indeterminate,
      _ => StatusCategory::New,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Status {
  pub name: String,
  pub category: StatusCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IssueType {
  pub name: String,
  pub is_subtask: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Issue {
  pub key: String,
  pub summary: String,
  pub status: Status,
  pub issue_type: IssueType,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assignee: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resolved: Option<String>,
  #[serde(default)]
  pub time_spent_seconds: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub aggregate_time_spent_seconds: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub original_estimate_seconds: Option<u64>,
  #[serde(default)]
  pub components: Vec<String>,
  #[serde(default)]
  pub fix_versions: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent_key: Option<String>,
}

impl Issue {
  pub fn is_done(&self) -> bool {
    self.status.category == StatusCategory::Done
  }

  /// Name-based heuristic; independent of the status category.
  pub fn is_cancelled(&self) -> bool {
    self.status.name.to_lowercase().contains("cancel")
  }

  pub fn is_epic(&self) -> bool {
    self.issue_type.name.eq_ignore_ascii_case("epic")
  }

  pub fn hours_spent(&self) -> f64 {
    self.time_spent_seconds as f64 / 3600.0
  }

  /// Resolution date, falling back to the last update.
  pub fn completion_timestamp(&self) -> Option<&str> {
    self.resolved.as_deref().or(self.updated.as_deref())
  }
}

/// A major child of an epic together with its subtasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildIssue {
  #[serde(flatten)]
  pub issue: Issue,
  #[serde(default)]
  pub subtasks: Vec<Issue>,
}

/// One epic with its two-level hierarchy, as returned by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpicDetail {
  pub epic: Issue,
  pub children: Vec<ChildIssue>,
}

impl EpicDetail {
  /// Children that count toward completion (subtasks excluded).
  pub fn major_children(&self) -> Vec<&ChildIssue> {
    self.children.iter().filter(|c| !c.issue.issue_type.is_subtask).collect()
  }

  /// Epic, major children and their subtasks, flattened.
  pub fn all_issues(&self) -> Vec<&Issue> {
    let mut out = vec![&self.epic];
    for child in &self.children {
      out.push(&child.issue);
      out.extend(child.subtasks.iter());
    }
    out
  }
}

/// User-defined grouping of epics representing a macro business goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StrategicObjective {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub epic_keys: Vec<String>,
  #[serde(default)]
  pub manual_override: Option<u8>,
  #[serde(default)]
  pub exclude_from_calculation: bool,
  #[serde(default)]
  pub team_ids: Vec<String>,
}

/// Per-issue user annotation persisted in `assessment_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AssessmentRecord {
  pub issue_key: String,
  #[serde(default)]
  pub approved: bool,
  /// `None` means "use the computed value".
  #[serde(default)]
  pub manual_progress: Option<u8>,
  #[serde(default)]
  pub extra: bool,
  #[serde(default)]
  pub notes: String,
  #[serde(default)]
  pub images: Vec<String>,
}

/// Manually entered key result persisted in `manual_okrs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ManualKeyResult {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub objective_id: Option<String>,
  pub current: f64,
  pub target: f64,
  #[serde(default)]
  pub unit: Option<String>,
}

// --- Aggregated outputs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusCounts {
  pub done: u32,
  pub wip: u32,
  pub todo: u32,
  pub cancelled: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TimeRollup {
  pub spent_hours: f64,
  pub estimate_hours: f64,
  pub percent_of_estimate: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuarterBuckets {
  #[serde(rename = "Q1")]
  pub q1: u32,
  #[serde(rename = "Q2")]
  pub q2: u32,
  #[serde(rename = "Q3")]
  pub q3: u32,
  #[serde(rename = "Q4")]
  pub q4: u32,
}

impl QuarterBuckets {
  pub fn total(&self) -> u32 {
    self.q1 + self.q2 + self.q3 + self.q4
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpicSummary {
  pub key: String,
  pub summary: String,
  pub status: Status,
  pub progress: u8,
  pub major_children: usize,
  pub subtasks: usize,
  pub counts: StatusCounts,
  pub time: TimeRollup,
  /// Epic-level aggregate after recomputation from its children, one decimal.
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub aggregate_hours: Option<f64>,
  pub total_hours: f64,
  pub quarters: QuarterBuckets,
  pub components: BTreeMap<String, StatusCounts>,
  pub assignees: BTreeMap<String, StatusCounts>,
  pub workload_hours: BTreeMap<String, f64>,
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub fix_versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpicFailure {
  pub key: String,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveProgress {
  pub id: String,
  pub title: String,
  pub epic_keys: Vec<String>,
  pub progress: u8,
  pub manual: bool,
  pub excluded: bool,
  /// Shared ownership across teams; presentation-only caveat.
  pub needs_review: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyResultProgress {
  pub id: String,
  pub title: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub objective_id: Option<String>,
  pub current: f64,
  pub target: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit: Option<String>,
  pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessedIssue {
  pub key: String,
  pub summary: String,
  pub epic_key: String,
  pub baseline_progress: u8,
  pub final_progress: u8,
  pub approved: bool,
  pub extra: bool,
  #[serde(skip_serializing_if = "String::is_empty", default)]
  pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AssessmentSummary {
  pub issues: Vec<AssessedIssue>,
  pub approved_count: usize,
  pub extra_count: usize,
  pub average_final_progress: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
  pub generated_at: String,
  pub year: i32,
  pub okr_epics: Vec<String>,
  pub extra_epics: Vec<String>,
  pub epics: Vec<EpicSummary>,
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub failures: Vec<EpicFailure>,
  pub objectives: Vec<ObjectiveProgress>,
  pub global_average: u8,
  pub key_results: Vec<KeyResultProgress>,
  pub assessment: AssessmentSummary,
}
