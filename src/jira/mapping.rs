// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Map raw Jira REST issue JSON into the strict Issue model; the only place loose JSON shapes are tolerated
// role: jira/mapping
// inputs: serde_json::Value issue objects and search responses ({"issues": [...]})
// outputs: Issue values; records without a key are dropped with a warning
// invariants:
// - missing timespent -> 0; missing estimate/aggregate stay None
// - unknown status categories map to New
// - components/fixVersions keep source order, duplicates removed
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use tracing::warn;

use crate::ext::serde_json::JsonFetch;
use crate::model::{Issue, IssueType, Status, StatusCategory};

/// Fields requested from Jira for every issue.
pub const ISSUE_FIELDS: &str = "summary,status,issuetype,assignee,created,updated,resolutiondate,timespent,aggregatetimespent,timeoriginalestimate,components,fixVersions,parent";

/// Convert one Jira issue object. Returns `None` when the record has no key.
pub fn issue_from_json(v: &serde_json::Value) -> Option<Issue> {
  let key = v.fetch("key").to::<String>().filter(|k| !k.trim().is_empty());
  let Some(key) = key else {
    warn!(record = %v, "dropping Jira record without key");
    return None;
  };

  let status = Status {
    name: v.fetch("fields.status.name").to_or_default::<String>(),
    category: v
      .fetch("fields.status.statusCategory.key")
      .to::<String>()
      .map(|k| StatusCategory::from_key(&k))
      .unwrap_or_default(),
  };

  let issue_type = IssueType {
    name: v.fetch("fields.issuetype.name").to_or_default::<String>(),
    is_subtask: v.fetch("fields.issuetype.subtask").to_or_default::<bool>(),
  };

  Some(Issue {
    key,
    summary: v.fetch("fields.summary").to_or_default::<String>(),
    status,
    issue_type,
    assignee: v.fetch("fields.assignee.displayName").to::<String>(),
    created: v.fetch("fields.created").to::<String>(),
    updated: v.fetch("fields.updated").to::<String>(),
    resolved: v.fetch("fields.resolutiondate").to::<String>(),
    time_spent_seconds: v.fetch("fields.timespent").to_or_default::<u64>(),
    aggregate_time_spent_seconds: v.fetch("fields.aggregatetimespent").to::<u64>(),
    original_estimate_seconds: v.fetch("fields.timeoriginalestimate").to::<u64>(),
    components: dedup(v.fetch("fields.components").names("name")),
    fix_versions: dedup(v.fetch("fields.fixVersions").names("name")),
    parent_key: v.fetch("fields.parent.key").to::<String>(),
  })
}

/// Convert a search response (`{"issues": [...]}`) or a bare array.
pub fn issues_from_search(v: &serde_json::Value) -> Vec<Issue> {
  let arr = v
    .fetch("issues")
    .to::<Vec<serde_json::Value>>()
    .or_else(|| v.as_array().cloned())
    .unwrap_or_default();

  arr.iter().filter_map(issue_from_json).collect()
}

fn dedup(names: Vec<String>) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(names.len());
  for n in names {
    if !out.contains(&n) {
      out.push(n);
    }
  }
  out
}
