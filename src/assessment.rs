// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Per-issue assessments: binary baseline progress, manual overrides, validated partial updates, summary rows
// role: aggregation/assessment
// inputs: Loaded EpicDetail trees; AssessmentRecord documents keyed by issue key; AssessmentUpdate from the CLI
// outputs: AssessmentSummary; validated AssessmentRecord ready to persist
// invariants:
// - baseline is 100 when the issue's category is done, else 0 (never the epic ratio)
// - manual progress, when set, replaces the baseline; clearing it restores the baseline
// - at most MAX_ASSESSMENT_IMAGES images per record
// errors: InvalidInput for progress > 100 or too many images
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;

use crate::error::{DashboardError, Result};
use crate::model::{AssessedIssue, AssessmentRecord, AssessmentSummary, EpicDetail, Issue};
use crate::util::round_percent;

pub const MAX_ASSESSMENT_IMAGES: usize = 5;

pub fn baseline_progress(issue: &Issue) -> u8 {
  if issue.is_done() {
    100
  } else {
    0
  }
}

pub fn final_progress(issue: &Issue, record: Option<&AssessmentRecord>) -> u8 {
  record
    .and_then(|r| r.manual_progress)
    .unwrap_or_else(|| baseline_progress(issue))
}

pub fn validate_record(record: &AssessmentRecord) -> Result<()> {
  if let Some(p) = record.manual_progress {
    if p > 100 {
      return Err(DashboardError::InvalidInput(format!("manual progress {} is above 100", p)));
    }
  }
  if record.images.len() > MAX_ASSESSMENT_IMAGES {
    return Err(DashboardError::InvalidInput(format!(
      "{} images attached to {}; at most {} allowed",
      record.images.len(),
      record.issue_key,
      MAX_ASSESSMENT_IMAGES
    )));
  }
  Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressUpdate {
  #[default]
  Keep,
  Clear,
  Set(u8),
}

/// Partial update; untouched fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct AssessmentUpdate {
  pub approved: Option<bool>,
  pub progress: ProgressUpdate,
  pub extra: Option<bool>,
  pub notes: Option<String>,
  /// Appended to the stored images.
  pub images: Vec<String>,
}

impl AssessmentUpdate {
  pub fn apply(self, issue_key: &str, existing: Option<AssessmentRecord>) -> Result<AssessmentRecord> {
    let mut record = existing.unwrap_or_else(|| AssessmentRecord { issue_key: issue_key.to_string(), ..AssessmentRecord::default() });
    record.issue_key = issue_key.to_string();

    if let Some(approved) = self.approved {
      record.approved = approved;
    }
    match self.progress {
      ProgressUpdate::Keep => {}
      ProgressUpdate::Clear => record.manual_progress = None,
      ProgressUpdate::Set(p) => record.manual_progress = Some(p),
    }
    if let Some(extra) = self.extra {
      record.extra = extra;
    }
    if let Some(notes) = self.notes {
      record.notes = notes;
    }
    record.images.extend(self.images);

    validate_record(&record)?;
    Ok(record)
  }
}

/// One row per major child of the loaded epics, in epic then child order.
pub fn summarize_assessments(details: &[EpicDetail], records: &HashMap<String, AssessmentRecord>) -> AssessmentSummary {
  let mut issues = Vec::new();

  for detail in details {
    for child in detail.major_children() {
      let record = records.get(&child.issue.key);
      issues.push(AssessedIssue {
        key: child.issue.key.clone(),
        summary: child.issue.summary.clone(),
        epic_key: detail.epic.key.clone(),
        baseline_progress: baseline_progress(&child.issue),
        final_progress: final_progress(&child.issue, record),
        approved: record.map(|r| r.approved).unwrap_or(false),
        extra: record.map(|r| r.extra).unwrap_or(false),
        notes: record.map(|r| r.notes.clone()).unwrap_or_default(),
      });
    }
  }

  let average_final_progress = if issues.is_empty() {
    0
  } else {
    round_percent(issues.iter().map(|i| i.final_progress as f64).sum::<f64>() / issues.len() as f64)
  };

  AssessmentSummary {
    approved_count: issues.iter().filter(|i| i.approved).count(),
    extra_count: issues.iter().filter(|i| i.extra).count(),
    average_final_progress,
    issues,
  }
}
