// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Pure aggregation over fetched epic trees: progress, time rollups, quarter buckets, component/assignee breakdowns
// role: aggregation/engine
// inputs: Issue / ChildIssue / EpicDetail values already in memory
// outputs: Integers, StatusCounts maps, TimeRollup, QuarterBuckets, EpicSummary
// invariants:
// - total functions: empty inputs produce zero-valued aggregates, never panics or errors
// - progress is an integer in [0, 100]; subtasks never enter the completion ratio
// - group_by_component duplicates an issue into every component; distribute_workload_hours splits hours
// - done and cancelled counters are independent (an issue may increment both)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::model::{ChildIssue, EpicDetail, EpicSummary, Issue, QuarterBuckets, StatusCategory, StatusCounts, TimeRollup};
use crate::util::{parse_jira_timestamp, round_hours, round_percent, seconds_to_hours};

pub const GENERAL_COMPONENT: &str = "General";
pub const UNASSIGNED: &str = "Unassigned";

/// Share of done major children, rounded; 0 without children.
pub fn compute_epic_progress<'a, I>(major_children: I) -> u8
where
  I: IntoIterator<Item = &'a Issue>,
{
  let mut total = 0usize;
  let mut done = 0usize;
  for child in major_children {
    total += 1;
    if child.is_done() {
      done += 1;
    }
  }

  if total == 0 {
    return 0;
  }
  round_percent(100.0 * done as f64 / total as f64)
}

/// Spent seconds of one major child including its subtasks.
///
/// Jira's aggregate already includes subtasks, so it replaces the manual sum when the
/// child has subtasks and reports one.
fn child_spent_seconds(child: &ChildIssue) -> u64 {
  match child.issue.aggregate_time_spent_seconds {
    Some(agg) if !child.subtasks.is_empty() => agg,
    _ => child.issue.time_spent_seconds + child.subtasks.iter().map(|s| s.time_spent_seconds).sum::<u64>(),
  }
}

fn child_estimate_seconds(child: &ChildIssue) -> u64 {
  child.issue.original_estimate_seconds.unwrap_or(0)
    + child
      .subtasks
      .iter()
      .map(|s| s.original_estimate_seconds.unwrap_or(0))
      .sum::<u64>()
}

/// Spent vs estimated hours over the epic, its major children and their subtasks.
pub fn compute_time_rollup<'a, I>(epic: &Issue, major_children: I) -> TimeRollup
where
  I: IntoIterator<Item = &'a ChildIssue>,
{
  let mut spent = epic.time_spent_seconds;
  let mut estimate = epic.original_estimate_seconds.unwrap_or(0);

  for child in major_children {
    spent += child_spent_seconds(child);
    estimate += child_estimate_seconds(child);
  }

  let percent_of_estimate = if estimate == 0 {
    0
  } else {
    round_percent(100.0 * spent as f64 / estimate as f64)
  };

  TimeRollup {
    spent_hours: seconds_to_hours(spent),
    estimate_hours: seconds_to_hours(estimate),
    percent_of_estimate,
  }
}

/// The epic's aggregate spent time in hours (one decimal), as corrected at ingestion.
pub fn epic_aggregate_hours(epic: &Issue) -> Option<f64> {
  epic.aggregate_time_spent_seconds.map(|s| round_hours(seconds_to_hours(s)))
}

/// Sum of own time over the epic, every major child and every subtask, one decimal.
pub fn total_hours(detail: &EpicDetail) -> f64 {
  round_hours(detail.all_issues().iter().map(|i| i.hours_spent()).sum())
}

/// Count done issues per calendar quarter of `year`, by resolution date (or last update).
pub fn bucket_by_quarter<'a, I>(issues: I, year: i32) -> QuarterBuckets
where
  I: IntoIterator<Item = &'a Issue>,
{
  let mut buckets = QuarterBuckets::default();

  for issue in issues {
    if !issue.is_done() {
      continue;
    }
    let Some(when) = issue.completion_timestamp().and_then(parse_jira_timestamp) else {
      continue;
    };
    if when.year() != year {
      continue;
    }
    match when.month0() {
      0..=2 => buckets.q1 += 1,
      3..=5 => buckets.q2 += 1,
      6..=8 => buckets.q3 += 1,
      _ => buckets.q4 += 1,
    }
  }

  buckets
}

/// Candidate order used when no year is requested: current, then the two before it.
pub fn candidate_years(current_year: i32) -> [i32; 3] {
  [current_year, current_year - 1, current_year - 2]
}

/// Year with the strictly greatest number of completions; earlier candidates win ties.
pub fn select_best_year(issues: &[&Issue], candidate_years: &[i32]) -> Option<i32> {
  let mut best: Option<(i32, u32)> = None;

  for &year in candidate_years {
    let total = bucket_by_quarter(issues.iter().copied(), year).total();
    match best {
      Some((_, best_total)) if total <= best_total => {}
      _ => best = Some((year, total)),
    }
  }

  best.map(|(year, _)| year)
}

fn count_status(counts: &mut StatusCounts, issue: &Issue) {
  match issue.status.category {
    StatusCategory::Done => counts.done += 1,
    StatusCategory::Indeterminate => counts.wip += 1,
    StatusCategory::New => counts.todo += 1,
  }
  if issue.is_cancelled() {
    counts.cancelled += 1;
  }
}

pub fn count_statuses<'a, I>(issues: I) -> StatusCounts
where
  I: IntoIterator<Item = &'a Issue>,
{
  let mut counts = StatusCounts::default();
  for issue in issues {
    count_status(&mut counts, issue);
  }
  counts
}

/// Status counters per component. An issue counts fully under each of its components;
/// issues without components go to "General".
pub fn group_by_component<'a, I>(issues: I) -> BTreeMap<String, StatusCounts>
where
  I: IntoIterator<Item = &'a Issue>,
{
  let mut groups: BTreeMap<String, StatusCounts> = BTreeMap::new();

  for issue in issues {
    if issue.components.is_empty() {
      count_status(groups.entry(GENERAL_COMPONENT.to_string()).or_default(), issue);
      continue;
    }
    for component in &issue.components {
      count_status(groups.entry(component.clone()).or_default(), issue);
    }
  }

  groups
}

pub fn group_by_assignee<'a, I>(issues: I) -> BTreeMap<String, StatusCounts>
where
  I: IntoIterator<Item = &'a Issue>,
{
  let mut groups: BTreeMap<String, StatusCounts> = BTreeMap::new();
  for issue in issues {
    let name = issue.assignee.clone().unwrap_or_else(|| UNASSIGNED.to_string());
    count_status(groups.entry(name).or_default(), issue);
  }
  groups
}

/// Hours per component; an issue's hours are split evenly across its components.
pub fn distribute_workload_hours<'a, I>(issues: I) -> BTreeMap<String, f64>
where
  I: IntoIterator<Item = &'a Issue>,
{
  let mut hours: BTreeMap<String, f64> = BTreeMap::new();

  for issue in issues {
    let spent = issue.hours_spent();
    if issue.components.is_empty() {
      *hours.entry(GENERAL_COMPONENT.to_string()).or_insert(0.0) += spent;
      continue;
    }
    let share = spent / issue.components.len() as f64;
    for component in &issue.components {
      *hours.entry(component.clone()).or_insert(0.0) += share;
    }
  }

  hours
}

/// Everything the dashboards show for one epic, with `year` selecting the quarter buckets.
pub fn summarize_epic(detail: &EpicDetail, year: i32) -> EpicSummary {
  let majors = detail.major_children();
  let major_issues: Vec<&Issue> = majors.iter().map(|c| &c.issue).collect();

  let time = compute_time_rollup(&detail.epic, majors.iter().copied());
  let workload = distribute_workload_hours(detail.all_issues())
    .into_iter()
    .map(|(k, v)| (k, round_hours(v)))
    .collect();

  EpicSummary {
    key: detail.epic.key.clone(),
    summary: detail.epic.summary.clone(),
    status: detail.epic.status.clone(),
    progress: compute_epic_progress(major_issues.iter().copied()),
    major_children: majors.len(),
    subtasks: majors.iter().map(|c| c.subtasks.len()).sum(),
    counts: count_statuses(major_issues.iter().copied()),
    time: TimeRollup {
      spent_hours: round_hours(time.spent_hours),
      estimate_hours: round_hours(time.estimate_hours),
      percent_of_estimate: time.percent_of_estimate,
    },
    aggregate_hours: epic_aggregate_hours(&detail.epic),
    total_hours: total_hours(detail),
    quarters: bucket_by_quarter(major_issues.iter().copied(), year),
    components: group_by_component(major_issues.iter().copied()),
    assignees: group_by_assignee(major_issues.iter().copied()),
    workload_hours: workload,
    fix_versions: detail.epic.fix_versions.clone(),
  }
}
