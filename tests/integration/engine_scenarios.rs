use std::sync::Arc;
use std::time::Duration;

use ion_dashboard::aggregate::{compute_epic_progress, distribute_workload_hours, group_by_component, summarize_epic};
use ion_dashboard::jira::api::JiraFixtureApi;
use ion_dashboard::jira::source::{BatchPolicy, JiraSource};
use ion_dashboard::model::{Issue, StrategicObjective};
use ion_dashboard::rollup::{global_average, EpicProgressByKey};
use ion_dashboard::DashboardError;
use test_support::{init_tracing, jira_fixture, JiraIssue};

fn source(fixture: serde_json::Value) -> JiraSource {
  init_tracing();
  JiraSource::new(
    Arc::new(JiraFixtureApi::from_value(&fixture)),
    BatchPolicy { batch_size: 1, delay: Duration::ZERO },
  )
}

#[test]
fn epic_with_two_of_four_done_is_half_complete() {
  let src = source(jira_fixture(
    vec![
      JiraIssue::new("E-1", "Epic", "indeterminate"),
      JiraIssue::new("E-2", "Story", "done").parent("E-1"),
      JiraIssue::new("E-3", "Task", "done").parent("E-1"),
      JiraIssue::new("E-4", "Bug", "indeterminate").parent("E-1"),
      JiraIssue::new("E-5", "Story", "new").parent("E-1"),
    ],
    &[],
  ));

  let detail = src.fetch_epic_with_children("E-1").unwrap();
  let majors: Vec<&Issue> = detail.major_children().into_iter().map(|c| &c.issue).collect();
  assert_eq!(compute_epic_progress(majors), 50);
  assert_eq!(summarize_epic(&detail, 2024).progress, 50);
}

#[test]
fn manual_override_and_epic_progress_average_to_sixty() {
  let src = source(jira_fixture(
    vec![
      JiraIssue::new("A-1", "Epic", "indeterminate"),
      JiraIssue::new("A-2", "Story", "done").parent("A-1"),
      JiraIssue::new("A-3", "Story", "done").parent("A-1"),
      JiraIssue::new("A-4", "Story", "new").parent("A-1"),
      JiraIssue::new("A-5", "Story", "new").parent("A-1"),
      JiraIssue::new("A-6", "Story", "new").parent("A-1"),
    ],
    &[],
  ));

  let epic = summarize_epic(&src.fetch_epic_with_children("A-1").unwrap(), 2024);
  assert_eq!(epic.progress, 40);

  let progress: EpicProgressByKey = [(epic.key.clone(), epic.progress)].into_iter().collect();
  let objectives = vec![
    StrategicObjective { id: "manual".into(), title: "Manual".into(), manual_override: Some(80), ..Default::default() },
    StrategicObjective { id: "epic".into(), title: "Epic".into(), epic_keys: vec!["A-1".into()], ..Default::default() },
  ];
  assert_eq!(global_average(&objectives, &progress), 60);
}

#[test]
fn partial_batch_failure_returns_survivors() {
  let src = source(jira_fixture(vec![JiraIssue::new("Z-1", "Epic", "new")], &[("X-1", 404), ("Y-1", 503)]));
  let epics = src.fetch_epics_by_keys(&["X-1".into(), "Y-1".into(), "Z-1".into()]).unwrap();
  assert_eq!(epics.iter().map(|e| e.key.as_str()).collect::<Vec<_>>(), vec!["Z-1"]);
}

#[test]
fn total_batch_failure_carries_first_error() {
  let src = source(jira_fixture(vec![], &[("X-1", 404), ("Y-1", 503)]));
  let err = src.fetch_epics_by_keys(&["X-1".into(), "Y-1".into()]).unwrap_err();
  assert_eq!(err, DashboardError::NotFound { key: "X-1".into() });
}

#[test]
fn multi_component_issue_splits_hours_but_counts_fully() {
  let src = source(jira_fixture(
    vec![
      JiraIssue::new("C-1", "Epic", "indeterminate"),
      JiraIssue::new("C-2", "Story", "done").parent("C-1").components(&["A", "B"]).spent(36_000),
    ],
    &[],
  ));

  let detail = src.fetch_epic_with_children("C-1").unwrap();
  let child = &detail.children[0].issue;

  let hours = distribute_workload_hours([child]);
  assert_eq!(hours["A"], 5.0);
  assert_eq!(hours["B"], 5.0);

  let counts = group_by_component([child]);
  assert_eq!(counts["A"].done, 1);
  assert_eq!(counts["B"].done, 1);
}

#[test]
fn epic_time_is_recomputed_from_children() {
  let src = source(jira_fixture(
    vec![
      JiraIssue::new("T-1", "Epic", "indeterminate").aggregate(60),
      JiraIssue::new("T-2", "Story", "done").parent("T-1").spent(1800).aggregate(5400),
      JiraIssue::new("T-3", "Sub-task", "done").parent("T-2").spent(3600),
      JiraIssue::new("T-4", "Task", "new").parent("T-1").spent(900),
    ],
    &[],
  ));

  let detail = src.fetch_epic_with_children("T-1").unwrap();
  assert_eq!(detail.epic.aggregate_time_spent_seconds, Some(6300));
  assert_eq!(detail.children[0].subtasks.len(), 1);
}

#[test]
fn cancelled_status_counts_alongside_its_category() {
  let src = source(jira_fixture(
    vec![
      JiraIssue::new("K-1", "Epic", "indeterminate"),
      JiraIssue::new("K-2", "Story", "done").parent("K-1").status_name("Won't Do (Cancelled)"),
    ],
    &[],
  ));
  let summary = summarize_epic(&src.fetch_epic_with_children("K-1").unwrap(), 2024);
  assert_eq!(summary.counts.done, 1);
  assert_eq!(summary.counts.cancelled, 1);
  assert_eq!(summary.progress, 100);
}
