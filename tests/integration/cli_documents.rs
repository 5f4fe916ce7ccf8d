use predicates::prelude::*;
use test_support::{dashboard_cmd, fixture_path, tempdir};

fn run_json(store: &std::path::Path, args: &[&str]) -> serde_json::Value {
  let out = dashboard_cmd(store, &fixture_path("jira_ion.json")).args(args).output().unwrap();
  assert!(out.status.success(), "{:?} failed: {}", args, String::from_utf8_lossy(&out.stderr));
  serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn objectives_drive_the_global_average() {
  let store = tempdir();

  run_json(store.path(), &["objective", "put", "--id", "growth", "--title", "Growth", "--manual-progress", "80"]);
  run_json(
    store.path(),
    &["objective", "put", "--id", "checkout", "--title", "Checkout", "--epic", "ION-1", "--epic", "ION-10", "--team", "web", "--team", "payments"],
  );
  run_json(store.path(), &["objective", "put", "--id", "legacy", "--title", "Legacy", "--manual-progress", "0", "--exclude"]);

  let listed = run_json(store.path(), &["objective", "list"]);
  let ids: Vec<&str> = listed.as_array().unwrap().iter().map(|o| o["id"].as_str().unwrap()).collect();
  assert_eq!(ids, vec!["checkout", "growth", "legacy"]);

  let report = run_json(store.path(), &["--now-override", "2025-01-15T00:00:00Z", "report", "--epic", "ION-1", "--epic", "ION-10"]);
  // checkout = mean(50, 100) = 75; global = round((80 + 75) / 2)
  assert_eq!(report["global_average"], 78);

  let checkout = report["objectives"].as_array().unwrap().iter().find(|o| o["id"] == "checkout").unwrap();
  assert_eq!(checkout["progress"], 75);
  assert_eq!(checkout["needs_review"], true);
  assert_eq!(checkout["manual"], false);

  let legacy = report["objectives"].as_array().unwrap().iter().find(|o| o["id"] == "legacy").unwrap();
  assert_eq!(legacy["excluded"], true);
  assert_eq!(legacy["progress"], 0);

  let deleted = run_json(store.path(), &["objective", "delete", "--id", "growth"]);
  assert_eq!(deleted["deleted"], true);
  let deleted_again = run_json(store.path(), &["objective", "delete", "--id", "growth"]);
  assert_eq!(deleted_again["deleted"], false);
}

#[test]
fn assessments_merge_across_invocations() {
  let store = tempdir();

  let first = run_json(store.path(), &["assess", "--issue", "ION-3", "--approved", "--progress", "40", "--notes", "halfway"]);
  assert_eq!(first["manual_progress"], 40);

  let second = run_json(store.path(), &["assess", "--issue", "ION-3", "--extra", "--image", "https://img.example/a.png"]);
  assert_eq!(second["approved"], true);
  assert_eq!(second["extra"], true);
  assert_eq!(second["manual_progress"], 40);
  assert_eq!(second["notes"], "halfway");
  assert_eq!(second["images"].as_array().unwrap().len(), 1);

  let report = run_json(store.path(), &["--now-override", "2025-01-15T00:00:00Z", "report", "--epic", "ION-1"]);
  let assessment = &report["assessment"];
  assert_eq!(assessment["approved_count"], 1);
  assert_eq!(assessment["extra_count"], 1);
  // ION-2 100, ION-3 manual 40, ION-4 100 (done, cancelled), ION-6 0
  assert_eq!(assessment["average_final_progress"], 60);

  let row = assessment["issues"].as_array().unwrap().iter().find(|i| i["key"] == "ION-3").unwrap();
  assert_eq!(row["baseline_progress"], 0);
  assert_eq!(row["final_progress"], 40);

  let cleared = run_json(store.path(), &["assess", "--issue", "ION-3", "--clear-progress"]);
  assert!(cleared["manual_progress"].is_null());
}

#[test]
fn assessment_image_limit_is_enforced() {
  let store = tempdir();
  let mut args = vec!["assess", "--issue", "ION-2"];
  for _ in 0..6 {
    args.extend(["--image", "https://img.example/x.png"]);
  }
  dashboard_cmd(store.path(), &fixture_path("jira_ion.json"))
    .args(&args)
    .assert()
    .code(2)
    .stderr(predicate::str::contains("at most 5"));
}

#[test]
fn key_results_report_progress() {
  let store = tempdir();
  run_json(
    store.path(),
    &["key-result", "put", "--id", "nps", "--title", "NPS", "--current", "30", "--target", "40", "--objective", "growth"],
  );
  run_json(store.path(), &["key-result", "put", "--id", "churn", "--title", "Churn", "--current", "3", "--target", "0"]);

  let listed = run_json(store.path(), &["key-result", "list"]);
  assert_eq!(listed.as_array().unwrap().len(), 2);

  let report = run_json(store.path(), &["--now-override", "2025-01-15T00:00:00Z", "report", "--epic", "ION-10"]);
  let krs = report["key_results"].as_array().unwrap();
  let nps = krs.iter().find(|k| k["id"] == "nps").unwrap();
  assert_eq!(nps["progress"], 75);
  assert_eq!(nps["objective_id"], "growth");
  let churn = krs.iter().find(|k| k["id"] == "churn").unwrap();
  assert_eq!(churn["progress"], 0);
}

#[test]
fn document_commands_do_not_need_jira() {
  let store = tempdir();
  test_support::bare_dashboard_cmd(store.path())
    .args(["objective", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("[]"));
}
