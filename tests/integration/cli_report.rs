use predicates::prelude::*;
use test_support::{dashboard_cmd, fixture_path, tempdir};

const NOW: &str = "2025-01-15T00:00:00Z";

fn report_json(args: &[&str]) -> serde_json::Value {
  let store = tempdir();
  let out = dashboard_cmd(store.path(), &fixture_path("jira_ion.json"))
    .args(["--now-override", NOW, "report"])
    .args(args)
    .output()
    .unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  serde_json::from_slice(&out.stdout).unwrap()
}

fn epic<'a>(report: &'a serde_json::Value, key: &str) -> &'a serde_json::Value {
  report["epics"]
    .as_array()
    .unwrap()
    .iter()
    .find(|e| e["key"] == key)
    .unwrap_or_else(|| panic!("epic {} missing from report", key))
}

#[test]
fn report_by_keys_aggregates_and_records_failures() {
  let v = report_json(&["--epic", "ION-1", "--epic", "ION-10", "--extra-epic", "ION-404"]);

  assert_eq!(v["generated_at"], "2025-01-15T00:00:00Z");
  // busiest recent year wins when --year is absent
  assert_eq!(v["year"], 2024);
  assert_eq!(v["okr_epics"], serde_json::json!(["ION-1", "ION-10"]));
  assert_eq!(v["extra_epics"], serde_json::json!(["ION-404"]));
  assert_eq!(v["epics"].as_array().unwrap().len(), 2);
  assert_eq!(v["failures"][0]["key"], "ION-404");

  let checkout = epic(&v, "ION-1");
  assert_eq!(checkout["progress"], 50);
  assert_eq!(checkout["major_children"], 4);
  assert_eq!(checkout["subtasks"], 1);
  assert_eq!(checkout["total_hours"], 5.0);
  // Jira reported 100 seconds; recomputed as ION-2's 3h aggregate plus ION-3's 1h
  assert_eq!(checkout["aggregate_hours"], 4.0);
  assert_eq!(checkout["time"]["spent_hours"], 5.0);
  assert_eq!(checkout["time"]["estimate_hours"], 16.0);
  assert_eq!(checkout["time"]["percent_of_estimate"], 31);
  assert_eq!(checkout["workload_hours"]["General"], 2.0);
  assert_eq!(checkout["workload_hours"]["Payments"], 1.0);
  assert_eq!(checkout["workload_hours"]["Web"], 2.0);
  assert_eq!(checkout["fix_versions"], serde_json::json!(["2024.2"]));

  insta::assert_json_snapshot!(checkout["counts"], @r###"
  {
    "cancelled": 1,
    "done": 2,
    "todo": 1,
    "wip": 1
  }
  "###);
  insta::assert_json_snapshot!(checkout["quarters"], @r###"
  {
    "Q1": 1,
    "Q2": 1,
    "Q3": 0,
    "Q4": 0
  }
  "###);
  insta::assert_json_snapshot!(checkout["components"], @r###"
  {
    "General": {
      "cancelled": 1,
      "done": 1,
      "todo": 1,
      "wip": 0
    },
    "Payments": {
      "cancelled": 0,
      "done": 1,
      "todo": 0,
      "wip": 0
    },
    "Web": {
      "cancelled": 0,
      "done": 1,
      "todo": 0,
      "wip": 1
    }
  }
  "###);

  let search = epic(&v, "ION-10");
  assert_eq!(search["progress"], 100);
  assert_eq!(search["aggregate_hours"], 0.5);
  assert_eq!(search["quarters"]["Q3"], 1);
  assert_eq!(search["assignees"]["Ana"]["done"], 1);
}

#[test]
fn explicit_year_selects_buckets() {
  let v = report_json(&["--epic", "ION-1", "--year", "2023"]);
  assert_eq!(v["year"], 2023);
  assert_eq!(epic(&v, "ION-1")["quarters"]["Q1"], 0);
}

#[test]
fn project_report_lists_open_epics_newest_first() {
  let v = report_json(&["--project", "ION"]);
  assert_eq!(v["okr_epics"], serde_json::json!(["ION-10", "ION-1"]));
  assert!(v["extra_epics"].as_array().unwrap().is_empty());
}

#[test]
fn project_report_with_any_status_includes_done_epics() {
  let v = report_json(&["--project", "ION", "--status", "*"]);
  assert_eq!(v["okr_epics"], serde_json::json!(["ION-10", "ION-1", "ION-20"]));
}

#[test]
fn report_writes_to_out_directory() {
  let store = tempdir();
  let out_dir = store.path().join("reports");
  dashboard_cmd(store.path(), &fixture_path("jira_ion.json"))
    .args(["--now-override", NOW, "report", "--epic", "ION-10", "--year", "2024", "--out"])
    .arg(format!("{}/", out_dir.display()))
    .assert()
    .success()
    .stdout(predicate::str::contains("report-2024.json"));

  let written: serde_json::Value =
    serde_json::from_slice(&std::fs::read(out_dir.join("report-2024.json")).unwrap()).unwrap();
  assert_eq!(written["epics"][0]["key"], "ION-10");
}

#[test]
fn epics_command_lists_records_without_children() {
  let store = tempdir();
  let out = dashboard_cmd(store.path(), &fixture_path("jira_ion.json"))
    .args(["epics", "--epic", "ION-10", "--epic", "ION-404", "--epic", "ION-1"])
    .output()
    .unwrap();
  assert!(out.status.success());
  let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  let keys: Vec<&str> = v.as_array().unwrap().iter().map(|e| e["key"].as_str().unwrap()).collect();
  assert_eq!(keys, vec!["ION-10", "ION-1"]);
}

#[test]
fn shared_cache_serves_later_runs_until_cleared() {
  let store = tempdir();
  let fixture_dir = tempdir();
  let fixture = fixture_dir.path().join("jira.json");
  std::fs::copy(fixture_path("jira_ion.json"), &fixture).unwrap();

  dashboard_cmd(store.path(), &fixture)
    .args(["--now-override", NOW, "report", "--epic", "ION-10"])
    .assert()
    .success();

  // Upstream goes dark: every call now fails.
  std::fs::write(&fixture, r#"{"issues": [], "failures": {"*": 503}}"#).unwrap();

  dashboard_cmd(store.path(), &fixture)
    .args(["--now-override", NOW, "report", "--epic", "ION-10"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Search relevance"));

  dashboard_cmd(store.path(), &fixture)
    .args(["--now-override", NOW, "report", "--epic", "ION-10", "--force-refresh"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("could not load data from Jira"));

  dashboard_cmd(store.path(), &fixture)
    .args(["cache", "clear"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"removed\": 1"));
}
