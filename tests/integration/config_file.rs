use predicates::prelude::*;
use serial_test::serial;
use test_support::{dashboard_cmd, fixture_path, tempdir, with_env, EnvGuard};

const CONFIG: &str = r#"
okr_epics = ["ION-1"]
extra_epics = ["ION-10"]

[batch]
size = 2
delay_ms = 0
"#;

#[test]
fn configured_epics_are_used_when_none_are_passed() {
  let store = tempdir();
  let config = store.path().join("team.toml");
  std::fs::write(&config, CONFIG).unwrap();

  let out = dashboard_cmd(store.path(), &fixture_path("jira_ion.json"))
    .arg("--config")
    .arg(&config)
    .args(["report"])
    .output()
    .unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(v["okr_epics"], serde_json::json!(["ION-1"]));
  assert_eq!(v["extra_epics"], serde_json::json!(["ION-10"]));
}

#[test]
fn default_config_file_in_working_directory_is_picked_up() {
  let store = tempdir();
  std::fs::write(store.path().join("ion-dashboard.toml"), "default_project = \"ION\"\n").unwrap();

  dashboard_cmd(store.path(), &fixture_path("jira_ion.json"))
    .args(["report"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"ION-10\""));
}

#[test]
fn explicit_config_that_does_not_exist_is_misconfigured() {
  let store = tempdir();
  dashboard_cmd(store.path(), &fixture_path("jira_ion.json"))
    .args(["--config", "missing.toml", "report"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn invalid_toml_is_misconfigured() {
  let store = tempdir();
  std::fs::write(store.path().join("ion-dashboard.toml"), "okr_epics = \"ION-1\"\n").unwrap();
  dashboard_cmd(store.path(), &fixture_path("jira_ion.json"))
    .args(["report"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("ion-dashboard.toml"));
}

#[test]
#[serial]
fn environment_credentials_resolve_in_process() {
  let _clear = EnvGuard::unset_many(&test_support::JIRA_ENV_VARS);
  let _env = with_env(&[
    ("JIRA_BASE_URL", "https://jira.example.com/"),
    ("JIRA_EMAIL", "bot@example.com"),
    ("JIRA_API_TOKEN", "secret"),
  ]);

  let cfg = ion_dashboard::config::AppConfig::load(None, &Default::default()).unwrap();
  let creds = cfg.credentials.unwrap();
  assert_eq!(creds.base_url, "https://jira.example.com");
  assert!(matches!(creds.auth, ion_dashboard::jira::api::JiraAuth::Basic { .. }));
}
