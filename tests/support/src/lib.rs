//! test-support: helpers for robust, nextest-friendly ion-dashboard tests.
//!
//! Add as a dev-dependency in your top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support", features = ["serde"] }
//! ```
//!
//! Then in tests:
//! ```rust,ignore
//! use test_support::{dashboard_cmd, fixture_path, tempdir};
//!
//! #[test]
//! fn example() {
//!     let store = tempdir();
//!     dashboard_cmd(store.path(), &fixture_path("jira_ion.json"))
//!         .args(["report", "--epic", "ION-1"])
//!         .assert()
//!         .success();
//! }
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::{env, path::{Path, PathBuf}};

/// Environment variables that would let a test reach a real Jira.
pub const JIRA_ENV_VARS: [&str; 4] = ["JIRA_BASE_URL", "JIRA_EMAIL", "JIRA_API_TOKEN", "JIRA_BEARER_TOKEN"];

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,ion_dashboard=debug"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Return the path to the repository's `tests/fixtures` directory.
///
/// `CARGO_MANIFEST_DIR` here is `tests/support`, so the fixtures live one level up.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("tests"))
        .join("fixtures")
}

pub fn fixture_path<P: AsRef<Path>>(rel_path: P) -> PathBuf {
    fixtures_dir().join(rel_path)
}

/// Read a UTF-8 text fixture into a string.
pub fn read_fixture_text<P: AsRef<Path>>(rel_path: P) -> String {
    let path = fixture_path(rel_path);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
}

/// Deserialize a JSON fixture into `T` (enable `serde` feature).
#[cfg(feature = "serde")]
pub fn read_fixture_json<T, P>(rel_path: P) -> T
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = fixture_path(rel_path);
    let file = std::fs::File::open(&path)
        .unwrap_or_else(|e| panic!("failed to open fixture {}: {e}", path.display()));
    serde_json::from_reader::<_, T>(file)
        .unwrap_or_else(|e| panic!("failed to parse JSON fixture {}: {e}", path.display()))
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Set multiple environment variables for the duration of the returned guard.
pub fn with_env(vars: &[(&str, &str)]) -> EnvGuard {
    EnvGuard::set_many(vars)
}

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
pub fn cmd_bin(bin: &str) -> assert_cmd::Command {
    init_tracing();
    assert_cmd::Command::cargo_bin(bin).expect("binary target not found")
}

/// `ion-dashboard` wired to a fixture Jira and an isolated store.
///
/// Real Jira credentials from the caller's environment are removed, the working
/// directory is the store so no stray `ion-dashboard.toml` is picked up.
pub fn dashboard_cmd(store_dir: &Path, fixture: &Path) -> assert_cmd::Command {
    let mut cmd = bare_dashboard_cmd(store_dir);
    cmd.env("ION_TEST_JIRA_FIXTURE", fixture);
    cmd
}

/// `ion-dashboard` with no Jira backend at all (no fixture, no credentials).
pub fn bare_dashboard_cmd(store_dir: &Path) -> assert_cmd::Command {
    let mut cmd = cmd_bin("ion-dashboard");
    for var in JIRA_ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("ION_TEST_JIRA_JSON")
        .env_remove("ION_TEST_JIRA_FIXTURE")
        .env("RUST_LOG", "warn")
        .current_dir(store_dir)
        .arg("--store-dir")
        .arg(store_dir);
    cmd
}

/// Guard for temporarily setting environment variables.
pub struct EnvGuard {
    prev: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set_many(kv: &[(&str, &str)]) -> Self {
        let mut prev = Vec::with_capacity(kv.len());
        for (k, v) in kv {
            let k_owned = k.to_string();
            prev.push((k_owned.clone(), env::var(k).ok()));
            env::set_var(k, v);
        }
        Self { prev }
    }

    /// Remove variables for the guard's lifetime.
    pub fn unset_many(keys: &[&str]) -> Self {
        let mut prev = Vec::with_capacity(keys.len());
        for k in keys {
            prev.push((k.to_string(), env::var(k).ok()));
            env::remove_var(k);
        }
        Self { prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in self.prev.drain(..) {
            match old {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}

// --- Jira fixture builders (feature = "serde") ---

/// Builder for one raw Jira REST issue record.
#[cfg(feature = "serde")]
#[derive(Debug, Clone)]
pub struct JiraIssue {
    key: String,
    fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(feature = "serde")]
impl JiraIssue {
    /// `category` is a Jira status category key: "new", "indeterminate" or "done".
    pub fn new(key: &str, issue_type: &str, category: &str) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("summary".into(), serde_json::json!(format!("{key} summary")));
        fields.insert(
            "issuetype".into(),
            serde_json::json!({ "name": issue_type, "subtask": issue_type.eq_ignore_ascii_case("sub-task") }),
        );
        fields.insert(
            "status".into(),
            serde_json::json!({ "name": category, "statusCategory": { "key": category } }),
        );
        fields.insert("created".into(), serde_json::json!("2024-01-01T00:00:00.000+0000"));
        Self { key: key.to_string(), fields }
    }

    fn set(mut self, field: &str, value: serde_json::Value) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    pub fn status_name(self, name: &str) -> Self {
        let category = self.fields["status"]["statusCategory"].clone();
        self.set("status", serde_json::json!({ "name": name, "statusCategory": category }))
    }

    pub fn parent(self, key: &str) -> Self {
        self.set("parent", serde_json::json!({ "key": key }))
    }

    pub fn spent(self, seconds: u64) -> Self {
        self.set("timespent", serde_json::json!(seconds))
    }

    pub fn aggregate(self, seconds: u64) -> Self {
        self.set("aggregatetimespent", serde_json::json!(seconds))
    }

    pub fn estimate(self, seconds: u64) -> Self {
        self.set("timeoriginalestimate", serde_json::json!(seconds))
    }

    pub fn resolved(self, ts: &str) -> Self {
        self.set("resolutiondate", serde_json::json!(ts))
    }

    pub fn created(self, ts: &str) -> Self {
        self.set("created", serde_json::json!(ts))
    }

    pub fn assignee(self, name: &str) -> Self {
        self.set("assignee", serde_json::json!({ "displayName": name }))
    }

    pub fn components(self, names: &[&str]) -> Self {
        let list: Vec<serde_json::Value> = names.iter().map(|n| serde_json::json!({ "name": n })).collect();
        self.set("components", serde_json::Value::Array(list))
    }

    pub fn build(self) -> serde_json::Value {
        serde_json::json!({ "key": self.key, "fields": self.fields })
    }
}

/// Fixture document understood by the fixture Jira backend.
#[cfg(feature = "serde")]
pub fn jira_fixture(issues: Vec<JiraIssue>, failures: &[(&str, u16)]) -> serde_json::Value {
    let failures: serde_json::Map<String, serde_json::Value> =
        failures.iter().map(|(k, s)| (k.to_string(), serde_json::json!(s))).collect();
    serde_json::json!({
        "issues": issues.into_iter().map(JiraIssue::build).collect::<Vec<_>>(),
        "failures": failures,
    })
}

/// Write a fixture document into `dir` and return its path.
#[cfg(feature = "serde")]
pub fn write_fixture(dir: &Path, name: &str, fixture: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(fixture).expect("serialize fixture"))
        .unwrap_or_else(|e| panic!("failed to write fixture {}: {e}", path.display()));
    path
}
