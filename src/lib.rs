// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Library root for the Jira epic aggregation and OKR rollup engine
// role: crate/root
// outputs: Public modules used by the binary and integration tests
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod aggregate;
pub mod assessment;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod ext;
pub mod jira;
pub mod logging;
pub mod model;
pub mod render;
pub mod rollup;
pub mod store;
pub mod util;

pub use error::{DashboardError, Result};
