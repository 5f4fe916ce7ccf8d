// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Install the tracing subscriber for the binary
// role: observability/logging
// inputs: RUST_LOG (EnvFilter syntax)
// outputs: Human-readable log lines on stderr
// invariants: Never writes to stdout; a second init is a no-op
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn,ion_dashboard=info";

pub fn filter_from_env() -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter_from_env())
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}
