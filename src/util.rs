// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Small shared helpers: percentage rounding, Jira timestamp parsing, "now" override, man page rendering
// role: utilities/helpers
// inputs: Primitives; Jira ISO 8601 strings; clap CommandFactory
// outputs: Rounded integers, parsed DateTimes, troff man page text
// invariants:
// - round_percent clamps to [0, 100] and rounds half away from zero
// - parse_jira_timestamp accepts RFC3339, Jira's "+0000" offsets and bare dates; never panics
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::CommandFactory;

/// Round a percentage to an integer in [0, 100].
pub fn round_percent(value: f64) -> u8 {
  if !value.is_finite() || value <= 0.0 {
    return 0;
  }
  value.round().min(100.0) as u8
}

/// Round an hour count to one decimal place for presentation.
pub fn round_hours(hours: f64) -> f64 {
  (hours * 10.0).round() / 10.0
}

pub fn seconds_to_hours(seconds: u64) -> f64 {
  seconds as f64 / 3600.0
}

/// Parse the timestamp shapes Jira emits, keeping the original offset.
///
/// Accepted: `2024-03-15T10:20:30.000+0000`, RFC3339 (`...Z`, `+01:00`), and `2024-03-15`.
pub fn parse_jira_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
  let s = raw.trim();

  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt);
  }
  if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
    return Some(dt);
  }
  if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
    return Some(FixedOffset::east_opt(0)?.from_utc_datetime(&naive));
  }
  if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    let naive = date.and_hms_opt(0, 0, 0)?;
    return Some(FixedOffset::east_opt(0)?.from_utc_datetime(&naive));
  }

  None
}

/// Parse a `--now-override` value (RFC3339 or `YYYY-MM-DDTHH:MM:SS`, read as UTC).
pub fn parse_now(s: Option<&str>) -> Option<DateTime<Utc>> {
  parse_jira_timestamp(s?).map(|dt| dt.with_timezone(&Utc))
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
pub fn render_man_page<T: CommandFactory>() -> anyhow::Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
