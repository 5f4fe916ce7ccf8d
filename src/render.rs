// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Emit command output as pretty JSON to stdout or to a file/directory given by --out
// role: output/render
// inputs: Any Serialize value; --out target ("-" = stdout); a label for directory targets
// outputs: JSON on stdout, or a file plus a {"file": ...} pointer on stdout
// side_effects: Creates parent directories; writes files
// invariants:
// - stdout carries only JSON; logs go to stderr
// - a directory-like target ("dir/" or existing dir) receives report-<label>.json
// errors: IO/serialization errors with the target path as context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

pub const STDOUT: &str = "-";

/// Where `value` goes for a given `--out`; `None` means stdout.
pub fn resolve_target(out: &str, label: &str) -> Option<PathBuf> {
  if out == STDOUT {
    return None;
  }
  let path = Path::new(out);
  if out.ends_with('/') || path.is_dir() {
    Some(path.join(format!("report-{}.json", label)))
  } else {
    Some(path.to_path_buf())
  }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let mut stdout = std::io::stdout().lock();
  serde_json::to_writer_pretty(&mut stdout, value)?;
  writeln!(stdout)?;
  Ok(())
}

pub fn write_json_file<T: Serialize>(value: &T, path: &Path) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
  }
  let bytes = serde_json::to_vec_pretty(value)?;
  std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
  Ok(())
}

/// Print to stdout, or write the file and print a pointer to it.
pub fn emit<T: Serialize>(value: &T, out: &str, label: &str) -> Result<()> {
  match resolve_target(out, label) {
    None => print_json(value),
    Some(path) => {
      write_json_file(value, &path)?;
      print_json(&serde_json::json!({ "file": path.display().to_string() }))
    }
  }
}
