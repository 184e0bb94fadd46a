// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for git subprocesses, timestamp parsing, number formatting, output dirs and man page rendering
// role: utilities/helpers
// inputs: Various primitives; timestamp strings; paths; clap CommandFactory
// outputs: UTC instants, formatted numbers, directories ensured, man page text
// side_effects: ensure_dir creates directories; run_git invokes subprocesses
// invariants:
// - parse_instant accepts RFC3339, space-separated offsets and naive UTC forms; never panics
// - format_decimal always prints 10 fractional digits
// errors: run_git surfaces command + stderr as PipelineError::Git
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use clap::CommandFactory;

use crate::error::{PipelineError, Result};

pub fn canonicalize_lossy<P: AsRef<Path>>(p: P) -> String {
  let p = p.as_ref();
  let pb: PathBuf = match std::fs::canonicalize(p) {
    Ok(x) => x,
    Err(_) => match std::env::current_dir() {
      Ok(cwd) => cwd.join(p),
      Err(_) => PathBuf::from(p),
    },
  };
  pb.to_string_lossy().to_string()
}

pub fn run_git(repo: &Path, args: &[String]) -> Result<String> {
  let out = Command::new("git")
    .args(args)
    .current_dir(repo)
    .output()
    .map_err(|e| PipelineError::Git {
      args: args.to_vec(),
      stderr: format!("spawning git: {}", e),
    })?;

  if out.status.success() {
    Ok(String::from_utf8_lossy(&out.stdout).to_string())
  } else {
    Err(PipelineError::Git {
      args: args.to_vec(),
      stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
    })
  }
}

/// Parse a timestamp as written by GitHub, git or pandas into a UTC instant.
///
/// Accepted shapes:
/// - RFC3339 (`2014-05-01T10:00:00Z`, `2014-05-01T10:00:00+02:00`)
/// - space separated with offset (`2014-05-01 10:00:00+00:00`)
/// - naive date-time, interpreted as UTC (`2014-05-01 10:00:00`)
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
  let s = raw.trim();
  if s.is_empty() {
    return None;
  }

  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }

  for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"] {
    if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
      return Some(dt.with_timezone(&Utc));
    }
  }

  for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(naive.and_utc());
    }
  }

  chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}

/// Canonical string form for instants written to CSV.
pub fn format_instant(dt: &DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Fixed ten-decimal rendering used in result tables.
pub fn format_decimal(x: f64) -> String {
  format!("{:.10}", x)
}

/// Canonical numeric form of a cell when it parses as a number; the cell unchanged otherwise.
pub fn coerce_numeric(cell: &str) -> String {
  match cell.trim().parse::<f64>() {
    Ok(v) if v.is_finite() => format!("{}", v),
    _ => cell.to_string(),
  }
}

/// Create `dir` (and parents) when missing and return it.
pub fn ensure_dir(dir: &Path) -> Result<PathBuf> {
  std::fs::create_dir_all(dir)?;
  Ok(dir.to_path_buf())
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> anyhow::Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
