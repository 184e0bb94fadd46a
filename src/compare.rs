// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Put our results rows next to a published results table for the projects both contain
// role: stage/cross-check
// inputs: Our results CSV, the authors' results CSV
// outputs: Combined CSV: source,project,<our columns>; one `ours` row then one `authors` row per common project
// side_effects: Writes the combined CSV only when at least one project is shared
// invariants:
// - column names are compared lowercased with runs of spaces, `_` and `-` collapsed to one space
// - project keys are compared trimmed and lowercased; empty and `nan` keys are dropped
// - projects are emitted in sorted order; the first row per project wins on each side
// - authors' cells for columns we do not have are not emitted; our columns they lack stay empty
// errors: Missing input files are PipelineError::Config; CSV/IO errors propagate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::report::ResultsTable;
use crate::util::ensure_dir;

pub const OURS: &str = "your_file";
pub const AUTHORS: &str = "author_file";

static RE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").expect("static regex"));

pub fn normalize_column(name: &str) -> String {
  RE_SEPARATORS.replace_all(&name.trim().to_lowercase(), " ").into_owned()
}

pub fn normalize_project(name: &str) -> Option<String> {
  let key = name.trim().to_lowercase();
  if key.is_empty() || key == "nan" {
    None
  } else {
    Some(key)
  }
}

/// One results table keyed by normalized project, cells keyed by normalized column.
#[derive(Debug, Default)]
struct Keyed {
  columns: Vec<String>,
  rows: BTreeMap<String, BTreeMap<String, String>>,
}

impl Keyed {
  fn from_table(table: &ResultsTable) -> Self {
    let columns: Vec<String> = table.headers().iter().map(|h| normalize_column(h)).collect();
    let mut rows = BTreeMap::new();
    let Some(p) = columns.iter().position(|c| c == "project") else {
      return Keyed { columns, rows };
    };

    for row in table.rows() {
      let Some(key) = row.get(p).and_then(|v| normalize_project(v)) else {
        continue;
      };
      rows.entry(key).or_insert_with(|| {
        columns
          .iter()
          .cloned()
          .zip(row.iter().cloned())
          .collect::<BTreeMap<String, String>>()
      });
    }

    Keyed { columns, rows }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedTable {
  pub headers: Vec<String>,
  pub rows: Vec<Vec<String>>,
}

impl CombinedTable {
  pub fn projects(&self) -> usize {
    self.rows.len() / 2
  }
}

/// Interleave rows of both tables for the projects they share.
pub fn combine(ours: &ResultsTable, authors: &ResultsTable) -> CombinedTable {
  let ours = Keyed::from_table(ours);
  let authors = Keyed::from_table(authors);

  let mut seen = BTreeSet::new();
  let data_columns: Vec<String> = ours
    .columns
    .iter()
    .filter(|c| c.as_str() != "project" && seen.insert(c.as_str()))
    .cloned()
    .collect();

  let mut headers = vec!["source".to_string(), "project".to_string()];
  headers.extend(data_columns.iter().cloned());

  let mut rows = Vec::new();
  for (project, mine) in &ours.rows {
    let Some(theirs) = authors.rows.get(project) else {
      continue;
    };
    for (source, cells) in [(OURS, mine), (AUTHORS, theirs)] {
      let mut row = vec![source.to_string(), project.clone()];
      row.extend(data_columns.iter().map(|c| cells.get(c).cloned().unwrap_or_default()));
      rows.push(row);
    }
  }

  CombinedTable { headers, rows }
}

/// Load both files and write the combined table to `out`. Returns the number of shared projects.
pub fn compare_results(ours: &Path, authors: &Path, out: &Path) -> Result<usize> {
  for input in [ours, authors] {
    if !input.exists() {
      return Err(PipelineError::Config(format!("results file not found: {}", input.display())));
    }
  }

  let combined = combine(&ResultsTable::load(ours)?, &ResultsTable::load(authors)?);
  if combined.rows.is_empty() {
    warn!(ours = %ours.display(), authors = %authors.display(), "no common projects found between files");
    return Ok(0);
  }

  if let Some(parent) = out.parent() {
    ensure_dir(parent)?;
  }
  let mut writer = csv::Writer::from_path(out)?;
  writer.write_record(&combined.headers)?;
  for row in &combined.rows {
    writer.write_record(row)?;
  }
  writer.flush()?;

  info!(projects = combined.projects(), out = %out.display(), "comparison results saved");
  Ok(combined.projects())
}
