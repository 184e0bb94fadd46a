// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Persist comparison rows into the shared results CSV (upsert by project) or render them as a table
// role: stage/reporter
// inputs: ComparisonResult; results CSV path
// outputs: Results CSV with at most one row per project; printable per-metric table
// side_effects: Rewrites the whole results file on every upsert
// invariants:
// - rows for other projects are written back byte-for-byte
// - an overwritten row stores numeric cells in canonical numeric form; the project key is never rewritten
// - columns the file does not know yet are appended to its header; older rows get empty cells
// errors: CSV/IO errors propagate; concurrent writers are not coordinated
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use tabled::{Table, Tabled};
use tracing::info;

use crate::error::Result;
use crate::metrics::ComparisonResult;
use crate::util::{coerce_numeric, ensure_dir, format_decimal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
  Created,
  Updated,
  Appended,
}

/// In-memory copy of the results CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsTable {
  headers: Vec<String>,
  rows: Vec<Vec<String>>,
}

impl ResultsTable {
  /// Read `path`; a missing file is an empty table.
  pub fn load(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Ok(ResultsTable::default());
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for rec in reader.records() {
      let rec = rec?;
      let mut row: Vec<String> = rec.iter().map(String::from).collect();
      row.resize(headers.len(), String::new());
      rows.push(row);
    }

    Ok(ResultsTable { headers, rows })
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      ensure_dir(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&self.headers)?;
    for row in &self.rows {
      writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
  }

  pub fn headers(&self) -> &[String] {
    &self.headers
  }

  pub fn rows(&self) -> &[Vec<String>] {
    &self.rows
  }

  fn column(&self, name: &str) -> Option<usize> {
    self.headers.iter().position(|h| h == name)
  }

  fn ensure_column(&mut self, name: &str) -> usize {
    if let Some(i) = self.column(name) {
      return i;
    }
    self.headers.push(name.to_string());
    for row in &mut self.rows {
      row.push(String::new());
    }
    self.headers.len() - 1
  }

  pub fn upsert(&mut self, result: &ComparisonResult) -> UpsertAction {
    let created = self.headers.is_empty();
    let names = ComparisonResult::headers();
    let values = result.values();

    let idx: Vec<usize> = names.iter().map(|n| self.ensure_column(n)).collect();
    let p = idx[0];

    if let Some(row) = self.rows.iter_mut().find(|r| r[p] == result.project) {
      // the project cell is the key and keeps its spelling
      for (i, v) in idx.iter().zip(values.iter()).skip(1) {
        row[*i] = coerce_numeric(v);
      }
      return UpsertAction::Updated;
    }

    let mut row = vec![String::new(); self.headers.len()];
    for (i, v) in idx.iter().zip(values.into_iter()) {
      row[*i] = v;
    }
    self.rows.push(row);

    if created {
      UpsertAction::Created
    } else {
      UpsertAction::Appended
    }
  }
}

#[cfg(test)]
impl ResultsTable {
  pub fn len(&self) -> usize {
    self.rows.len()
  }

  /// Cell of `column` in the row whose project is `project`.
  pub fn cell(&self, project: &str, column: &str) -> Option<&str> {
    let p = self.column("project")?;
    let c = self.column(column)?;
    self.rows.iter().find(|r| r[p] == project).map(|r| r[c].as_str())
  }
}

/// Load, upsert and save in one step.
pub fn upsert_result(path: &Path, result: &ComparisonResult) -> Result<UpsertAction> {
  let mut table = ResultsTable::load(path)?;
  let action = table.upsert(result);
  table.save(path)?;
  info!(project = %result.project, out = %path.display(), action = ?action, "results saved/updated");
  Ok(action)
}

#[derive(Debug, Tabled)]
struct MetricLine {
  #[tabled(rename = "Metric")]
  metric: String,
  #[tabled(rename = "Cliff Magnitude")]
  magnitude: String,
  #[tabled(rename = "Cliff Estimate")]
  estimate: String,
  #[tabled(rename = "MWW p-value")]
  p_value: String,
}

/// Project name followed by one table row per metric.
pub fn render_metric_table(result: &ComparisonResult) -> String {
  let lines: Vec<MetricLine> = result
    .metrics
    .iter()
    .map(|m| {
      let (magnitude, estimate, p_value) = match &m.comparison {
        Some(c) => (c.magnitude.to_string(), format_decimal(c.delta), format_decimal(c.p_value)),
        None => (String::new(), String::new(), String::new()),
      };
      MetricLine {
        metric: m.metric.title(),
        magnitude,
        estimate,
        p_value,
      }
    })
    .collect();

  format!("{}\n{}\n", result.project, Table::new(lines))
}
