use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::csvio::read_records;
use crate::error::{PipelineError, Result};
use crate::metrics::{self, ComparisonResult, MetricRow};
use crate::model::CsvRecord;
use crate::report;

const CI_PRACTICE: &str = "CI";

/// The columns of the published PR dataset this analysis reads; other columns are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
  pub project: String,
  pub merge_time: Option<String>,
  pub delivery_time: Option<String>,
  pub practice: Option<String>,
}

impl CsvRecord for DatasetRow {
  const HEADERS: &'static [&'static str] = &["project", "merge_time", "delivery_time", "practice"];
}

fn numeric(cell: Option<&str>) -> Option<f64> {
  cell.and_then(|s| s.trim().parse::<f64>().ok()).filter(|v| v.is_finite())
}

impl DatasetRow {
  pub fn is_ci(&self) -> bool {
    self.practice.as_deref() == Some(CI_PRACTICE)
  }

  pub fn metric_row(&self) -> MetricRow {
    let merge = numeric(self.merge_time.as_deref());
    let delivery = numeric(self.delivery_time.as_deref());
    MetricRow {
      delivery_delay: delivery,
      merge_time: merge,
      pr_lifetime: merge.zip(delivery).map(|(m, d)| m + d),
    }
  }
}

/// A project with PRs on both sides of CI adoption.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSplit {
  pub project: String,
  pub before: Vec<MetricRow>,
  pub after: Vec<MetricRow>,
}

/// Group rows by project (sorted by name) and split on `practice`; incomplete rows
/// are dropped and projects missing a side are skipped.
pub fn split_by_practice(rows: &[DatasetRow]) -> Vec<ProjectSplit> {
  let mut groups: BTreeMap<&str, (Vec<MetricRow>, Vec<MetricRow>)> = BTreeMap::new();

  for row in rows {
    let metrics = row.metric_row();
    let entry = groups.entry(row.project.as_str()).or_default();
    if !metrics.is_complete() {
      continue;
    }
    if row.is_ci() {
      entry.1.push(metrics);
    } else {
      entry.0.push(metrics);
    }
  }

  groups
    .into_iter()
    .filter_map(|(project, (before, after))| {
      if before.is_empty() || after.is_empty() {
        info!(project, before = before.len(), after = after.len(), "skipping project: insufficient before/after data");
        return None;
      }
      Some(ProjectSplit {
        project: project.to_string(),
        before,
        after,
      })
    })
    .collect()
}

/// Compare every project of the dataset; with `results`, upsert each row there.
pub fn analyze_dataset(path: &Path, results: Option<&Path>) -> Result<Vec<ComparisonResult>> {
  if !path.exists() {
    return Err(PipelineError::Config(format!("dataset not found: {}", path.display())));
  }

  let rows: Vec<DatasetRow> = read_records(path, "analyze-dataset")?;
  let splits = split_by_practice(&rows);
  if splits.is_empty() {
    warn!(dataset = %path.display(), rows = rows.len(), "no project has PRs on both sides of CI adoption");
  }

  let mut out = Vec::with_capacity(splits.len());
  for s in splits {
    let result = metrics::compare(&s.project, &s.before, &s.after);
    if let Some(results) = results {
      report::upsert_result(results, &result)?;
    }
    out.push(result);
  }

  Ok(out)
}
