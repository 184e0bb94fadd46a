// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Derive per-PR durations, split PRs at the CI cutoff and compare the two sides per metric
// role: stage/metrics
// inputs: Consolidated PR table, release intervals (publish dates by tag), CI cutoff instant
// outputs: ComparisonResult (one MetricComparison per metric, in delivery/merge/lifetime order)
// invariants:
// - durations exist only when creation <= merge <= publish all hold; violating rows are excluded
// - lifetime == merge_time + delivery_time whenever defined
// - before = created_at < cutoff, after = created_at >= cutoff
// - delta is always cliffs_delta(after, before)
// - a metric with an empty side has no comparison (empty cells, never zero)
// errors: Missing inputs surface as PipelineError::MissingInput
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::csvio::read_records;
use crate::error::{PipelineError, Result};
use crate::model::{ConsolidatedRecord, ReleaseInterval, TimedPull};
use crate::params::StagePaths;
use crate::stats::{self, Magnitude};
use crate::util::{format_decimal, parse_instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Metric {
  DeliveryDelay,
  MergeTime,
  PrLifetime,
}

impl Metric {
  /// Reporting order.
  pub const ALL: [Metric; 3] = [Metric::DeliveryDelay, Metric::MergeTime, Metric::PrLifetime];

  pub fn label(self) -> &'static str {
    match self {
      Metric::DeliveryDelay => "delivery delay",
      Metric::MergeTime => "merge time",
      Metric::PrLifetime => "PR lifetime",
    }
  }

  /// Label as shown in the printed table ("Delivery Delay", "Pr Lifetime").
  pub fn title(self) -> String {
    self
      .label()
      .split(' ')
      .map(|w| {
        let mut cs = w.chars();
        match cs.next() {
          Some(f) => f.to_uppercase().chain(cs.flat_map(|c| c.to_lowercase())).collect::<String>(),
          None => String::new(),
        }
      })
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl fmt::Display for Metric {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Durations of one PR, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationMetrics {
  pub merge_time: i64,
  pub delivery_time: i64,
  pub lifetime: i64,
}

impl DurationMetrics {
  pub fn derive(created: DateTime<Utc>, merged: Option<DateTime<Utc>>, published: Option<DateTime<Utc>>) -> Option<Self> {
    let (merged, published) = (merged?, published?);
    if merged < created || published < merged {
      return None;
    }
    let merge_time = (merged - created).num_seconds();
    let delivery_time = (published - merged).num_seconds();
    Some(DurationMetrics {
      merge_time,
      delivery_time,
      lifetime: merge_time + delivery_time,
    })
  }
}

/// One PR's metric values; `None` marks a missing value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricRow {
  pub delivery_delay: Option<f64>,
  pub merge_time: Option<f64>,
  pub pr_lifetime: Option<f64>,
}

impl MetricRow {
  pub fn get(&self, metric: Metric) -> Option<f64> {
    match metric {
      Metric::DeliveryDelay => self.delivery_delay,
      Metric::MergeTime => self.merge_time,
      Metric::PrLifetime => self.pr_lifetime,
    }
  }

  pub fn is_complete(&self) -> bool {
    Metric::ALL.iter().all(|m| self.get(*m).is_some())
  }
}

impl From<Option<DurationMetrics>> for MetricRow {
  fn from(d: Option<DurationMetrics>) -> Self {
    match d {
      Some(d) => MetricRow {
        delivery_delay: Some(d.delivery_time as f64),
        merge_time: Some(d.merge_time as f64),
        pr_lifetime: Some(d.lifetime as f64),
      },
      None => MetricRow::default(),
    }
  }
}

impl From<&TimedPull> for MetricRow {
  fn from(p: &TimedPull) -> Self {
    let d = DurationMetrics::derive(p.created_at, p.merged_at, p.release_published_at);
    if d.is_none() && p.merged_at.is_some() {
      debug!(pr = p.pull_number, "merged pull request without usable release timing");
    }
    d.into()
  }
}

/// Split at the cutoff: (before, after).
pub fn partition(pulls: &[TimedPull], cutoff: DateTime<Utc>) -> (Vec<&TimedPull>, Vec<&TimedPull>) {
  pulls.iter().partition(|p| p.created_at < cutoff)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
  pub delta: f64,
  pub magnitude: Magnitude,
  pub p_value: f64,
  pub before_n: usize,
  pub after_n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
  pub metric: Metric,
  pub comparison: Option<Comparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
  pub project: String,
  pub metrics: Vec<MetricComparison>,
}

fn values(rows: &[MetricRow], metric: Metric) -> Vec<f64> {
  rows.iter().filter_map(|r| r.get(metric)).collect()
}

pub fn compare_metric(metric: Metric, before: &[MetricRow], after: &[MetricRow]) -> MetricComparison {
  let (b, a) = (values(before, metric), values(after, metric));

  let comparison = match (stats::mann_whitney_u(&b, &a), stats::cliffs_delta(&a, &b)) {
    (Some(test), Some(delta)) => {
      debug!(metric = %metric, u = test.u, method = ?test.method, p_value = test.p_value, delta, "compared samples");
      Some(Comparison {
        delta,
        magnitude: Magnitude::from_delta(delta),
        p_value: test.p_value,
        before_n: b.len(),
        after_n: a.len(),
      })
    }
    _ => {
      warn!(metric = %metric, before = b.len(), after = a.len(), "not enough data on both sides; leaving metric empty");
      None
    }
  };

  MetricComparison { metric, comparison }
}

pub fn compare(project: &str, before: &[MetricRow], after: &[MetricRow]) -> ComparisonResult {
  ComparisonResult {
    project: project.to_string(),
    metrics: Metric::ALL.iter().map(|m| compare_metric(*m, before, after)).collect(),
  }
}

impl ComparisonResult {
  pub fn headers() -> Vec<String> {
    let mut h = vec!["project".to_string()];
    for m in Metric::ALL {
      h.push(format!("Cliff delta (magnitude): {}", m.label()));
      h.push(format!("Cliff delta (estimate): {}", m.label()));
      h.push(format!("MWW test (p-value): {}", m.label()));
    }
    h
  }

  /// Cells aligned with `headers()`.
  pub fn values(&self) -> Vec<String> {
    let mut v = vec![self.project.clone()];
    for mc in &self.metrics {
      match &mc.comparison {
        Some(c) => {
          v.push(c.magnitude.to_string());
          v.push(format_decimal(c.delta));
          v.push(format_decimal(c.p_value));
        }
        None => v.extend([String::new(), String::new(), String::new()]),
      }
    }
    v
  }

  pub fn is_empty(&self) -> bool {
    self.metrics.iter().all(|m| m.comparison.is_none())
  }
}

/// Join consolidated PRs with release publish dates.
pub fn timed_pulls(rows: &[ConsolidatedRecord], releases: &[ReleaseInterval]) -> Vec<TimedPull> {
  let published: HashMap<&str, Option<DateTime<Utc>>> = releases
    .iter()
    .map(|r| (r.title.as_str(), parse_instant(&r.publish_date)))
    .collect();

  rows
    .iter()
    .filter_map(|r| {
      let created_at = parse_instant(&r.creation_date)?;
      let release_published_at = r
        .release_tag
        .as_deref()
        .and_then(|t| published.get(t).copied().flatten());
      Some(TimedPull {
        pull_number: r.pull_number,
        created_at,
        merged_at: r.merged_at.as_deref().and_then(parse_instant),
        release_published_at,
      })
    })
    .collect()
}

pub fn load_timed_pulls(paths: &StagePaths) -> Result<Vec<TimedPull>> {
  let merged: Vec<ConsolidatedRecord> = read_records(&paths.data_merged, "merge")?;
  let releases: Vec<ReleaseInterval> = read_records(&paths.releases_raw, "collect-releases")?;
  Ok(timed_pulls(&merged, &releases))
}

/// Compare a mined repository at `cutoff`.
pub fn analyze_pulls(project: &str, pulls: &[TimedPull], cutoff: DateTime<Utc>) -> ComparisonResult {
  let (before, after) = partition(pulls, cutoff);
  let before: Vec<MetricRow> = before.into_iter().map(MetricRow::from).collect();
  let after: Vec<MetricRow> = after.into_iter().map(MetricRow::from).collect();

  info!(
    project,
    cutoff = %cutoff,
    before = before.len(),
    before_with_durations = before.iter().filter(|r| r.is_complete()).count(),
    after = after.len(),
    after_with_durations = after.iter().filter(|r| r.is_complete()).count(),
    "partitioned pull requests at CI start"
  );

  compare(project, &before, &after)
}

/// Stage entry point: load the merged tables and compare before/after `cutoff`.
pub fn analyze_repository(project: &str, paths: &StagePaths, cutoff: DateTime<Utc>) -> Result<ComparisonResult> {
  let pulls = load_timed_pulls(paths)?;
  if pulls.is_empty() {
    return Err(PipelineError::InvalidRecord {
      path: paths.data_merged.clone(),
      reason: "no pull requests to analyze".into(),
    });
  }
  Ok(analyze_pulls(project, &pulls, cutoff))
}
