// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Build and write the batch manifest listing one outcome per repository
// role: persistence/manifest
// inputs: generated_at, results file path, (slug, RepoOutcome)[] in run order
// outputs: batch_manifest.json under the output directory
// side_effects: Writes to filesystem
// invariants:
// - every requested repository appears exactly once, in the order it was run
// - outcome is tagged by `status`: completed | skipped | failed
// - generated_at is serialized as RFC3339 UTC
// errors: IO/serialization errors surfaced with full path context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::ComparisonResult;
use crate::util::{canonicalize_lossy, format_instant};

/// What happened to one repository in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepoOutcome {
  Completed { result: ComparisonResult },
  Skipped { reason: String },
  Failed { stage: String, error: String },
}

impl RepoOutcome {
  pub fn status(&self) -> &'static str {
    match self {
      RepoOutcome::Completed { .. } => "completed",
      RepoOutcome::Skipped { .. } => "skipped",
      RepoOutcome::Failed { .. } => "failed",
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoEntry {
  pub repo: String,
  #[serde(flatten)]
  pub outcome: RepoOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchManifest {
  pub generated_at: String,
  pub results_file: String,
  pub completed: usize,
  pub skipped: usize,
  pub failed: usize,
  pub repos: Vec<RepoEntry>,
}

impl BatchManifest {
  pub fn new(generated_at: DateTime<Utc>, results_file: &Path, repos: Vec<RepoEntry>) -> Self {
    let count = |s: &str| repos.iter().filter(|r| r.outcome.status() == s).count();
    BatchManifest {
      generated_at: format_instant(&generated_at),
      results_file: canonicalize_lossy(results_file),
      completed: count("completed"),
      skipped: count("skipped"),
      failed: count("failed"),
      repos,
    }
  }

  pub fn write_to(&self, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(self)?).with_context(|| format!("writing {}", path.display()))?;
    Ok(path.to_path_buf())
  }
}
