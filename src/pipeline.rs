// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Run every stage for one repository (fail fast) or for a list of repositories (record and continue)
// role: processing/orchestrator
// inputs: EffectiveConfig, owner/repo targets, optional clone path
// outputs: ComparisonResult upserted into the results file; batch_manifest.json for batches
// side_effects: Network calls, git subprocesses, CSV writes under out_dir
// invariants:
// - stages run in order: collect-pulls, collect-releases, merge, ci-start, analyze
// - a repository without release links or a CI start is skipped, not failed
// - in a batch, one repository's failure never stops the next
// errors: StageFailure names the stage that failed; run() surfaces it through anyhow
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;
use std::path::Path;

use anyhow::{anyhow, bail, Result};
use tracing::{error, info, warn};

use crate::ci;
use crate::cli::{EffectiveConfig, RepoArgs};
use crate::error::PipelineError;
use crate::github::{api as ghapi, pulls};
use crate::manifest::{BatchManifest, RepoEntry, RepoOutcome};
use crate::merge;
use crate::metrics::{self, ComparisonResult};
use crate::params::{self, StagePaths};
use crate::releases;
use crate::report;

/// Repositories mined by the study, used when `batch` gets no arguments.
pub const DEFAULT_SUITE: [(&str, &str); 4] = [
  ("Netflix", "Hystrix"),
  ("mizzy", "serverspec"),
  ("jashkenas", "backbone"),
  ("yiisoft", "yii"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  CollectPulls,
  CollectReleases,
  Merge,
  CiStart,
  Analyze,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Stage::CollectPulls => "collect-pulls",
      Stage::CollectReleases => "collect-releases",
      Stage::Merge => "merge",
      Stage::CiStart => "ci-start",
      Stage::Analyze => "analyze",
    })
  }
}

#[derive(Debug)]
pub struct StageFailure {
  pub stage: Stage,
  pub error: PipelineError,
}

impl fmt::Display for StageFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "stage `{}` failed: {}", self.stage, self.error)
  }
}

impl std::error::Error for StageFailure {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    Some(&self.error)
  }
}

/// Result of running every stage for one repository.
#[derive(Debug, Clone, PartialEq)]
pub enum Finished {
  Completed(ComparisonResult),
  Skipped(String),
}

fn at<T>(stage: Stage, r: crate::error::Result<T>) -> std::result::Result<T, StageFailure> {
  r.map_err(|error| StageFailure { stage, error })
}

pub fn run_stages(cfg: &EffectiveConfig, target: &RepoArgs, repo_path: Option<&Path>) -> std::result::Result<Finished, StageFailure> {
  let paths = StagePaths::for_target(cfg, target);
  info!(repo = %target.slug(), out_dir = %cfg.out_dir.display(), "running pipeline");

  info!("step 1: collecting pull requests");
  let token = at(Stage::CollectPulls, cfg.credentials.github())?;
  let api = ghapi::make_api(token, &cfg.http);
  at(
    Stage::CollectPulls,
    pulls::collect_pull_requests(api.as_ref(), &target.owner, &target.repo, &paths.pulls_raw, cfg.resume),
  )?;

  info!("step 2: collecting releases");
  let clone = params::clone_path(cfg, target, repo_path);
  let linkage = at(Stage::CollectReleases, releases::collect_releases(&clone, &paths))?;
  if linkage.is_empty() {
    return Ok(Finished::Skipped("no release data and/or PR mapping".into()));
  }

  info!("step 3: merging data");
  at(Stage::Merge, merge::merge_stage(&paths))?;

  info!("step 4: computing metrics");
  let cutoff = match at(Stage::CiStart, ci::ci_cutoff(cfg, &target.owner, &target.repo))? {
    Some(c) => c,
    None => return Ok(Finished::Skipped("CI start date not found".into())),
  };
  let result = at(Stage::Analyze, metrics::analyze_repository(&target.repo, &paths, cutoff))?;
  at(Stage::Analyze, report::upsert_result(&cfg.results_file, &result))?;

  info!(repo = %target.slug(), "completed");
  Ok(Finished::Completed(result))
}

/// `run`: every stage for one repository; any failure or skip ends the process with an error.
pub fn run_pipeline(cfg: &EffectiveConfig, target: &RepoArgs, repo_path: Option<&Path>) -> Result<ComparisonResult> {
  match run_stages(cfg, target, repo_path) {
    Ok(Finished::Completed(result)) => Ok(result),
    Ok(Finished::Skipped(reason)) => bail!("{}: cannot proceed: {}", target.slug(), reason),
    Err(failure) => Err(anyhow!(failure).context(format!("error while processing {}", target.slug()))),
  }
}

/// Parse `owner/repo`.
pub fn parse_slug(slug: &str) -> Option<RepoArgs> {
  let (owner, repo) = slug.trim().split_once('/')?;
  if owner.is_empty() || repo.is_empty() || repo.contains('/') {
    return None;
  }
  Some(RepoArgs {
    owner: owner.to_string(),
    repo: repo.to_string(),
  })
}

pub fn batch_targets(slugs: &[String]) -> Result<Vec<RepoArgs>> {
  if slugs.is_empty() {
    return Ok(
      DEFAULT_SUITE
        .iter()
        .map(|(o, r)| RepoArgs {
          owner: o.to_string(),
          repo: r.to_string(),
        })
        .collect(),
    );
  }
  slugs
    .iter()
    .map(|s| parse_slug(s).ok_or_else(|| anyhow!("expected owner/repo, got {:?}", s)))
    .collect()
}

/// `batch`: run each repository, record its outcome, keep going; write the manifest.
pub fn run_batch(cfg: &EffectiveConfig, targets: &[RepoArgs]) -> Result<BatchManifest> {
  let mut entries = Vec::with_capacity(targets.len());

  for target in targets {
    let outcome = match run_stages(cfg, target, None) {
      Ok(Finished::Completed(result)) => RepoOutcome::Completed { result },
      Ok(Finished::Skipped(reason)) => {
        warn!(repo = %target.slug(), reason = %reason, "skipped");
        RepoOutcome::Skipped { reason }
      }
      Err(failure) => {
        error!(repo = %target.slug(), stage = %failure.stage, error = %failure.error, "error while processing repository");
        RepoOutcome::Failed {
          stage: failure.stage.to_string(),
          error: failure.error.to_string(),
        }
      }
    };
    entries.push(RepoEntry {
      repo: target.slug(),
      outcome,
    });
  }

  let manifest = BatchManifest::new(chrono::Utc::now(), &cfg.results_file, entries);
  let path = manifest.write_to(&params::manifest_path(cfg))?;
  info!(
    completed = manifest.completed,
    skipped = manifest.skipped,
    failed = manifest.failed,
    manifest = %path.display(),
    "batch finished"
  );
  Ok(manifest)
}
