use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

use crate::error::PipelineError;
use crate::util;

#[derive(Parser, Debug)]
#[command(
    name = "ci-delivery-replication",
    version,
    about = "Compare PR merge and delivery times before and after CI adoption",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Option<Command>,

  /// Directory for every stage's CSV output
  #[arg(long, global = true, env = "CDR_OUTPUT_DIR", default_value = "outputs")]
  pub out_dir: PathBuf,

  /// Directory holding local clones, one per repository name
  #[arg(long, global = true, env = "CDR_REPOS_DIR", default_value = "temp_repos")]
  pub repos_dir: PathBuf,

  /// Results table to upsert into (default: <out-dir>/results_from_mined_data.csv)
  #[arg(long, global = true)]
  pub results: Option<PathBuf>,

  /// GitHub token (falls back to GH_TOKEN, then `gh auth token`)
  #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
  pub github_token: Option<String>,

  /// Travis CI API token
  #[arg(long, global = true, env = "TRAVIS_TOKEN", hide_env_values = true)]
  pub travis_token: Option<String>,

  /// Use this CI adoption instant instead of asking Travis (e.g. 2013-02-01T00:00:00Z)
  #[arg(long, global = true)]
  pub ci_start: Option<String>,

  /// Retries per HTTP request on rate limits, 5xx and transport errors
  #[arg(long, global = true, default_value_t = 5)]
  pub max_retries: u32,

  /// First retry delay in milliseconds; doubles per attempt
  #[arg(long, global = true, default_value_t = 1000)]
  pub retry_base_ms: u64,

  /// Global timeout per HTTP request in seconds
  #[arg(long, global = true, default_value_t = 60)]
  pub http_timeout_secs: u64,

  /// Resume pull collection from an interrupted run's checkpoint
  #[arg(long, global = true)]
  pub resume: bool,

  /// More log output (-v debug, -vv trace); RUST_LOG overrides
  #[arg(short, long, global = true, action = ArgAction::Count)]
  pub verbose: u8,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RepoArgs {
  /// Repository owner, e.g. Yelp
  pub owner: String,
  /// Repository name, e.g. mrjob
  pub repo: String,
}

impl RepoArgs {
  pub fn slug(&self) -> String {
    format!("{}/{}", self.owner, self.repo)
  }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// Collect every pull request of a repository from GitHub
  CollectPulls(RepoArgs),
  /// Link merged PRs to release tags using the local clone
  CollectReleases {
    #[command(flatten)]
    target: RepoArgs,
    /// Path to the clone (default: <repos-dir>/<repo>)
    #[arg(long)]
    repo_path: Option<PathBuf>,
  },
  /// Join the PR table with the PR -> release lookup
  Merge(RepoArgs),
  /// Print the first Travis build start time (the CI adoption cutoff)
  CiStart(RepoArgs),
  /// Compare merge/delivery times before and after CI adoption
  Analyze {
    #[command(flatten)]
    target: RepoArgs,
    /// Print a per-metric table instead of updating the results file
    #[arg(long)]
    print: bool,
  },
  /// Run the comparison on the published PR dataset (split by its `practice` column)
  AnalyzeDataset {
    /// Path to the dataset CSV (project, merge_time, delivery_time, practice, ...)
    dataset: PathBuf,
    /// Results table for the dataset (default: <out-dir>/results_from_original_data.csv)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Print a per-metric table per project instead of writing results
    #[arg(long)]
    print: bool,
  },
  /// Put our results next to a published results table, project by project
  CompareResults {
    /// Our results CSV (e.g. results_from_mined_data.csv)
    ours: PathBuf,
    /// The authors' published results CSV
    authors: PathBuf,
    /// Combined output (default: <out-dir>/comparison_combined_results.csv)
    #[arg(long)]
    out: Option<PathBuf>,
  },
  /// Run every stage for one repository
  Run {
    #[command(flatten)]
    target: RepoArgs,
    #[arg(long)]
    repo_path: Option<PathBuf>,
  },
  /// Run every stage for several repositories, recording each outcome
  Batch {
    /// owner/repo slugs (default: the study's mined repositories)
    slugs: Vec<String>,
  },
}

impl Command {
  fn needs_github(&self) -> bool {
    matches!(self, Command::CollectPulls(_) | Command::Run { .. } | Command::Batch { .. })
  }

  fn needs_ci_provider(&self) -> bool {
    matches!(
      self,
      Command::CiStart(_) | Command::Analyze { .. } | Command::Run { .. } | Command::Batch { .. }
    )
  }
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
  pub github_token: Option<String>,
  pub travis_token: Option<String>,
}

impl Credentials {
  pub fn github(&self) -> Result<&str, PipelineError> {
    self.github_token.as_deref().ok_or_else(|| {
      PipelineError::Config("GITHUB_TOKEN not found. Set it in the environment or a .env file: GITHUB_TOKEN=your_token_here".into())
    })
  }

  pub fn travis(&self) -> Result<&str, PipelineError> {
    self.travis_token.as_deref().ok_or_else(|| {
      PipelineError::Config(
        "TRAVIS_TOKEN not found. Set it in the environment or a .env file, or pass --ci-start".into(),
      )
    })
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct HttpSettings {
  pub max_retries: u32,
  pub retry_base_ms: u64,
  pub timeout_secs: u64,
}

impl HttpSettings {
  pub fn retry_base(&self) -> Duration {
    Duration::from_millis(self.retry_base_ms)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
  pub out_dir: PathBuf,
  pub repos_dir: PathBuf,
  pub results_file: PathBuf,
  #[serde(skip)]
  pub credentials: Credentials,
  pub ci_start: Option<DateTime<Utc>>,
  pub http: HttpSettings,
  pub resume: bool,
}

fn non_empty(v: Option<String>) -> Option<String> {
  v.filter(|s| !s.trim().is_empty())
}

pub fn normalize(cli: Cli) -> Result<(EffectiveConfig, Command)> {
  let command = match cli.command {
    Some(c) => c,
    None => bail!("Provide a subcommand (see --help)"),
  };

  let ci_start = match cli.ci_start.as_deref() {
    Some(raw) => match util::parse_instant(raw) {
      Some(dt) => Some(dt),
      None => bail!("--ci-start is not a timestamp: {:?}", raw),
    },
    None => None,
  };

  let credentials = Credentials {
    github_token: non_empty(cli.github_token).or_else(crate::github::api::discover_token),
    travis_token: non_empty(cli.travis_token),
  };

  // Required credentials are checked before any stage runs.
  if command.needs_github() {
    credentials.github()?;
  }
  if command.needs_ci_provider() && ci_start.is_none() {
    credentials.travis()?;
  }

  let results_file = cli
    .results
    .unwrap_or_else(|| cli.out_dir.join("results_from_mined_data.csv"));

  Ok((
    EffectiveConfig {
      out_dir: cli.out_dir,
      repos_dir: cli.repos_dir,
      results_file,
      credentials,
      ci_start,
      http: HttpSettings {
        max_retries: cli.max_retries,
        retry_base_ms: cli.retry_base_ms,
        timeout_secs: cli.http_timeout_secs,
      },
      resume: cli.resume,
    },
    command,
  ))
}
