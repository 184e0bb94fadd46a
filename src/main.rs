use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod ci;
mod cli;
mod compare;
mod csvio;
mod dataset;
mod error;
mod ext;
mod github;
mod gitio;
mod http;
mod manifest;
mod merge;
mod metrics;
mod model;
mod params;
mod pipeline;
mod releases;
mod report;
mod stats;
mod util;

use crate::cli::{normalize, Cli, Command};
use crate::params::StagePaths;

fn init_tracing(verbose: u8) {
  let default = match verbose {
    0 => "info",
    1 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
    .with(filter)
    .init();
}

fn main() -> Result<()> {
  // .env must be loaded before clap reads env-backed arguments
  dotenv::dotenv().ok();

  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  init_tracing(cli.verbose);

  // Phase 1: normalize CLI and validate credentials
  let (cfg, command) = normalize(cli)?;
  tracing::debug!(config = %serde_json::to_string(&cfg)?, "effective configuration");

  // Phase 2: dispatch to the requested stage or driver
  match command {
    Command::CollectPulls(target) => {
      let api = github::api::make_api(cfg.credentials.github()?, &cfg.http);
      let paths = StagePaths::for_target(&cfg, &target);
      let summary =
        github::pulls::collect_pull_requests(api.as_ref(), &target.owner, &target.repo, &paths.pulls_raw, cfg.resume)?;
      tracing::info!(fetched = summary.fetched, resumed = summary.resumed, "collect-pulls finished");
    }
    Command::CollectReleases { target, repo_path } => {
      let paths = StagePaths::for_target(&cfg, &target);
      let clone = params::clone_path(&cfg, &target, repo_path.as_deref());
      releases::collect_releases(&clone, &paths)?;
    }
    Command::Merge(target) => {
      merge::merge_stage(&StagePaths::for_target(&cfg, &target))?;
    }
    Command::CiStart(target) => match ci::ci_cutoff(&cfg, &target.owner, &target.repo)? {
      Some(dt) => println!("{}", util::format_instant(&dt)),
      None => bail!("CI start date not found for {}", target.slug()),
    },
    Command::Analyze { target, print } => {
      let Some(cutoff) = ci::ci_cutoff(&cfg, &target.owner, &target.repo)? else {
        bail!(
          "CI start date not found for {}; run `ci-start` to check or pass --ci-start",
          target.slug()
        );
      };
      let result = metrics::analyze_repository(&target.repo, &StagePaths::for_target(&cfg, &target), cutoff)?;
      if print {
        print!("{}", report::render_metric_table(&result));
      } else {
        report::upsert_result(&cfg.results_file, &result)?;
      }
    }
    Command::AnalyzeDataset { dataset, out, print } => {
      let out = out.unwrap_or_else(|| cfg.out_dir.join("results_from_original_data.csv"));
      let results = dataset::analyze_dataset(&dataset, if print { None } else { Some(out.as_path()) })?;
      if print {
        for r in &results {
          print!("{}", report::render_metric_table(r));
        }
      }
    }
    Command::CompareResults { ours, authors, out } => {
      let out = out.unwrap_or_else(|| cfg.out_dir.join("comparison_combined_results.csv"));
      compare::compare_results(&ours, &authors, &out)?;
    }
    Command::Run { target, repo_path } => {
      let result = pipeline::run_pipeline(&cfg, &target, repo_path.as_deref())?;
      tracing::info!(project = %result.project, results = %cfg.results_file.display(), "pipeline completed");
    }
    Command::Batch { slugs } => {
      let targets = pipeline::batch_targets(&slugs)?;
      pipeline::run_batch(&cfg, &targets)?;
    }
  }

  Ok(())
}
