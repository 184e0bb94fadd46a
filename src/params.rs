use std::path::{Path, PathBuf};

use crate::cli::{EffectiveConfig, RepoArgs};

/// Per-repository file locations shared by every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePaths {
  pub pulls_raw: PathBuf,
  pub releases_raw: PathBuf,
  pub releases_linked: PathBuf,
  pub data_merged: PathBuf,
}

impl StagePaths {
  pub fn new(out_dir: &Path, owner: &str, repo: &str) -> Self {
    StagePaths {
      pulls_raw: out_dir.join(format!("{}_{}_pulls_raw.csv", owner, repo)),
      releases_raw: out_dir.join(format!("{}_releases_raw.csv", repo)),
      releases_linked: out_dir.join(format!("{}_releases_linked.csv", repo)),
      data_merged: out_dir.join(format!("{}_data_merged.csv", repo)),
    }
  }

  pub fn for_target(cfg: &EffectiveConfig, target: &RepoArgs) -> Self {
    Self::new(&cfg.out_dir, &target.owner, &target.repo)
  }
}

/// Local clone location: an explicit path wins, else `<repos_dir>/<repo>`.
pub fn clone_path(cfg: &EffectiveConfig, target: &RepoArgs, explicit: Option<&Path>) -> PathBuf {
  match explicit {
    Some(p) => p.to_path_buf(),
    None => cfg.repos_dir.join(&target.repo),
  }
}

pub fn manifest_path(cfg: &EffectiveConfig) -> PathBuf {
  cfg.out_dir.join("batch_manifest.json")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_names_follow_stage_conventions() {
    let p = StagePaths::new(Path::new("outputs"), "Yelp", "mrjob");
    assert_eq!(p.pulls_raw, PathBuf::from("outputs/Yelp_mrjob_pulls_raw.csv"));
    assert_eq!(p.releases_raw, PathBuf::from("outputs/mrjob_releases_raw.csv"));
    assert_eq!(p.releases_linked, PathBuf::from("outputs/mrjob_releases_linked.csv"));
    assert_eq!(p.data_merged, PathBuf::from("outputs/mrjob_data_merged.csv"));
  }
}
