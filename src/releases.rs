// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Link merged PRs to the release tag that first shipped them, using local tag history
// role: stage/release-linker
// inputs: Path to a full clone with tags
// outputs: ReleaseInterval rows (one per consecutive tag pair) and ReleaseLink rows (PR -> tag)
// side_effects: Spawns git; release files are only written when both tables are non-empty
// invariants:
// - pre-release tags (alpha/beta/rc/pre, any case) never bound an interval
// - number_of_prs counts distinct PR numbers in the range, never commits
// - a PR number keeps the first (earliest) release that contains its merge commit
// errors: Git failures propagate; empty results are a warning, not an error
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::csvio::write_records;
use crate::error::{PipelineError, Result};
use crate::gitio::{self, CommitMessage, TagInfo};
use crate::model::{ReleaseInterval, ReleaseLink};
use crate::params::StagePaths;
use crate::util::format_instant;

const PRE_RELEASE_MARKERS: [&str; 4] = ["alpha", "beta", "rc", "pre"];

static RE_MERGE_PR: Lazy<Regex> = Lazy::new(|| Regex::new(r"Merge pull request #(\d+)").expect("static regex"));

/// True for tags that look like user-facing releases.
pub fn is_release_tag(name: &str) -> bool {
  let lower = name.to_lowercase();
  !PRE_RELEASE_MARKERS.iter().any(|m| lower.contains(m))
}

/// PR number referenced by a GitHub merge commit message.
pub fn merged_pr_number(message: &str) -> Option<u64> {
  RE_MERGE_PR
    .captures(message)
    .and_then(|c| c.get(1))
    .and_then(|m| m.as_str().parse::<u64>().ok())
}

#[derive(Debug, Default)]
pub struct ReleaseLinkage {
  pub intervals: Vec<ReleaseInterval>,
  pub links: BTreeMap<u64, String>,
}

impl ReleaseLinkage {
  pub fn is_empty(&self) -> bool {
    self.intervals.is_empty() || self.links.is_empty()
  }

  pub fn link_rows(&self) -> Vec<ReleaseLink> {
    self
      .links
      .iter()
      .map(|(n, tag)| ReleaseLink {
        pull_number: *n,
        release_tag: tag.clone(),
      })
      .collect()
  }
}

/// Release tags in ascending commit-time order (ties keep refname order).
pub fn release_sequence(mut tags: Vec<TagInfo>) -> Vec<TagInfo> {
  tags.retain(|t| {
    let keep = is_release_tag(&t.name);
    if !keep {
      debug!(tag = %t.name, "excluding pre-release tag");
    }
    keep
  });
  tags.sort_by_key(|t| t.committed_at);
  tags
}

/// Fold one interval's commits into the linkage. Earlier intervals must be folded first.
pub fn link_interval(linkage: &mut ReleaseLinkage, start: &TagInfo, end: &TagInfo, commits: &[CommitMessage]) {
  let mut pr_numbers: BTreeSet<u64> = BTreeSet::new();

  for commit in commits {
    if let Some(n) = merged_pr_number(&commit.message) {
      pr_numbers.insert(n);
      if let Some(existing) = linkage.links.get(&n) {
        debug!(pr = n, kept = %existing, ignored = %end.name, sha = %commit.sha, "PR already linked to an earlier release");
      } else {
        linkage.links.insert(n, end.name.clone());
      }
    }
  }

  linkage.intervals.push(ReleaseInterval {
    title: end.name.clone(),
    publish_date: format_instant(&end.committed_at),
    start_date: format_instant(&start.committed_at),
    number_of_commits: commits.len(),
    number_of_prs: pr_numbers.len(),
  });
}

/// Walk the local clone at `repo` and build the interval and PR->release tables.
pub fn link_releases(repo: &Path) -> Result<ReleaseLinkage> {
  let tags = release_sequence(gitio::list_tags(repo)?);
  let mut linkage = ReleaseLinkage::default();

  for pair in tags.windows(2) {
    let (start, end) = (&pair[0], &pair[1]);
    let commits = gitio::commits_between(repo, &start.name, &end.name)?;
    link_interval(&mut linkage, start, end, &commits);
  }

  Ok(linkage)
}

/// Stage entry point: link releases for the clone and write both CSVs.
pub fn collect_releases(repo_path: &Path, paths: &StagePaths) -> Result<ReleaseLinkage> {
  if !repo_path.is_dir() {
    return Err(PipelineError::Config(format!(
      "repository clone not found at {} (clone it with tags, or pass --repo-path)",
      repo_path.display()
    )));
  }
  info!(repo = %repo_path.display(), "linking pull requests to releases");
  let linkage = link_releases(repo_path)?;

  if linkage.is_empty() {
    warn!(
      repo = %repo_path.display(),
      intervals = linkage.intervals.len(),
      links = linkage.links.len(),
      "no release data and/or PR mapping; nothing written"
    );
    return Ok(linkage);
  }

  write_records(&paths.releases_raw, &linkage.intervals)?;
  write_records(&paths.releases_linked, &linkage.link_rows())?;
  info!(
    intervals = linkage.intervals.len(),
    linked_prs = linkage.links.len(),
    out = %paths.releases_raw.display(),
    "saved release info"
  );

  Ok(linkage)
}
