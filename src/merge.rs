use std::collections::HashMap;

use tracing::info;

use crate::csvio::{read_records, write_records};
use crate::error::Result;
use crate::model::{ConsolidatedRecord, PullRequestRecord, ReleaseLink};
use crate::params::StagePaths;

/// Left join of PRs against the PR -> release lookup; PR order is preserved.
pub fn consolidate(pulls: Vec<PullRequestRecord>, links: &[ReleaseLink]) -> Vec<ConsolidatedRecord> {
  let by_number: HashMap<u64, &str> = links.iter().map(|l| (l.pull_number, l.release_tag.as_str())).collect();

  pulls
    .into_iter()
    .map(|pr| {
      let tag = by_number.get(&pr.pull_number).map(|t| t.to_string());
      ConsolidatedRecord::from_pull(pr, tag)
    })
    .collect()
}

/// Stage entry point: read both stage outputs and write the merged table.
pub fn merge_stage(paths: &StagePaths) -> Result<Vec<ConsolidatedRecord>> {
  let pulls: Vec<PullRequestRecord> = read_records(&paths.pulls_raw, "collect-pulls")?;
  let links: Vec<ReleaseLink> = read_records(&paths.releases_linked, "collect-releases")?;

  let merged = consolidate(pulls, &links);
  let linked = merged.iter().filter(|r| r.release_tag.is_some()).count();
  write_records(&paths.data_merged, &merged)?;

  info!(rows = merged.len(), with_release = linked, out = %paths.data_merged.display(), "saved consolidated data");
  Ok(merged)
}
