// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Collector stage: turn GitHub PR payloads into PullRequestRecord rows and checkpoint them to CSV
// role: stage/collector
// inputs: GithubApi backend, owner/name, pulls_raw path, resume flag
// outputs: {owner}_{repo}_pulls_raw.csv in listing order
// side_effects: Writes <pulls_raw>.partial after every PR; renames it onto the final path when done
// invariants:
// - state is `merged` whenever GitHub reports merged, regardless of `state`
// - closed_by is the merger for merged PRs, the issue closer for closed-unmerged PRs, empty otherwise
// - comment_dates lists issue comments first, then review comments
// - with resume, PR numbers already in the checkpoint are not fetched again
// errors: API and IO errors propagate; the checkpoint survives for --resume
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::csvio::CheckpointWriter;
use crate::error::{PipelineError, Result};
use crate::ext::serde_json::JsonFetch;
use crate::github::api::GithubApi;
use crate::model::{CommentDates, PrState, PullRequestRecord};
use crate::util::format_instant;

/// Everything fetched for one PR before it becomes a row.
pub struct PullPayload<'a> {
  pub details: &'a Value,
  pub issue_comments: &'a [Value],
  pub review_comments: &'a [Value],
  pub event_count: usize,
  /// The PR's issue; only fetched for PRs closed without merging.
  pub issue: Option<&'a Value>,
}

fn instant_string(v: &Value, path: &str) -> Option<String> {
  let f = v.fetch(path);
  match f.to_instant() {
    Some(dt) => Some(format_instant(&dt)),
    None => f.to::<String>(),
  }
}

fn comment_dates(issue_comments: &[Value], review_comments: &[Value]) -> CommentDates {
  CommentDates(
    issue_comments
      .iter()
      .chain(review_comments.iter())
      .filter_map(|c| instant_string(c, "created_at"))
      .collect(),
  )
}

pub fn build_record(p: &PullPayload<'_>) -> Result<PullRequestRecord> {
  let d = p.details;
  let pull_number = d.fetch("number").to::<u64>().ok_or_else(|| PipelineError::Http {
    service: "GitHub",
    url: d.fetch("url").to_or_default::<String>(),
    message: "pull request payload without a number".into(),
  })?;

  let merged = d.fetch("merged").to_or_default::<bool>();
  let state = PrState::from_api(&d.fetch("state").to_or_default::<String>(), merged);

  let closed_by = match state {
    PrState::Merged => d.fetch("merged_by.login").to::<String>(),
    PrState::Closed => p.issue.and_then(|i| i.fetch("closed_by.login").to::<String>()),
    PrState::Open => None,
  };

  let creation_date = instant_string(d, "created_at").ok_or_else(|| PipelineError::Http {
    service: "GitHub",
    url: d.fetch("url").to_or_default::<String>(),
    message: format!("pull #{} has no created_at", pull_number),
  })?;

  Ok(PullRequestRecord {
    author: d.fetch("user.login").to::<String>(),
    pull_number,
    title: d.fetch("title").to_or_default::<String>(),
    description: d.fetch("body").to::<String>().map(|b| b.chars().count()).unwrap_or(0),
    churn: d.fetch("additions").count() + d.fetch("deletions").count(),
    changed_files: d.fetch("changed_files").count(),
    activities: p.event_count as i64,
    comments: d.fetch("comments").count() + d.fetch("review_comments").count(),
    comment_dates: comment_dates(p.issue_comments, p.review_comments),
    state,
    creation_date,
    close_date: instant_string(d, "closed_at"),
    closed_by,
    merged_at: if merged { instant_string(d, "merged_at") } else { None },
  })
}

fn fetch_record(api: &dyn GithubApi, owner: &str, name: &str, number: u64) -> Result<PullRequestRecord> {
  let details = api.get_pull(owner, name, number)?;
  let issue_comments = api.list_issue_comments(owner, name, number)?;
  let review_comments = api.list_review_comments(owner, name, number)?;
  let events = api.list_issue_events(owner, name, number)?;

  let merged = details.fetch("merged").to_or_default::<bool>();
  let closed = details.fetch("state").to::<String>().as_deref() == Some("closed");
  let issue = if closed && !merged {
    Some(api.get_issue(owner, name, number)?)
  } else {
    None
  };

  build_record(&PullPayload {
    details: &details,
    issue_comments: &issue_comments,
    review_comments: &review_comments,
    event_count: events.len(),
    issue: issue.as_ref(),
  })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectSummary {
  pub total: usize,
  pub resumed: usize,
  pub fetched: usize,
}

/// Stage entry point: collect every PR of `owner/name` into `out`.
pub fn collect_pull_requests(api: &dyn GithubApi, owner: &str, name: &str, out: &Path, resume: bool) -> Result<CollectSummary> {
  info!(repo = %format!("{}/{}", owner, name), "collecting pull requests");

  let mut checkpoint = CheckpointWriter::<PullRequestRecord>::open(out, resume)?;
  let done: HashSet<u64> = checkpoint.previous().iter().map(|r| r.pull_number).collect();
  if !done.is_empty() {
    info!(already_collected = done.len(), "resuming from checkpoint");
  }

  let listing = api.list_pulls(owner, name)?;
  let mut fetched = 0usize;

  for item in &listing {
    let Some(number) = item.fetch("number").to::<u64>() else {
      debug!("skipping listing entry without a number");
      continue;
    };
    if done.contains(&number) {
      continue;
    }

    let record = fetch_record(api, owner, name, number)?;
    checkpoint.push(&record)?;
    fetched += 1;

    if fetched % 50 == 0 {
      info!(fetched, total = listing.len(), "collection progress");
    }
  }

  let path = checkpoint.commit()?;
  let summary = CollectSummary {
    total: done.len() + fetched,
    resumed: done.len(),
    fetched,
  };
  info!(total = summary.total, out = %path.display(), "saved pull requests");

  Ok(summary)
}
