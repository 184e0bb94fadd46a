use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::util::{parse_instant, run_git};

/// A tag and the committer time of the commit it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct TagInfo {
    pub name: String,
    pub committed_at: DateTime<Utc>,
}

pub struct CommitMessage {
    pub sha: String,
    pub message: String,
}

/// List tags in refname order. Annotated tags are peeled to their commit.
pub fn list_tags(repo: &Path) -> Result<Vec<TagInfo>> {
    let args: Vec<String> = vec![
        "for-each-ref".into(),
        "refs/tags".into(),
        "--format=%(refname:lstrip=2)%00%(*committerdate:iso-strict)%00%(committerdate:iso-strict)".into(),
    ];
    let out = run_git(repo, &args)?;
    let mut tags = Vec::new();
    for line in out.lines() {
        let parts: Vec<&str> = line.split('\u{0}').collect();
        if parts.len() != 3 || parts[0].is_empty() { continue; }
        // peeled date is empty for lightweight tags; tags on trees/blobs have neither
        let date = if parts[1].is_empty() { parts[2] } else { parts[1] };
        match parse_instant(date) {
            Some(committed_at) => tags.push(TagInfo { name: parts[0].to_string(), committed_at }),
            None => tracing::debug!(tag = parts[0], "skipping tag without a commit date"),
        }
    }
    Ok(tags)
}

/// Commits reachable from `end` but not from `start`, newest first.
pub fn commits_between(repo: &Path, start: &str, end: &str) -> Result<Vec<CommitMessage>> {
    let args: Vec<String> = vec![
        "-c".into(), "log.showSignature=false".into(),
        "log".into(),
        "--format=%x1e%H%x00%B".into(),
        format!("refs/tags/{}..refs/tags/{}", start, end),
    ];
    let out = run_git(repo, &args)?;
    Ok(out
        .split('\u{1e}')
        .filter_map(|chunk| {
            let (sha, message) = chunk.split_once('\u{0}')?;
            let sha = sha.trim();
            if sha.is_empty() { None } else { Some(CommitMessage { sha: sha.to_string(), message: message.trim_end().to_string() }) }
        })
        .collect())
}
