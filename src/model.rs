// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed CSV rows for every stage (pulls, releases, links, consolidated) plus validation on read
// role: model/types
// outputs: Serializable structs whose field names and order are the CSV contract
// invariants: Field order never changes; new fields are appended; timestamps stay strings on disk
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::util::parse_instant;

/// Row types persisted as CSV. `validate` runs on every record read back from disk.
pub trait CsvRecord: Serialize + serde::de::DeserializeOwned {
  /// Column names in serialization order; written even when a table has no rows.
  const HEADERS: &'static [&'static str];

  fn validate(&self) -> Result<(), String> {
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
  Open,
  Closed,
  Merged,
}

impl PrState {
  /// GitHub reports merged PRs as `closed`; `merged` takes precedence.
  pub fn from_api(state: &str, merged: bool) -> Self {
    if merged {
      PrState::Merged
    } else if state.eq_ignore_ascii_case("closed") {
      PrState::Closed
    } else {
      PrState::Open
    }
  }
}

impl fmt::Display for PrState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      PrState::Open => "open",
      PrState::Closed => "closed",
      PrState::Merged => "merged",
    };
    f.write_str(s)
  }
}

/// Comment timestamps, stored as one `;`-joined cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentDates(pub Vec<String>);

impl CommentDates {
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl Serialize for CommentDates {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0.join(";"))
  }
}

impl<'de> Deserialize<'de> for CommentDates {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(CommentDates(
      raw.split(';').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect(),
    ))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRecord {
  pub author: Option<String>,
  pub pull_number: u64,
  pub title: String,
  /// Length of the PR body in characters.
  pub description: usize,
  pub churn: i64,
  pub changed_files: i64,
  pub activities: i64,
  pub comments: i64,
  pub comment_dates: CommentDates,
  pub state: PrState,
  pub creation_date: String,
  pub close_date: Option<String>,
  pub closed_by: Option<String>,
  pub merged_at: Option<String>,
}

fn check_instant(field: &str, value: Option<&str>) -> Result<(), String> {
  match value {
    Some(v) if parse_instant(v).is_none() => Err(format!("{} is not a timestamp: {:?}", field, v)),
    _ => Ok(()),
  }
}

const PULL_FIELDS: [&str; 14] = [
  "author",
  "pull_number",
  "title",
  "description",
  "churn",
  "changed_files",
  "activities",
  "comments",
  "comment_dates",
  "state",
  "creation_date",
  "close_date",
  "closed_by",
  "merged_at",
];

impl CsvRecord for PullRequestRecord {
  const HEADERS: &'static [&'static str] = &PULL_FIELDS;

  fn validate(&self) -> Result<(), String> {
    if parse_instant(&self.creation_date).is_none() {
      return Err(format!(
        "pull #{}: creation_date is not a timestamp: {:?}",
        self.pull_number, self.creation_date
      ));
    }
    check_instant("close_date", self.close_date.as_deref())
      .and_then(|_| check_instant("merged_at", self.merged_at.as_deref()))
      .map_err(|e| format!("pull #{}: {}", self.pull_number, e))
  }
}

/// Commit range between two consecutive release tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInterval {
  /// End tag name.
  pub title: String,
  pub publish_date: String,
  pub start_date: String,
  pub number_of_commits: usize,
  pub number_of_prs: usize,
}

impl CsvRecord for ReleaseInterval {
  const HEADERS: &'static [&'static str] = &["title", "publish_date", "start_date", "number_of_commits", "number_of_prs"];

  fn validate(&self) -> Result<(), String> {
    check_instant("publish_date", Some(&self.publish_date))
      .and_then(|_| check_instant("start_date", Some(&self.start_date)))
      .map_err(|e| format!("release {}: {}", self.title, e))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseLink {
  pub pull_number: u64,
  pub release_tag: String,
}

impl CsvRecord for ReleaseLink {
  const HEADERS: &'static [&'static str] = &["pull_number", "release_tag"];
}

/// A pull request joined with the release that shipped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRecord {
  pub author: Option<String>,
  pub pull_number: u64,
  pub title: String,
  pub description: usize,
  pub churn: i64,
  pub changed_files: i64,
  pub activities: i64,
  pub comments: i64,
  pub comment_dates: CommentDates,
  pub state: PrState,
  pub creation_date: String,
  pub close_date: Option<String>,
  pub closed_by: Option<String>,
  pub merged_at: Option<String>,
  pub release_tag: Option<String>,
}

impl ConsolidatedRecord {
  pub fn from_pull(pr: PullRequestRecord, release_tag: Option<String>) -> Self {
    ConsolidatedRecord {
      author: pr.author,
      pull_number: pr.pull_number,
      title: pr.title,
      description: pr.description,
      churn: pr.churn,
      changed_files: pr.changed_files,
      activities: pr.activities,
      comments: pr.comments,
      comment_dates: pr.comment_dates,
      state: pr.state,
      creation_date: pr.creation_date,
      close_date: pr.close_date,
      closed_by: pr.closed_by,
      merged_at: pr.merged_at,
      release_tag,
    }
  }
}

impl CsvRecord for ConsolidatedRecord {
  const HEADERS: &'static [&'static str] = &[
    "author",
    "pull_number",
    "title",
    "description",
    "churn",
    "changed_files",
    "activities",
    "comments",
    "comment_dates",
    "state",
    "creation_date",
    "close_date",
    "closed_by",
    "merged_at",
    "release_tag",
  ];

  fn validate(&self) -> Result<(), String> {
    if parse_instant(&self.creation_date).is_none() {
      return Err(format!("pull #{}: creation_date is not a timestamp", self.pull_number));
    }
    check_instant("merged_at", self.merged_at.as_deref()).map_err(|e| format!("pull #{}: {}", self.pull_number, e))
  }
}

/// A consolidated PR with every timestamp the metrics engine needs, parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedPull {
  pub pull_number: u64,
  pub created_at: DateTime<Utc>,
  pub merged_at: Option<DateTime<Utc>>,
  pub release_published_at: Option<DateTime<Utc>>,
}
