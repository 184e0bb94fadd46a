//! test-support: helpers for robust, nextest-friendly tests.
//!
//! Add as a dev-dependency in your top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support", features = ["serde"] }
//! ```
//!
//! Then in tests:
//! ```rust,no_run
//! use test_support::{cmd_bin, release_fixture_repo};
//!
//! let repo = release_fixture_repo();
//! let mut cmd = cmd_bin(repo.path());
//! cmd.arg("--help");
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::Path;
use std::process::Command;

pub const BIN: &str = "ci-delivery-replication";

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,test=info"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Every variable the binary reads for credentials or fixtures.
pub const PIPELINE_ENV: [&str; 12] = [
    "GITHUB_TOKEN",
    "GH_TOKEN",
    "TRAVIS_TOKEN",
    "CDR_OUTPUT_DIR",
    "CDR_REPOS_DIR",
    "CDR_TEST_PULLS_JSON",
    "CDR_TEST_ISSUE_COMMENTS_JSON",
    "CDR_TEST_REVIEW_COMMENTS_JSON",
    "CDR_TEST_ISSUE_EVENTS_JSON",
    "CDR_TEST_ISSUES_JSON",
    "CDR_TEST_TRAVIS_JSON",
    "CDR_TEST_TRAVIS_STATUS",
];

/// Binary command isolated from the caller's credentials and fixtures.
///
/// Runs inside `cwd` so no stray `.env` is picked up.
pub fn cmd_bin(cwd: &Path) -> assert_cmd::Command {
    init_tracing();
    let mut cmd = assert_cmd::Command::cargo_bin(BIN).expect("binary target not found");
    cmd.current_dir(cwd);
    for var in PIPELINE_ENV {
        cmd.env_remove(var);
    }
    // `gh auth token` must not leak a real token into tests
    cmd.env("PATH", "/usr/bin:/bin");
    cmd
}

/// Set multiple environment variables for the duration of the returned guard.
pub fn with_env(vars: &[(&str, &str)]) -> EnvGuard {
    EnvGuard::set_many(vars)
}

/// Guard for temporarily setting environment variables.
pub struct EnvGuard {
    prev: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set_many(kv: &[(&str, &str)]) -> Self {
        let mut prev = Vec::with_capacity(kv.len());
        for (k, v) in kv {
            prev.push((k.to_string(), std::env::var(k).ok()));
            std::env::set_var(k, v);
        }
        Self { prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in self.prev.drain(..) {
            match old {
                Some(v) => std::env::set_var(&k, v),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// --- git fixtures ---

pub fn run(repo: &Path, args: &[&str]) {
    let status = Command::new("git").args(args).current_dir(repo).status().unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

/// Empty commit with author and committer date pinned to `date`.
pub fn commit_at(repo: &Path, message: &str, date: &str) {
    let status = Command::new("git")
        .args(["commit", "-q", "--allow-empty", "-m", message])
        .current_dir(repo)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .status()
        .unwrap();
    assert!(status.success(), "git commit {:?} failed", message);
}

pub fn init_repo(repo: &Path) {
    run(repo, &["init", "-q", "-b", "main"]);
    run(repo, &["config", "user.name", "Fixture Bot"]);
    run(repo, &["config", "user.email", "fixture@example.com"]);
    run(repo, &["config", "commit.gpgsign", "false"]);
    run(repo, &["config", "tag.gpgsign", "false"]);
}

/// Populate `repo` with tags and GitHub-style merge commits:
///
/// - `v1.0` (2014-01-01)
/// - PRs #1 and #2, pre-release `v1.1-rc1`, then `v1.1` (2014-02-01)
/// - PRs #3 and #4, then `v2.0` (2014-05-01)
///
/// PR #5 is never merged into a release.
pub fn build_release_history(repo: &Path) {
    init_repo(repo);
    commit_at(repo, "initial import", "2014-01-01T00:00:00Z");
    run(repo, &["tag", "v1.0"]);

    commit_at(repo, "Merge pull request #1 from dev/feature-one", "2014-01-05T00:00:00Z");
    commit_at(repo, "Merge pull request #2 from dev/feature-two", "2014-01-10T00:00:00Z");
    commit_at(repo, "bump version", "2014-01-12T00:00:00Z");
    run(repo, &["tag", "v1.1-rc1"]);
    commit_at(repo, "release 1.1", "2014-02-01T00:00:00Z");
    run(repo, &["tag", "v1.1"]);

    commit_at(repo, "Merge pull request #3 from dev/feature-three", "2014-04-02T00:00:00Z");
    commit_at(repo, "Merge pull request #4 from dev/feature-four", "2014-04-05T00:00:00Z");
    commit_at(repo, "fix typo", "2014-04-20T00:00:00Z");
    run(repo, &["tag", "-a", "v2.0", "-m", "release 2.0"]);
}

/// Fresh temp repository with the history of `build_release_history`.
pub fn release_fixture_repo() -> tempfile::TempDir {
    let dir = tempdir();
    build_release_history(dir.path());
    dir
}

// --- API payload fixtures (feature = "serde") ---

/// A GitHub pull request payload as returned by `GET /repos/{o}/{r}/pulls/{n}`.
#[cfg(feature = "serde")]
pub fn pull_json(number: u64, created: &str, merged: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "number": number,
        "title": format!("Feature {}", number),
        "user": {"login": format!("contributor{}", number)},
        "body": "Adds a feature.",
        "additions": 10 * number,
        "deletions": number,
        "changed_files": 2,
        "comments": 1,
        "review_comments": 0,
        "state": if merged.is_some() { "closed" } else { "open" },
        "merged": merged.is_some(),
        "merged_by": merged.map(|_| serde_json::json!({"login": "maintainer"})),
        "created_at": created,
        "closed_at": merged,
        "merged_at": merged,
    })
}

/// Pulls #1-#5 matching `build_release_history`: #1/#2 before 2014-03-01, #3/#4 after, #5 open.
#[cfg(feature = "serde")]
pub fn pulls_fixture() -> serde_json::Value {
    serde_json::json!([
        pull_json(1, "2014-01-02T00:00:00Z", Some("2014-01-04T00:00:00Z")),
        pull_json(2, "2014-01-03T00:00:00Z", Some("2014-01-09T00:00:00Z")),
        pull_json(3, "2014-04-01T00:00:00Z", Some("2014-04-01T12:00:00Z")),
        pull_json(4, "2014-04-03T00:00:00Z", Some("2014-04-04T00:00:00Z")),
        pull_json(5, "2014-04-10T00:00:00Z", None),
    ])
}

/// Travis v3 builds payload whose first build started at `started_at`.
#[cfg(feature = "serde")]
pub fn travis_fixture(started_at: &str) -> serde_json::Value {
    serde_json::json!({
        "@type": "builds",
        "builds": [{"id": 1, "number": "1", "state": "passed", "started_at": started_at}],
    })
}
