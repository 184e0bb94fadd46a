// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: GitHub REST access for the collector (pulls, comments, events, issues) and token discovery
// role: github/api
// inputs: owner/name, PR numbers; env GITHUB_TOKEN / GH_TOKEN; optional `gh` CLI; CDR_TEST_* fixtures
// outputs: Raw JSON values, one per PR / comment / event
// side_effects: Network calls to api.github.com; spawns `gh` during token discovery
// invariants:
// - list endpoints follow Link pagination until exhausted
// - token discovery prefers GITHUB_TOKEN, then GH_TOKEN, then `gh auth token`
// - any CDR_TEST_* GitHub fixture switches the whole backend to the env fixture
// errors: PipelineError::{Api, Http}; env fixtures report malformed JSON as PipelineError::Json
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde_json::Value;

use crate::cli::HttpSettings;
use crate::error::{PipelineError, Result};
use crate::ext::serde_json::JsonFetch;
use crate::http::HttpClient;

const API_ROOT: &str = "https://api.github.com";

const ENV_PULLS: &str = "CDR_TEST_PULLS_JSON";
const ENV_ISSUE_COMMENTS: &str = "CDR_TEST_ISSUE_COMMENTS_JSON";
const ENV_REVIEW_COMMENTS: &str = "CDR_TEST_REVIEW_COMMENTS_JSON";
const ENV_ISSUE_EVENTS: &str = "CDR_TEST_ISSUE_EVENTS_JSON";
const ENV_ISSUES: &str = "CDR_TEST_ISSUES_JSON";

/// Discover a GitHub token: env vars first, then `gh auth token` if available.
pub fn discover_token() -> Option<String> {
  for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
    if let Ok(t) = std::env::var(var) {
      if !t.trim().is_empty() {
        return Some(t.trim().to_string());
      }
    }
  }

  if let Ok(output) = std::process::Command::new("gh").args(["auth", "token"]).output() {
    if output.status.success() {
      let t = String::from_utf8_lossy(&output.stdout).trim().to_string();

      if !t.is_empty() {
        return Some(t);
      }
    }
  }

  None
}

// --- Trait seam for GitHub API ---
pub trait GithubApi {
  /// Every pull request of the repository (`state=all`), in listing order.
  fn list_pulls(&self, owner: &str, name: &str) -> Result<Vec<Value>>;
  fn get_pull(&self, owner: &str, name: &str, number: u64) -> Result<Value>;
  fn list_issue_comments(&self, owner: &str, name: &str, number: u64) -> Result<Vec<Value>>;
  fn list_review_comments(&self, owner: &str, name: &str, number: u64) -> Result<Vec<Value>>;
  fn list_issue_events(&self, owner: &str, name: &str, number: u64) -> Result<Vec<Value>>;
  fn get_issue(&self, owner: &str, name: &str, number: u64) -> Result<Value>;
}

struct GithubHttpApi {
  client: HttpClient,
  headers: Vec<(&'static str, String)>,
}

impl GithubHttpApi {
  fn new(token: &str, settings: &HttpSettings) -> Self {
    Self {
      client: HttpClient::new("GitHub", settings),
      headers: vec![
        ("Accept", "application/vnd.github+json".to_string()),
        ("X-GitHub-Api-Version", "2022-11-28".to_string()),
        ("Authorization", format!("Bearer {}", token)),
      ],
    }
  }

  fn repo_url(owner: &str, name: &str, tail: &str) -> String {
    format!("{}/repos/{}/{}/{}", API_ROOT, owner, name, tail)
  }

  fn all(&self, url: &str) -> Result<Vec<Value>> {
    self.client.get_all_pages(url, &self.headers)
  }

  fn one(&self, url: &str) -> Result<Value> {
    Ok(self.client.get_json(url, &self.headers)?.body)
  }
}

impl GithubApi for GithubHttpApi {
  fn list_pulls(&self, owner: &str, name: &str) -> Result<Vec<Value>> {
    self.all(&Self::repo_url(owner, name, "pulls?state=all&per_page=100"))
  }

  fn get_pull(&self, owner: &str, name: &str, number: u64) -> Result<Value> {
    self.one(&Self::repo_url(owner, name, &format!("pulls/{}", number)))
  }

  fn list_issue_comments(&self, owner: &str, name: &str, number: u64) -> Result<Vec<Value>> {
    self.all(&Self::repo_url(owner, name, &format!("issues/{}/comments?per_page=100", number)))
  }

  fn list_review_comments(&self, owner: &str, name: &str, number: u64) -> Result<Vec<Value>> {
    self.all(&Self::repo_url(owner, name, &format!("pulls/{}/comments?per_page=100", number)))
  }

  fn list_issue_events(&self, owner: &str, name: &str, number: u64) -> Result<Vec<Value>> {
    self.all(&Self::repo_url(owner, name, &format!("issues/{}/events?per_page=100", number)))
  }

  fn get_issue(&self, owner: &str, name: &str, number: u64) -> Result<Value> {
    self.one(&Self::repo_url(owner, name, &format!("issues/{}", number)))
  }
}

/// Fixture backend reading canned payloads from CDR_TEST_* variables.
struct GithubEnvApi;

impl GithubEnvApi {
  fn load(var: &str) -> Result<Option<Value>> {
    match std::env::var(var) {
      Ok(s) => Ok(Some(serde_json::from_str::<Value>(&s)?)),
      Err(_) => Ok(None),
    }
  }

  /// Per-PR array from an object keyed by PR number; absent keys are empty.
  fn keyed_items(var: &str, number: u64) -> Result<Vec<Value>> {
    let Some(map) = Self::load(var)? else {
      return Ok(Vec::new());
    };
    Ok(map.fetch(&number.to_string()).items().to_vec())
  }

  fn not_found(what: &str, number: u64) -> PipelineError {
    PipelineError::Api {
      service: "GitHub",
      status: 404,
      url: format!("env:{}#{}", what, number),
    }
  }
}

impl GithubApi for GithubEnvApi {
  fn list_pulls(&self, _owner: &str, _name: &str) -> Result<Vec<Value>> {
    Ok(Self::load(ENV_PULLS)?.map(|v| v.fetch("").items().to_vec()).unwrap_or_default())
  }

  fn get_pull(&self, owner: &str, name: &str, number: u64) -> Result<Value> {
    self
      .list_pulls(owner, name)?
      .into_iter()
      .find(|pr| pr.fetch("number").to::<u64>() == Some(number))
      .ok_or_else(|| Self::not_found(ENV_PULLS, number))
  }

  fn list_issue_comments(&self, _owner: &str, _name: &str, number: u64) -> Result<Vec<Value>> {
    Self::keyed_items(ENV_ISSUE_COMMENTS, number)
  }

  fn list_review_comments(&self, _owner: &str, _name: &str, number: u64) -> Result<Vec<Value>> {
    Self::keyed_items(ENV_REVIEW_COMMENTS, number)
  }

  fn list_issue_events(&self, _owner: &str, _name: &str, number: u64) -> Result<Vec<Value>> {
    Self::keyed_items(ENV_ISSUE_EVENTS, number)
  }

  fn get_issue(&self, _owner: &str, _name: &str, number: u64) -> Result<Value> {
    let issues = Self::load(ENV_ISSUES)?.unwrap_or(Value::Null);
    Ok(issues.get(number.to_string()).cloned().unwrap_or(Value::Null))
  }
}

pub fn env_wants_mock() -> bool {
  [ENV_PULLS, ENV_ISSUE_COMMENTS, ENV_REVIEW_COMMENTS, ENV_ISSUE_EVENTS, ENV_ISSUES]
    .iter()
    .any(|v| std::env::var(v).is_ok())
}

/// Backend for the collector: the env fixture when any CDR_TEST_* GitHub variable is set, HTTP otherwise.
pub fn make_api(token: &str, settings: &HttpSettings) -> Box<dyn GithubApi> {
  if env_wants_mock() {
    tracing::debug!("using GitHub env fixtures");
    Box::new(GithubEnvApi)
  } else {
    Box::new(GithubHttpApi::new(token, settings))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  fn settings() -> HttpSettings {
    HttpSettings {
      max_retries: 0,
      retry_base_ms: 1,
      timeout_secs: 1,
    }
  }

  fn clear_fixtures() {
    for v in [ENV_PULLS, ENV_ISSUE_COMMENTS, ENV_REVIEW_COMMENTS, ENV_ISSUE_EVENTS, ENV_ISSUES] {
      std::env::remove_var(v);
    }
  }

  #[test]
  #[serial]
  fn token_env_precedence_and_fallbacks() {
    std::env::set_var("GITHUB_TOKEN", "primary-token");
    std::env::set_var("GH_TOKEN", "secondary-token");
    assert_eq!(discover_token().as_deref(), Some("primary-token"));

    std::env::remove_var("GITHUB_TOKEN");
    assert_eq!(discover_token().as_deref(), Some("secondary-token"));

    std::env::set_var("GH_TOKEN", "   ");
    let old_path = std::env::var("PATH").unwrap_or_default();
    // no `gh` reachable: nothing left to try
    std::env::set_var("PATH", "");
    assert_eq!(discover_token(), None);

    std::env::set_var("PATH", old_path);
    std::env::remove_var("GH_TOKEN");
  }

  #[test]
  #[serial]
  fn token_from_gh_cli_when_env_is_empty() {
    std::env::remove_var("GITHUB_TOKEN");
    std::env::remove_var("GH_TOKEN");

    let td = tempfile::TempDir::new().unwrap();
    let gh_path = td.path().join("gh");
    std::fs::write(&gh_path, "#!/bin/sh\necho token-from-gh\n").unwrap();
    {
      use std::os::unix::fs::PermissionsExt;
      let mut perms = std::fs::metadata(&gh_path).unwrap().permissions();
      perms.set_mode(0o755);
      std::fs::set_permissions(&gh_path, perms).unwrap();
    }

    let old_path = std::env::var("PATH").unwrap_or_default();
    std::env::set_var("PATH", format!("{}:{}", td.path().display(), old_path));
    assert_eq!(discover_token().as_deref(), Some("token-from-gh"));
    std::env::set_var("PATH", old_path);
  }

  #[test]
  #[serial]
  fn env_backend_serves_pulls_and_keyed_lists() {
    clear_fixtures();
    let _env = test_support::with_env(&[
      (ENV_PULLS, r#"[{"number": 3, "title": "a"}, {"number": 5, "title": "b"}]"#),
      (ENV_ISSUE_COMMENTS, r#"{"5": [{"created_at": "2014-01-01T00:00:00Z"}]}"#),
      (ENV_ISSUES, r#"{"3": {"closed_by": {"login": "closer"}}}"#),
    ]);
    assert!(env_wants_mock());

    let api = make_api("unused", &settings());
    assert_eq!(api.list_pulls("o", "r").unwrap().len(), 2);
    assert_eq!(api.get_pull("o", "r", 5).unwrap().fetch("title").to::<String>().as_deref(), Some("b"));
    assert!(matches!(api.get_pull("o", "r", 9), Err(PipelineError::Api { status: 404, .. })));
    assert_eq!(api.list_issue_comments("o", "r", 5).unwrap().len(), 1);
    assert!(api.list_issue_comments("o", "r", 3).unwrap().is_empty());
    assert!(api.list_review_comments("o", "r", 3).unwrap().is_empty());
    assert_eq!(
      api.get_issue("o", "r", 3).unwrap().fetch("closed_by.login").to::<String>().as_deref(),
      Some("closer")
    );
    assert!(api.get_issue("o", "r", 5).unwrap().is_null());
  }

  #[test]
  #[serial]
  fn malformed_fixture_is_a_json_error() {
    clear_fixtures();
    let _env = test_support::with_env(&[(ENV_PULLS, "not json")]);
    let api = make_api("unused", &settings());
    assert!(matches!(api.list_pulls("o", "r"), Err(PipelineError::Json(_))));
  }

  #[test]
  #[serial]
  fn no_fixture_means_http_backend() {
    clear_fixtures();
    assert!(!env_wants_mock());
  }
}
