// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Find the CI adoption instant of a repository (first Travis build start), or take it from --ci-start
// role: stage/ci-boundary
// inputs: owner/name, Travis token, HttpSettings; CDR_TEST_TRAVIS_* fixtures
// outputs: Option<DateTime<Utc>>
// side_effects: One GET to api.travis-ci.com per lookup
// invariants:
// - any failure (status, transport, JSON shape, no builds, null started_at) is logged and yields None
// - an explicit override always wins and skips the lookup
// errors: Absorbed into None; callers decide whether absence is fatal
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::{EffectiveConfig, HttpSettings};
use crate::error::{PipelineError, Result};
use crate::ext::serde_json::JsonFetch;
use crate::http::HttpClient;

const TRAVIS_ROOT: &str = "https://api.travis-ci.com";
const ENV_TRAVIS_JSON: &str = "CDR_TEST_TRAVIS_JSON";
const ENV_TRAVIS_STATUS: &str = "CDR_TEST_TRAVIS_STATUS";

pub trait CiProvider {
  /// Builds payload for the repository's earliest build.
  fn first_builds(&self, owner: &str, name: &str) -> Result<Value>;
}

pub fn builds_url(owner: &str, name: &str) -> String {
  format!(
    "{}/repo/{}%2F{}/builds?limit=1&sort_by=started_at:asc",
    TRAVIS_ROOT, owner, name
  )
}

struct TravisHttp {
  client: HttpClient,
  token: String,
}

impl CiProvider for TravisHttp {
  fn first_builds(&self, owner: &str, name: &str) -> Result<Value> {
    let headers = [
      ("Travis-API-Version", "3".to_string()),
      ("Authorization", format!("token {}", self.token)),
    ];
    Ok(self.client.get_json(&builds_url(owner, name), &headers)?.body)
  }
}

/// Fixture backend: CDR_TEST_TRAVIS_JSON is the body, CDR_TEST_TRAVIS_STATUS an optional failing status.
struct TravisEnv;

impl CiProvider for TravisEnv {
  fn first_builds(&self, owner: &str, name: &str) -> Result<Value> {
    if let Some(status) = std::env::var(ENV_TRAVIS_STATUS).ok().and_then(|s| s.trim().parse::<u16>().ok()) {
      if !(200..300).contains(&status) {
        return Err(PipelineError::Api {
          service: "Travis",
          status,
          url: builds_url(owner, name),
        });
      }
    }
    let raw = std::env::var(ENV_TRAVIS_JSON).unwrap_or_default();
    Ok(serde_json::from_str::<Value>(&raw)?)
  }
}

pub fn env_wants_mock() -> bool {
  std::env::var(ENV_TRAVIS_JSON).is_ok() || std::env::var(ENV_TRAVIS_STATUS).is_ok()
}

pub fn make_provider(token: &str, settings: &HttpSettings) -> Box<dyn CiProvider> {
  if env_wants_mock() {
    Box::new(TravisEnv)
  } else {
    Box::new(TravisHttp {
      client: HttpClient::new("Travis", settings),
      token: token.to_string(),
    })
  }
}

/// `started_at` of the first build in a Travis v3 builds payload.
pub fn first_build_start(payload: &Value) -> Option<DateTime<Utc>> {
  payload.fetch("builds.0.started_at").to_instant()
}

/// Look up the first build; every failure is logged and reported as absence.
pub fn first_ci_build(provider: &dyn CiProvider, owner: &str, name: &str) -> Option<DateTime<Utc>> {
  let payload = match provider.first_builds(owner, name) {
    Ok(p) => p,
    Err(e) => {
      warn!(repo = %format!("{}/{}", owner, name), error = %e, "failed to fetch data from Travis API");
      return None;
    }
  };

  if payload.fetch("builds").items().is_empty() {
    warn!(repo = %format!("{}/{}", owner, name), "no Travis builds found");
    return None;
  }

  match first_build_start(&payload) {
    Some(dt) => {
      info!(repo = %format!("{}/{}", owner, name), ci_start = %dt, "CI start date detected via Travis API");
      Some(dt)
    }
    None => {
      warn!(repo = %format!("{}/{}", owner, name), "first Travis build has no started_at");
      None
    }
  }
}

/// CI cutoff for a repository: the configured override, else the Travis lookup.
pub fn ci_cutoff(cfg: &EffectiveConfig, owner: &str, name: &str) -> Result<Option<DateTime<Utc>>> {
  if let Some(dt) = cfg.ci_start {
    info!(ci_start = %dt, "using CI start override");
    return Ok(Some(dt));
  }
  let token = cfg.credentials.travis()?;
  let provider = make_provider(token, &cfg.http);
  Ok(first_ci_build(provider.as_ref(), owner, name))
}
