// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Blocking JSON GET with bounded retry/backoff and Link-header pagination
// role: io/http
// inputs: URL, extra headers, HttpSettings (attempts, base delay, timeout)
// outputs: JsonPage (status-checked JSON body plus the rel="next" URL when present)
// side_effects: Network calls; sleeps between attempts
// invariants:
// - only transport errors, 429, 5xx and rate-limited 403 are retried
// - the delay doubles per attempt; Retry-After (seconds) wins when the server sends it
// - pagination follows rel="next" only
// errors: PipelineError::Api for final non-2xx, PipelineError::Http for transport/JSON failures
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cli::HttpSettings;
use crate::error::{PipelineError, Result};

const USER_AGENT: &str = "ci-delivery-replication";
const MAX_RESET_WAIT_SECS: u64 = 15 * 60;

pub struct JsonPage {
  pub body: Value,
  pub next: Option<String>,
}

/// Extract the `rel="next"` target from a GitHub `Link` header.
pub fn next_link(header: &str) -> Option<String> {
  header.split(',').find_map(|part| {
    let mut pieces = part.split(';');
    let target = pieces.next()?.trim();
    let is_next = pieces.any(|p| {
      let p = p.trim();
      p == "rel=\"next\"" || p == "rel=next"
    });
    if !is_next {
      return None;
    }
    target
      .strip_prefix('<')
      .and_then(|t| t.strip_suffix('>'))
      .map(|t| t.to_string())
  })
}

/// Delay before retry number `attempt` (0-based).
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
  base.saturating_mul(2u32.saturating_pow(attempt.min(16)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
  Done,
  Retry,
  Fail,
}

fn classify(status: u16, rate_limit_remaining: Option<&str>, has_retry_after: bool) -> Verdict {
  match status {
    200..=299 => Verdict::Done,
    429 => Verdict::Retry,
    500..=599 => Verdict::Retry,
    403 if has_retry_after || rate_limit_remaining.map(str::trim) == Some("0") => Verdict::Retry,
    _ => Verdict::Fail,
  }
}

fn header_str<'a>(resp: &'a ureq::http::Response<ureq::Body>, name: &str) -> Option<&'a str> {
  resp.headers().get(name).and_then(|v| v.to_str().ok())
}

pub struct HttpClient {
  agent: ureq::Agent,
  service: &'static str,
  settings: HttpSettings,
}

impl HttpClient {
  pub fn new(service: &'static str, settings: &HttpSettings) -> Self {
    let agent: ureq::Agent = ureq::Agent::config_builder()
      .http_status_as_error(false)
      .timeout_global(Some(settings.timeout()))
      .build()
      .into();

    HttpClient {
      agent,
      service,
      settings: settings.clone(),
    }
  }

  /// GET `url` and decode the body as JSON, retrying transient failures.
  pub fn get_json(&self, url: &str, headers: &[(&str, String)]) -> Result<JsonPage> {
    let mut attempt: u32 = 0;

    loop {
      let mut req = self.agent.get(url).header("User-Agent", USER_AGENT);
      for (k, v) in headers {
        req = req.header(*k, v.as_str());
      }

      let wait = match req.call() {
        Err(e) => {
          if attempt >= self.settings.max_retries {
            return Err(PipelineError::Http {
              service: self.service,
              url: url.to_string(),
              message: e.to_string(),
            });
          }
          warn!(service = self.service, url, attempt, error = %e, "request failed; retrying");
          backoff_delay(self.settings.retry_base(), attempt)
        }
        Ok(mut resp) => {
          let status = resp.status().as_u16();
          let retry_after = header_str(&resp, "retry-after").and_then(|s| s.trim().parse::<u64>().ok());
          let remaining = header_str(&resp, "x-ratelimit-remaining").map(str::to_string);
          let reset = header_str(&resp, "x-ratelimit-reset").and_then(|s| s.trim().parse::<i64>().ok());

          match classify(status, remaining.as_deref(), retry_after.is_some()) {
            Verdict::Done => {
              let next = header_str(&resp, "link").and_then(next_link);
              let body = resp
                .body_mut()
                .read_json::<Value>()
                .map_err(|e| PipelineError::Http {
                  service: self.service,
                  url: url.to_string(),
                  message: format!("invalid JSON body: {}", e),
                })?;
              debug!(service = self.service, url, status, has_next = next.is_some(), "fetched");
              return Ok(JsonPage { body, next });
            }
            Verdict::Fail => {
              return Err(PipelineError::Api {
                service: self.service,
                status,
                url: url.to_string(),
              });
            }
            Verdict::Retry if attempt >= self.settings.max_retries => {
              return Err(PipelineError::Api {
                service: self.service,
                status,
                url: url.to_string(),
              });
            }
            Verdict::Retry => {
              let wait = match (retry_after, remaining.as_deref(), reset) {
                (Some(secs), _, _) => Duration::from_secs(secs),
                (None, Some("0"), Some(reset_at)) => {
                  let secs = (reset_at - chrono::Utc::now().timestamp()).max(1) as u64;
                  Duration::from_secs(secs.min(MAX_RESET_WAIT_SECS))
                }
                _ => backoff_delay(self.settings.retry_base(), attempt),
              };
              warn!(service = self.service, url, status, attempt, wait_ms = wait.as_millis() as u64, "transient status; retrying");
              wait
            }
          }
        }
      };

      std::thread::sleep(wait);
      attempt += 1;
    }
  }

  /// Follow `rel="next"` from `url` and concatenate every page's array items.
  pub fn get_all_pages(&self, url: &str, headers: &[(&str, String)]) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    let mut next = Some(url.to_string());
    let mut pages = 0usize;

    while let Some(u) = next {
      let page = self.get_json(&u, headers)?;
      pages += 1;
      match page.body {
        Value::Array(items) => out.extend(items),
        other => {
          return Err(PipelineError::Http {
            service: self.service,
            url: u,
            message: format!("expected a JSON array, got {}", json_kind(&other)),
          })
        }
      }
      next = page.next;
    }

    debug!(service = self.service, url, pages, items = out.len(), "pagination exhausted");
    Ok(out)
  }
}

fn json_kind(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
