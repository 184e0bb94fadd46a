// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed error taxonomy shared by every pipeline stage
// role: errors
// outputs: PipelineError and the crate-wide Result alias
// invariants: Config and MissingInput messages tell the operator what to do next
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
  /// A required credential or setting is absent.
  #[error("configuration error: {0}")]
  Config(String),

  /// A CSV expected from an earlier stage does not exist.
  #[error("missing input {}: run `{stage}` for this repository first", path.display())]
  MissingInput { path: PathBuf, stage: &'static str },

  /// Non-success response from an external API.
  #[error("{service} API returned HTTP {status} for {url}")]
  Api {
    service: &'static str,
    status: u16,
    url: String,
  },

  /// Transport-level failure talking to an external API.
  #[error("{service} request to {url} failed: {message}")]
  Http {
    service: &'static str,
    url: String,
    message: String,
  },

  #[error("git {args:?} failed: {stderr}")]
  Git { args: Vec<String>, stderr: String },

  #[error("invalid record in {}: {reason}", path.display())]
  InvalidRecord { path: PathBuf, reason: String },

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl PipelineError {
  pub fn missing_input(path: impl Into<PathBuf>, stage: &'static str) -> Self {
    PipelineError::MissingInput { path: path.into(), stage }
  }
}
