// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Dotted-path access into GitHub/Travis payloads with typed, null-aware extraction
// role: extension/serde_json
// outputs: JsonFetch trait and JsonFetched wrapper (typed values, instants, counts, array items)
// invariants: No panics; missing paths and JSON null both yield None
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::util::parse_instant;

/// A location inside a JSON document, resolved by `JsonFetch::fetch`.
pub struct JsonFetched<'a> {
  inner: Option<&'a serde_json::Value>,
}

impl<'a> JsonFetched<'a> {
  fn present(&self) -> Option<&'a serde_json::Value> {
    self.inner.filter(|v| !v.is_null())
  }

  /// Attempt to deserialize the fetched value as `T`.
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self.present().and_then(|v| T::deserialize(v).ok())
  }

  /// Deserialize as `T`, returning `T::default()` on failure.
  pub fn to_or_default<T>(&self) -> T
  where
    T: DeserializeOwned + Default,
  {
    self.to::<T>().unwrap_or_default()
  }

  /// Interpret the value as a timestamp string.
  pub fn to_instant(&self) -> Option<DateTime<Utc>> {
    self.present().and_then(|v| v.as_str()).and_then(parse_instant)
  }

  /// Integer counter; absent or non-numeric fields count as zero.
  pub fn count(&self) -> i64 {
    self.present().and_then(|v| v.as_i64()).unwrap_or(0)
  }

  /// Elements when the value is an array; empty otherwise.
  pub fn items(&self) -> &'a [serde_json::Value] {
    self.present().and_then(|v| v.as_array()).map(|a| a.as_slice()).unwrap_or(&[])
  }
}

/// Extension to fetch nested values via dotted paths like "merged_by.login".
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;
}

impl JsonFetch for serde_json::Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;

    for key in path.split('.') {
      let next = match key.parse::<usize>() {
        Ok(idx) if cur.is_array() => cur.get(idx),
        _ => cur.get(key),
      };
      match next {
        Some(n) => cur = n,
        None => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }
}
