// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Two-sample nonparametric statistics: Mann-Whitney U (two-sided) and Cliff's delta with magnitude bands
// role: statistics
// inputs: Two non-empty samples of finite f64 values
// outputs: RankSumTest (U for the first sample, p-value, method), delta in [-1, 1], Magnitude
// invariants:
// - p-value is always within [0, 1] and symmetric in argument order
// - cliffs_delta(x, y) == -cliffs_delta(y, x)
// - magnitude thresholds are 0.147 / 0.33 / 0.474 on |delta|, lower bound inclusive
// errors: Empty samples yield None; no panics
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

/// Effect-size band for Cliff's delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Magnitude {
  Negligible,
  Small,
  Medium,
  Large,
}

impl Magnitude {
  pub const SMALL_AT: f64 = 0.147;
  pub const MEDIUM_AT: f64 = 0.33;
  pub const LARGE_AT: f64 = 0.474;

  pub fn from_delta(delta: f64) -> Self {
    let d = delta.abs();
    if d < Self::SMALL_AT {
      Magnitude::Negligible
    } else if d < Self::MEDIUM_AT {
      Magnitude::Small
    } else if d < Self::LARGE_AT {
      Magnitude::Medium
    } else {
      Magnitude::Large
    }
  }
}

impl fmt::Display for Magnitude {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Magnitude::Negligible => "negligible",
      Magnitude::Small => "small",
      Magnitude::Medium => "medium",
      Magnitude::Large => "large",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PValueMethod {
  Exact,
  Asymptotic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankSumTest {
  /// U statistic of the first sample.
  pub u: f64,
  pub p_value: f64,
  pub method: PValueMethod,
}

/// Above this many arrangements the exact null distribution no longer fits in i128.
const EXACT_MAX_ARRANGEMENTS: f64 = 1e36;

/// Average ranks (1-based) of `values` plus the sizes of tie groups.
fn average_ranks(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
  let mut order: Vec<usize> = (0..values.len()).collect();
  order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

  let mut ranks = vec![0.0; values.len()];
  let mut ties = Vec::new();
  let mut i = 0;
  while i < order.len() {
    let mut j = i + 1;
    while j < order.len() && values[order[j]] == values[order[i]] {
      j += 1;
    }
    // positions i..j share the mean of ranks i+1..=j
    let rank = (i + 1 + j) as f64 / 2.0;
    for &idx in &order[i..j] {
      ranks[idx] = rank;
    }
    if j - i > 1 {
      ties.push(j - i);
    }
    i = j;
  }

  (ranks, ties)
}

fn ln_binomial(n: usize, k: usize) -> f64 {
  (1..=k).map(|i| ((n - k + i) as f64).ln() - (i as f64).ln()).sum()
}

/// Frequencies of U = 0..=m*n under the null, i.e. the coefficients of the
/// Gaussian binomial [m+n choose m]_q, built one factor at a time.
fn exact_u_frequencies(m: usize, n: usize) -> Vec<i128> {
  let mut coeffs: Vec<i128> = vec![1];
  for i in 1..=m {
    // multiply by (1 - q^(n+i))
    let shift = n + i;
    let mut next = vec![0i128; coeffs.len() + shift];
    for (j, c) in coeffs.iter().enumerate() {
      next[j] += c;
      next[j + shift] -= c;
    }
    // divide by (1 - q^i); the quotient has degree i*n
    let len = i * n + 1;
    let mut quotient = vec![0i128; len];
    for j in 0..len {
      quotient[j] = next[j] + if j >= i { quotient[j - i] } else { 0 };
    }
    coeffs = quotient;
  }
  coeffs
}

/// P(U >= k) under the null for sample sizes m and n.
fn exact_sf(k: usize, m: usize, n: usize) -> f64 {
  let freq = exact_u_frequencies(m.min(n), m.max(n));
  let total: i128 = freq.iter().sum();
  let tail: i128 = freq.iter().skip(k).sum();
  tail as f64 / total as f64
}

/// Two-sided Mann-Whitney U test.
///
/// Uses the exact null distribution when either sample has at most 8 values
/// and there are no ties; otherwise the normal approximation with tie and
/// continuity corrections.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Option<RankSumTest> {
  let (n1, n2) = (x.len(), y.len());
  if n1 == 0 || n2 == 0 {
    return None;
  }

  let combined: Vec<f64> = x.iter().chain(y.iter()).copied().collect();
  let (ranks, ties) = average_ranks(&combined);
  let r1: f64 = ranks[..n1].iter().sum();

  let (n1f, n2f) = (n1 as f64, n2 as f64);
  let u1 = r1 - n1f * (n1f + 1.0) / 2.0;
  let u2 = n1f * n2f - u1;
  let u = u1.max(u2);

  let small = n1 <= 8 || n2 <= 8;
  let fits = ln_binomial(n1 + n2, n1.min(n2)) < EXACT_MAX_ARRANGEMENTS.ln();

  let (p, method) = if small && ties.is_empty() && fits {
    (2.0 * exact_sf(u.round() as usize, n1, n2), PValueMethod::Exact)
  } else {
    let n = n1f + n2f;
    let mu = n1f * n2f / 2.0;
    let tie_term: f64 = ties.iter().map(|&t| (t as f64).powi(3) - t as f64).sum();
    let sigma = (n1f * n2f / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();
    let p = if sigma > 0.0 {
      let z = (u - mu - 0.5) / sigma;
      let normal = Normal::new(0.0, 1.0).ok()?;
      2.0 * normal.sf(z)
    } else {
      // every observation tied
      1.0
    };
    (p, PValueMethod::Asymptotic)
  };

  Some(RankSumTest {
    u: u1,
    p_value: p.clamp(0.0, 1.0),
    method,
  })
}

/// Cliff's delta: P(x > y) - P(x < y) over all pairs.
pub fn cliffs_delta(x: &[f64], y: &[f64]) -> Option<f64> {
  if x.is_empty() || y.is_empty() {
    return None;
  }

  let mut sorted = y.to_vec();
  sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

  let mut dominance: i64 = 0;
  for &xi in x {
    let below = sorted.partition_point(|&v| v < xi);
    let not_above = sorted.partition_point(|&v| v <= xi);
    let above = sorted.len() - not_above;
    dominance += below as i64 - above as i64;
  }

  Some(dominance as f64 / (x.len() * y.len()) as f64)
}
