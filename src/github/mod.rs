// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Namespace for the GitHub collector (API seam and PR record building)
// role: github/namespace
// outputs: api (trait + HTTP/env backends, token discovery) and pulls (collector stage)
// invariants: Network access stays behind the GithubApi trait
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod api;
pub mod pulls;
