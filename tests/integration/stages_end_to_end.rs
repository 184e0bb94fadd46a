use predicates::prelude::*;

use crate::common;

const DELTA_MERGE: &str = "Cliff delta (estimate): merge time";
const MAGNITUDE_DELIVERY: &str = "Cliff delta (magnitude): delivery delay";
const P_LIFETIME: &str = "MWW test (p-value): PR lifetime";

#[test]
fn stages_run_one_by_one_produce_results_row() {
  let repo = test_support::release_fixture_repo();
  let work = test_support::tempdir();
  let out_dir = work.path().join("outputs");
  let pulls = test_support::pulls_fixture().to_string();

  test_support::cmd_bin(work.path())
    .args(["collect-pulls", "acme", "widgets"])
    .env("GITHUB_TOKEN", "dummy")
    .env("CDR_TEST_PULLS_JSON", &pulls)
    .arg("--out-dir")
    .arg(&out_dir)
    .assert()
    .success();
  let raw = std::fs::read_to_string(out_dir.join("acme_widgets_pulls_raw.csv")).unwrap();
  assert_eq!(raw.lines().count(), 6, "header plus five pulls:\n{raw}");

  test_support::cmd_bin(work.path())
    .args(["collect-releases", "acme", "widgets", "--repo-path"])
    .arg(repo.path())
    .arg("--out-dir")
    .arg(&out_dir)
    .assert()
    .success();
  let releases = std::fs::read_to_string(out_dir.join("widgets_releases_raw.csv")).unwrap();
  assert!(releases.contains("v1.1") && releases.contains("v2.0"));
  assert!(!releases.contains("v1.1-rc1"), "pre-releases are filtered:\n{releases}");
  let linked = std::fs::read_to_string(out_dir.join("widgets_releases_linked.csv")).unwrap();
  assert_eq!(linked.lines().count(), 5, "header plus four links:\n{linked}");

  test_support::cmd_bin(work.path())
    .args(["merge", "acme", "widgets", "--out-dir"])
    .arg(&out_dir)
    .assert()
    .success();
  let merged = std::fs::read_to_string(out_dir.join("widgets_data_merged.csv")).unwrap();
  assert_eq!(merged.lines().count(), 6, "left join keeps the open PR:\n{merged}");

  test_support::cmd_bin(work.path())
    .args(["analyze", "acme", "widgets", "--print", "--ci-start", "2014-03-01"])
    .arg("--out-dir")
    .arg(&out_dir)
    .assert()
    .success()
    .stdout(predicate::str::starts_with("widgets\n"))
    .stdout(predicate::str::contains("Merge Time"))
    .stdout(predicate::str::contains("large"));
  let results = out_dir.join("results_from_mined_data.csv");
  assert!(!results.exists(), "--print must not touch the results file");

  test_support::cmd_bin(work.path())
    .args(["analyze", "acme", "widgets", "--ci-start", "2014-03-01"])
    .arg("--out-dir")
    .arg(&out_dir)
    .assert()
    .success();

  // every after-CI duration is shorter than every before-CI one
  assert_eq!(common::cell(&results, "widgets", DELTA_MERGE).as_deref(), Some("-1.0000000000"));
  assert_eq!(common::cell(&results, "widgets", MAGNITUDE_DELIVERY).as_deref(), Some("large"));
  assert_eq!(common::cell(&results, "widgets", P_LIFETIME).as_deref(), Some("0.3333333333"));
}

#[test]
fn analyze_twice_keeps_a_single_row() {
  let repo = test_support::release_fixture_repo();
  let work = test_support::tempdir();
  let out_dir = work.path().join("outputs");
  let results = work.path().join("custom_results.csv");

  for _ in 0..2 {
    test_support::cmd_bin(work.path())
      .args(["run", "acme", "widgets", "--ci-start", "2014-03-01", "--repo-path"])
      .arg(repo.path())
      .arg("--out-dir")
      .arg(&out_dir)
      .arg("--results")
      .arg(&results)
      .env("GITHUB_TOKEN", "dummy")
      .env("CDR_TEST_PULLS_JSON", test_support::pulls_fixture().to_string())
      .assert()
      .success();
  }

  let (headers, rows) = common::read_results(&results);
  assert_eq!(headers.len(), 10);
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0][0], "widgets");
}

#[test]
fn collect_releases_without_clone_fails_with_hint() {
  let work = test_support::tempdir();
  test_support::cmd_bin(work.path())
    .args(["collect-releases", "acme", "widgets", "--repos-dir"])
    .arg(work.path().join("nowhere"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("repository clone not found"));
}
