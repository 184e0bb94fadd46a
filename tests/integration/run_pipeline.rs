use predicates::prelude::*;

use crate::common;

fn run_cmd(work: &std::path::Path, repo: &std::path::Path) -> assert_cmd::Command {
  let mut cmd = test_support::cmd_bin(work);
  cmd
    .args(["run", "acme", "widgets", "--repo-path"])
    .arg(repo)
    .arg("--out-dir")
    .arg(work.join("outputs"))
    .env("GITHUB_TOKEN", "dummy")
    .env("TRAVIS_TOKEN", "dummy")
    .env("CDR_TEST_PULLS_JSON", test_support::pulls_fixture().to_string());
  cmd
}

#[test]
fn run_uses_first_travis_build_as_cutoff() {
  let repo = test_support::release_fixture_repo();
  let work = test_support::tempdir();

  run_cmd(work.path(), repo.path())
    .env("CDR_TEST_TRAVIS_JSON", test_support::travis_fixture("2014-03-01T08:30:00Z").to_string())
    .assert()
    .success();

  let results = work.path().join("outputs").join("results_from_mined_data.csv");
  assert_eq!(
    common::cell(&results, "widgets", "Cliff delta (estimate): delivery delay").as_deref(),
    Some("-1.0000000000")
  );
}

#[test]
fn run_without_ci_start_fails_and_writes_no_results() {
  let repo = test_support::release_fixture_repo();
  let work = test_support::tempdir();

  run_cmd(work.path(), repo.path())
    .env("CDR_TEST_TRAVIS_STATUS", "500")
    .assert()
    .failure()
    .stderr(predicate::str::contains("CI start date not found"));

  assert!(!work.path().join("outputs").join("results_from_mined_data.csv").exists());
  // earlier stages still left their tables behind
  assert!(work.path().join("outputs").join("widgets_data_merged.csv").exists());
}

#[test]
fn run_against_repo_without_releases_is_refused() {
  let repo = test_support::tempdir();
  test_support::init_repo(repo.path());
  test_support::commit_at(repo.path(), "Merge pull request #1 from dev/x", "2014-01-05T00:00:00Z");
  let work = test_support::tempdir();

  run_cmd(work.path(), repo.path())
    .arg("--ci-start")
    .arg("2014-03-01")
    .assert()
    .failure()
    .stderr(predicate::str::contains("no release data"));
}

#[test]
fn malformed_pulls_payload_stops_at_collect_pulls() {
  let repo = test_support::release_fixture_repo();
  let work = test_support::tempdir();

  run_cmd(work.path(), repo.path())
    .arg("--ci-start")
    .arg("2014-03-01")
    .env("CDR_TEST_PULLS_JSON", "{not json")
    .assert()
    .failure()
    .stderr(predicate::str::contains("collect-pulls"));
}
