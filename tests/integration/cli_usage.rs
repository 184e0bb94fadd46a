use predicates::prelude::*;

#[test]
fn no_arguments_prints_usage_and_fails() {
  let td = test_support::tempdir();
  test_support::cmd_bin(td.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("Usage"));
}

#[test]
fn wrong_positional_count_is_a_usage_error() {
  let td = test_support::tempdir();
  test_support::cmd_bin(td.path()).args(["merge", "Yelp"]).assert().failure();
  test_support::cmd_bin(td.path())
    .args(["merge", "Yelp", "mrjob", "extra"])
    .assert()
    .failure();
}

#[test]
fn analyze_without_travis_token_names_the_variable() {
  let td = test_support::tempdir();
  test_support::cmd_bin(td.path())
    .args(["analyze", "Yelp", "mrjob"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("TRAVIS_TOKEN"));
}

#[test]
fn merge_without_inputs_names_the_missing_stage() {
  let td = test_support::tempdir();
  test_support::cmd_bin(td.path())
    .args(["merge", "Yelp", "mrjob", "--out-dir"])
    .arg(td.path().join("outputs"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("collect-pulls"));
}

#[test]
fn ci_start_override_is_printed_without_travis() {
  let td = test_support::tempdir();
  test_support::cmd_bin(td.path())
    .args(["ci-start", "Yelp", "mrjob", "--ci-start", "2013-02-01"])
    .assert()
    .success()
    .stdout(predicate::str::starts_with("2013-02-01T00:00:00Z"));
}
