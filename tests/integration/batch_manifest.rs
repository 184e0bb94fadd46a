#[test]
fn batch_records_each_repository_and_keeps_going() {
  let work = test_support::tempdir();
  let repos_dir = work.path().join("temp_repos");
  std::fs::create_dir_all(repos_dir.join("widgets")).unwrap();
  test_support::build_release_history(&repos_dir.join("widgets"));
  let out_dir = work.path().join("outputs");

  test_support::cmd_bin(work.path())
    .args(["batch", "acme/missing", "acme/widgets", "--ci-start", "2014-03-01"])
    .arg("--repos-dir")
    .arg(&repos_dir)
    .arg("--out-dir")
    .arg(&out_dir)
    .env("GITHUB_TOKEN", "dummy")
    .env("CDR_TEST_PULLS_JSON", test_support::pulls_fixture().to_string())
    .assert()
    .success();

  let manifest: serde_json::Value =
    serde_json::from_slice(&std::fs::read(out_dir.join("batch_manifest.json")).unwrap()).unwrap();
  assert_eq!(manifest["completed"], 1);
  assert_eq!(manifest["failed"], 1);
  assert_eq!(manifest["skipped"], 0);

  let repos = manifest["repos"].as_array().unwrap();
  assert_eq!(repos[0]["repo"], "acme/missing");
  assert_eq!(repos[0]["status"], "failed");
  assert_eq!(repos[0]["stage"], "collect-releases");
  assert_eq!(repos[1]["repo"], "acme/widgets");
  assert_eq!(repos[1]["status"], "completed");
  assert_eq!(repos[1]["result"]["project"], "widgets");

  let results = std::fs::read_to_string(out_dir.join("results_from_mined_data.csv")).unwrap();
  assert_eq!(results.lines().count(), 2);
}

#[test]
fn batch_marks_repositories_without_ci_as_skipped() {
  let work = test_support::tempdir();
  let repos_dir = work.path().join("temp_repos");
  std::fs::create_dir_all(repos_dir.join("widgets")).unwrap();
  test_support::build_release_history(&repos_dir.join("widgets"));
  let out_dir = work.path().join("outputs");

  test_support::cmd_bin(work.path())
    .args(["batch", "acme/widgets"])
    .arg("--repos-dir")
    .arg(&repos_dir)
    .arg("--out-dir")
    .arg(&out_dir)
    .env("GITHUB_TOKEN", "dummy")
    .env("TRAVIS_TOKEN", "dummy")
    .env("CDR_TEST_PULLS_JSON", test_support::pulls_fixture().to_string())
    .env("CDR_TEST_TRAVIS_JSON", r#"{"builds": []}"#)
    .assert()
    .success();

  let manifest: serde_json::Value =
    serde_json::from_slice(&std::fs::read(out_dir.join("batch_manifest.json")).unwrap()).unwrap();
  assert_eq!(manifest["skipped"], 1);
  assert_eq!(manifest["repos"][0]["status"], "skipped");
  assert!(!out_dir.join("results_from_mined_data.csv").exists());
}
