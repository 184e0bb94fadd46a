use predicates::prelude::*;

use crate::common;

const DATASET: &str = "project,language,merge_time,delivery_time,practice\n\
a/one,Java,1,40,NO-CI\n\
a/one,Java,2,50,NO-CI\n\
a/one,Java,3,60,NO-CI\n\
a/one,Java,1,4,CI\n\
a/one,Java,2,5,CI\n\
b/two,Ruby,1,1,CI\n";

#[test]
fn dataset_results_go_to_their_own_file() {
  let work = test_support::tempdir();
  let data = work.path().join("pull_requests_meta_data.csv");
  std::fs::write(&data, DATASET).unwrap();
  let out_dir = work.path().join("outputs");

  test_support::cmd_bin(work.path())
    .arg("analyze-dataset")
    .arg(&data)
    .arg("--out-dir")
    .arg(&out_dir)
    .assert()
    .success();

  let results = out_dir.join("results_from_original_data.csv");
  let (_, rows) = common::read_results(&results);
  assert_eq!(rows.len(), 1, "one-sided projects are skipped");
  assert_eq!(
    common::cell(&results, "a/one", "Cliff delta (magnitude): delivery delay").as_deref(),
    Some("large")
  );
  assert!(!out_dir.join("results_from_mined_data.csv").exists());
}

#[test]
fn dataset_print_writes_nothing() {
  let work = test_support::tempdir();
  let data = work.path().join("data.csv");
  std::fs::write(&data, DATASET).unwrap();
  let out = work.path().join("dataset_results.csv");

  test_support::cmd_bin(work.path())
    .arg("analyze-dataset")
    .arg(&data)
    .arg("--print")
    .arg("--out")
    .arg(&out)
    .assert()
    .success()
    .stdout(predicate::str::contains("a/one"))
    .stdout(predicate::str::contains("Delivery Delay"));
  assert!(!out.exists());
}

#[test]
fn missing_dataset_fails() {
  let work = test_support::tempdir();
  test_support::cmd_bin(work.path())
    .args(["analyze-dataset", "does_not_exist.csv"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("dataset not found"));
}
