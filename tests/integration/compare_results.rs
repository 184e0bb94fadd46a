use predicates::prelude::*;

use crate::common;

#[test]
fn combined_file_interleaves_shared_projects() {
  let work = test_support::tempdir();
  let ours = work.path().join("results_from_mined_data.csv");
  let authors = work.path().join("wilcoxon_results.csv");
  std::fs::write(
    &ours,
    "project,Cliff delta (estimate): merge time,MWW test (p-value): merge time\n\
     Hystrix,-0.25,0.04\n\
     backbone,0.1,0.5\n",
  )
  .unwrap();
  std::fs::write(
    &authors,
    "Project,Cliff_delta_(estimate):_merge_time,mww-test-(p-value):-merge-time\n\
     hystrix,-0.3,0.01\n\
     serverspec,0.2,0.2\n",
  )
  .unwrap();
  let out_dir = work.path().join("outputs");

  test_support::cmd_bin(work.path())
    .arg("compare-results")
    .arg(&ours)
    .arg(&authors)
    .arg("--out-dir")
    .arg(&out_dir)
    .assert()
    .success();

  let (headers, rows) = common::read_results(&out_dir.join("comparison_combined_results.csv"));
  assert_eq!(
    headers,
    vec!["source", "project", "cliff delta (estimate): merge time", "mww test (p value): merge time"]
  );
  assert_eq!(rows, vec![
    vec!["your_file", "hystrix", "-0.25", "0.04"],
    vec!["author_file", "hystrix", "-0.3", "0.01"],
  ]);
}

#[test]
fn missing_results_file_fails() {
  let work = test_support::tempdir();
  std::fs::write(work.path().join("authors.csv"), "project\nx\n").unwrap();
  test_support::cmd_bin(work.path())
    .args(["compare-results", "ours.csv", "authors.csv"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("results file not found"));
}
