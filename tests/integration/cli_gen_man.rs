#[test]
fn cli_generates_man_page() {
  let td = test_support::tempdir();
  let out = test_support::cmd_bin(td.path()).arg("--gen-man").output().unwrap();
  assert!(out.status.success());
  let s = String::from_utf8_lossy(&out.stdout);
  // clap_mangen emits a roff manpage starting with .TH and mentions the binary name
  assert!(s.contains(".TH"));
  assert!(s.contains("ci-delivery-replication"));
  assert!(s.contains("collect-pulls"));
}
