use test_support::cmd_bin;

#[test]
fn cli_generates_man_page() {
  let out = cmd_bin("ion-dashboard").args(["--gen-man"]).output().unwrap();
  assert!(out.status.success());
  let s = String::from_utf8_lossy(&out.stdout);
  // clap_mangen emits a roff manpage starting with .TH and mentions the binary name
  assert!(s.contains(".TH") || s.contains(".Nm"));
  assert!(s.contains("ion-dashboard"));
}

#[test]
fn gen_man_needs_no_configuration() {
  let store = test_support::tempdir();
  test_support::bare_dashboard_cmd(store.path())
    .args(["--gen-man"])
    .assert()
    .success();
}
