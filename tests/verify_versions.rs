//! End-to-end coverage of `portv verify-versions`: the success line,
//! every diagnostic the pipeline can produce, exclusion, and the deep
//! content-store scan.

mod common;

use common::{stderr_of, stdout_of, RegistryFixture};

fn recorded_fixture() -> Option<RegistryFixture> {
    let fixture = RegistryFixture::new()?;
    fixture.write_manifest("curl", "version-semver", "7.80.0", 0);
    fixture.commit_all();
    let output = fixture.run(&["add-version", "curl"]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    Some(fixture)
}

#[test]
fn freshly_recorded_port_verifies_clean() {
    let Some(fixture) = recorded_fixture() else {
        return;
    };
    let output = fixture.run(&["verify-versions", "--verbose"]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    let stdout = stdout_of(&output);
    let sha = fixture.tree_sha("curl");
    assert!(stdout.contains(&format!("OK: {sha}\tcurl -> 7.80.0")));
    assert!(stdout.contains("1 ports verified, 0 failed, 0 skipped"));
}

#[test]
fn stale_local_version_is_an_ordering_error() {
    let Some(fixture) = recorded_fixture() else {
        return;
    };
    fixture.write_manifest("curl", "version-semver", "7.81.0", 0);
    fixture.commit_all();
    fixture.run(&["add-version", "curl"]);

    // Roll the port back to the older, still-recorded version.
    fixture.write_manifest("curl", "version-semver", "7.80.0", 0);
    fixture.commit_all();
    let output = fixture.run(&["verify-versions"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("not the first entry"));
}

#[test]
fn unrecorded_version_names_the_remediation_command() {
    let Some(fixture) = recorded_fixture() else {
        return;
    };
    fixture.write_manifest("curl", "version-semver", "7.82.0", 0);
    fixture.commit_all();
    let output = fixture.run(&["verify-versions"]);
    assert!(!output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("`7.82.0` was not found"));
    assert!(stderr.contains("portv add-version curl"));
}

#[test]
fn missing_baseline_entry_is_reported() {
    let Some(fixture) = recorded_fixture() else {
        return;
    };
    fixture.remove_file("versions/baseline.json");
    let output = fixture.run(&["verify-versions"]);
    assert!(!output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("no baseline version found for `curl`"));
    assert!(stderr.contains("to set version 7.80.0 as the baseline."));
}

#[test]
fn stale_baseline_is_reported() {
    let Some(fixture) = recorded_fixture() else {
        return;
    };
    fixture.write_file(
        "versions/baseline.json",
        "{\n  \"default\": {\n    \"curl\": {\n      \"baseline\": \"7.79.0\",\n      \
         \"port-version\": 0\n    }\n  }\n}\n",
    );
    let output = fixture.run(&["verify-versions"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("to update the baseline."));
}

#[test]
fn empty_and_malformed_history_files_are_distinct_errors() {
    let Some(fixture) = recorded_fixture() else {
        return;
    };
    fixture.write_file("versions/c-/curl.json", "{\n  \"versions\": []\n}\n");
    let output = fixture.run(&["verify-versions"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("contains no versions"));

    fixture.write_file("versions/c-/curl.json", "not json");
    let output = fixture.run(&["verify-versions"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("failed to parse versions file"));
}

#[test]
fn never_recorded_port_is_reported_with_create_hint() {
    let Some(fixture) = RegistryFixture::new() else {
        return;
    };
    fixture.write_manifest("curl", "version-semver", "7.80.0", 0);
    fixture.commit_all();
    let output = fixture.run(&["verify-versions"]);
    assert!(!output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("no versions file found for `curl`"));
    assert!(stderr.contains("portv add-version curl"));
}

#[test]
fn scan_continues_past_failures_and_honors_exclude() {
    let Some(fixture) = RegistryFixture::new() else {
        return;
    };
    fixture.write_manifest("alpha", "version", "1.0", 0);
    fixture.write_manifest("beta", "version", "2.0", 0);
    fixture.commit_all();
    for port in ["alpha", "beta"] {
        fixture.run(&["add-version", port]);
    }
    fixture.remove_file("versions/b-/beta.json");

    let output = fixture.run(&["verify-versions"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("beta"));
    assert!(stdout_of(&output).contains("1 ports verified, 1 failed, 0 skipped"));

    let output = fixture.run(&["verify-versions", "--exclude", "beta"]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert!(stdout_of(&output).contains("1 ports verified, 0 failed, 1 skipped"));
}

#[test]
fn deep_scan_checks_every_recorded_tree() {
    let Some(fixture) = recorded_fixture() else {
        return;
    };
    fixture.write_manifest("curl", "version-semver", "7.81.0", 0);
    fixture.commit_all();
    fixture.run(&["add-version", "curl"]);

    let output = fixture.run(&["verify-versions", "--verify-git-trees", "--verbose"]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert!(stdout_of(&output).contains("1 ports verified"));
}

#[test]
fn deep_scan_catches_tree_recorded_against_wrong_version() {
    let Some(fixture) = recorded_fixture() else {
        return;
    };
    let old_sha = fixture.tree_sha("curl");
    fixture.write_manifest("curl", "version-semver", "7.81.0", 0);
    fixture.commit_all();
    fixture.run(&["add-version", "curl"]);
    let new_sha = fixture.tree_sha("curl");

    // Corrupt the ledger: point the 7.81.0 entry at the 7.80.0 tree.
    let history = fixture.read_file("versions/c-/curl.json");
    fixture.write_file(
        "versions/c-/curl.json",
        &history.replacen(&new_sha, &old_sha, 1),
    );

    let output = fixture.run(&["verify-versions", "--verify-git-trees"]);
    assert!(!output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("while validating version `7.81.0`"));
    assert!(stderr.contains("declares version `7.80.0`"));
}
