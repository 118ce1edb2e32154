
use fixtures::*;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn write_pels(dir: &Path) {
    let pels = [
        ("0001.pel", PelBuilder::new().id(1).primary_src("BD8D1001").build()),
        (
            "0002.pel",
            PelBuilder::new()
                .id(2)
                .severity(SEVERITY_PREDICTIVE)
                .primary_src("BD8D1002")
                .build(),
        ),
        (
            "0003.pel",
            PelBuilder::new()
                .id(3)
                .severity(SEVERITY_INFORMATIONAL)
                .primary_src("BD8D1003")
                .build(),
        ),
    ];
    for (name, data) in pels {
        fs::write(dir.join(name), data).unwrap();
    }
    fs::write(dir.join("notes.txt"), b"not a pel").unwrap();
}

fn pel_dump() -> Command {
    Command::new(assert_cmd::cargo_bin!("pel_dump"))
}

#[test]
fn test_it_dumps_a_single_file() {
    let d = tempdir().unwrap();
    write_pels(d.path());

    // Informational PELs are still shown when asked for by name.
    pel_dump()
        .args(["-f", &d.path().join("0003.pel").to_string_lossy()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Private Header\""))
        .stdout(predicate::str::contains("\"Reference Code\": \"BD8D1003\""));
}

#[test]
fn test_no_indent_prints_one_line() {
    let d = tempdir().unwrap();
    write_pels(d.path());

    let output = pel_dump()
        .args(["--no-indent", "-f", &d.path().join("0001.pel").to_string_lossy()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim_end().lines().count(), 1);
}

#[test]
fn test_it_fails_on_a_malformed_file() {
    let d = tempdir().unwrap();
    let f = d.path().join("bad.pel");
    fs::write(&f, [0x50, 0x48, 0x00]).unwrap();

    pel_dump()
        .args(["-f", &f.to_string_lossy()])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_it_lists_serviceable_pels() {
    let d = tempdir().unwrap();
    write_pels(d.path());

    pel_dump()
        .args(["-l", "-e", ".pel", "-p", &d.path().to_string_lossy()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"0x50000001\""))
        .stdout(predicate::str::contains("\"SRC\": \"BD8D1002\""))
        .stdout(predicate::str::contains("BD8D1003").not());
}

#[test]
fn test_it_excludes_srcs_from_listings() {
    let d = tempdir().unwrap();
    write_pels(d.path());
    let exclusions = d.path().join("exclude.lst");
    fs::write(&exclusions, "# noisy\nBD8D1002\n").unwrap();

    pel_dump()
        .args([
            "-l",
            "-e",
            "pel",
            "-p",
            &d.path().to_string_lossy(),
            "--src-exclude-file",
            &exclusions.to_string_lossy(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("BD8D1001"))
        .stdout(predicate::str::contains("BD8D1002").not());
}

#[test]
fn test_it_counts_pels() {
    let d = tempdir().unwrap();
    write_pels(d.path());
    let dir = d.path().to_string_lossy().to_string();

    pel_dump()
        .args(["-n", "--no-indent", "-e", ".pel", "-p", &dir])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"Number of PELs found":2}"#));

    pel_dump()
        .args(["-n", "--no-indent", "-a", "-e", ".pel", "-p", &dir])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"Number of PELs found":3}"#));

    pel_dump()
        .args(["-n", "--no-indent", "--severity", "0x20", "--only", "-e", ".pel", "-p", &dir])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"Number of PELs found":1}"#));
}

#[test]
fn test_it_reports_malformed_pels_while_counting() {
    let d = tempdir().unwrap();
    write_pels(d.path());
    fs::write(d.path().join("0004.pel"), [0x50, 0x48, 0x00, 0x30]).unwrap();
    let dir = d.path().to_string_lossy().to_string();

    pel_dump()
        .args(["-n", "--no-indent", "-e", ".pel", "-p", &dir])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"Number of PELs found":2}"#))
        .stderr(predicate::str::contains("No PEL parsed for 0004.pel"));

    pel_dump()
        .args(["-l", "-e", ".pel", "-p", &dir])
        .assert()
        .success()
        .stderr(predicate::str::contains("No PEL parsed for 0004.pel"));
}

#[test]
fn test_it_finds_a_pel_by_id() {
    let d = tempdir().unwrap();
    write_pels(d.path());
    let dir = d.path().to_string_lossy().to_string();

    pel_dump()
        .args(["-i", "0x50000003", "-p", &dir])
        .assert()
        .success()
        .stdout(predicate::str::contains("BD8D1003"));

    pel_dump()
        .args(["--src", "bd8d1002", "-p", &dir])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Entry Id\": \"0x50000002\""));

    pel_dump()
        .args(["-i", "0x5000000F", "-p", &dir])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PEL not found"));
}

#[test]
fn test_it_respects_directory_output() {
    let d = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_pels(d.path());

    pel_dump()
        .args([
            "-d",
            &d.path().to_string_lossy(),
            "-o",
            &out.path().to_string_lossy(),
            "-a",
            "-e",
            ".pel",
        ])
        .assert()
        .success();

    let expected = out.path().join("0002.pel.0x50000002.json");
    let text = fs::read_to_string(&expected).unwrap();
    assert!(text.contains("\"Primary SRC\""));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 3);
}

#[test]
fn test_it_refuses_a_missing_output_directory() {
    let d = tempdir().unwrap();
    write_pels(d.path());

    pel_dump()
        .args([
            "-d",
            &d.path().to_string_lossy(),
            "-o",
            &d.path().join("missing").to_string_lossy(),
        ])
        .assert()
        .failure()
        .code(1);
}
