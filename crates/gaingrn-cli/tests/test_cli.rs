use assert_cmd::Command;
use gaingrn_test_data::TestFile;
use std::fs;
use std::path::{Path, PathBuf};

/// Copies the fixtures of `query_01` into `dir` and writes a manifest next to them.
fn workspace(dir: &Path, with_alignments: bool) -> (PathBuf, PathBuf) {
    let copy = |file: TestFile, name: &str| {
        let (path, _tmp) = file.create_temp().unwrap();
        let target = dir.join(name);
        fs::copy(&path, &target).unwrap();
        target
    };
    let templates = copy(TestFile::templates_01(), "templates.json");
    copy(TestFile::stride_01(), "query_01.stride");
    copy(TestFile::pdb_01(), "query_01.pdb");
    copy(TestFile::gesamt_a_01(), "query_01_TA.txt");
    copy(TestFile::gesamt_b_01(), "query_01_TB.txt");

    let alignments = if with_alignments {
        r#", "alignments": {"TA": "query_01_TA.txt", "TB": "query_01_TB.txt"}"#
    } else {
        ""
    };
    let manifest = dir.join("manifest.json");
    fs::write(
        &manifest,
        format!(
            r#"{{"structures": [{{
                "accession": "query_01",
                "receptor": "ADGRL1",
                "stride": "query_01.stride",
                "structure": "query_01.pdb",
                "boundary": 40{}
            }}]}}"#,
            alignments
        ),
    )
    .unwrap();
    (manifest, templates)
}

#[test]
fn test_index_precomputed() {
    let dir = tempfile::tempdir().unwrap();
    let (manifest, templates) = workspace(dir.path(), true);
    let output = dir.path().join("labels.csv");
    let occupancy = dir.path().join("occupancy.csv");
    let long_dir = dir.path().join("long");

    let mut cmd = Command::cargo_bin("gaingrn").unwrap();
    cmd.arg("index")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--templates")
        .arg(&templates)
        .arg("--output")
        .arg(&output)
        .arg("--occupancy")
        .arg(&occupancy)
        .arg("--long-dir")
        .arg(&long_dir)
        .arg("--numbered")
        .arg("--threads")
        .arg("2");
    cmd.assert().success();

    let table = fs::read_to_string(&output).unwrap();
    let mut lines = table.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("accession,receptor,"));
    assert!(header.split(',').any(|column| column == "H1.50"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("query_01,ADGRL1,"));
    assert!(row.split(',').any(|cell| cell == "L10"));

    assert!(fs::read_to_string(&occupancy).unwrap().contains("S4.50"));
    let long = fs::read_to_string(long_dir.join("query_01.txt")).unwrap();
    assert!(long.lines().any(|line| line == "L    70    GPS-1"));
}

#[test]
fn test_index_without_gps_patch() {
    let dir = tempfile::tempdir().unwrap();
    let (manifest, templates) = workspace(dir.path(), true);
    let output = dir.path().join("labels.csv");
    let mut cmd = Command::cargo_bin("gaingrn").unwrap();
    cmd.arg("index")
        .arg("-m")
        .arg(&manifest)
        .arg("-t")
        .arg(&templates)
        .arg("-o")
        .arg(&output)
        .arg("--no-gps");
    cmd.assert().success();
    let table = fs::read_to_string(&output).unwrap();
    assert!(!table.contains("GPS-1"));
}

#[cfg(unix)]
#[test]
fn test_index_with_gesamt_binary() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let (manifest, templates) = workspace(dir.path(), false);
    let report_a = dir.path().join("query_01_TA.txt");
    let report_b = dir.path().join("query_01_TB.txt");
    let binary = dir.path().join("gesamt");
    fs::write(
        &binary,
        format!(
            "#!/bin/sh\ncase \"$1\" in\n  *TA.pdb) cat '{}' ;;\n  *) cat '{}' ;;\nesac\n",
            report_a.display(),
            report_b.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();

    let output = dir.path().join("labels.csv");
    let mut cmd = Command::cargo_bin("gaingrn").unwrap();
    cmd.arg("index")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--templates")
        .arg(&templates)
        .arg("--output")
        .arg(&output)
        .arg("--gesamt")
        .arg(&binary)
        .arg("--timeout")
        .arg("30");
    cmd.assert().success();
    let table = fs::read_to_string(&output).unwrap();
    assert!(table.lines().next().unwrap().split(',').any(|c| c == "S1.50"));
}

#[test]
fn test_index_missing_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let (_, templates) = workspace(dir.path(), true);
    let mut cmd = Command::cargo_bin("gaingrn").unwrap();
    cmd.arg("index")
        .arg("--manifest")
        .arg(dir.path().join("absent.json"))
        .arg("--templates")
        .arg(&templates)
        .arg("--output")
        .arg(dir.path().join("labels.csv"));
    cmd.assert().failure();
}

#[test]
fn test_inspect() {
    let (stride, _tmp) = TestFile::stride_01().create_temp().unwrap();
    let (pdb, _pdb_tmp) = TestFile::pdb_01().create_temp().unwrap();
    let mut cmd = Command::cargo_bin("gaingrn").unwrap();
    cmd.arg("inspect")
        .arg("--stride")
        .arg(&stride)
        .arg("--boundary")
        .arg("40")
        .arg("--pdb")
        .arg(&pdb);
    let assert = cmd.assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("boundary: 40"));
    assert!(stdout.contains("A\tHelix[18-33]\t25:Coil"));
    assert!(stdout.contains("B\tStrand[72-77]"));
    assert!(stdout.contains("sequence mismatches: 0"));
}

#[test]
fn test_inspect_marks_angle_outliers() {
    let dir = tempfile::tempdir().unwrap();
    let (stride, _tmp) = TestFile::stride_01().create_temp().unwrap();
    let config = dir.path().join("config.json");
    // far from the fixture's helix geometry: every helix gets its first residue marked
    fs::write(
        &config,
        r#"{"angle_references": [{"kind": "Helix",
            "phi": {"mean": 200.0, "sd": 10.0}, "psi": {"mean": 320.0, "sd": 10.0}}]}"#,
    )
    .unwrap();
    let mut cmd = Command::cargo_bin("gaingrn").unwrap();
    cmd.arg("inspect")
        .arg("--stride")
        .arg(&stride)
        .arg("--boundary")
        .arg("40")
        .arg("--config")
        .arg(&config);
    let assert = cmd.assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("angle outliers marked: 2"));
}
