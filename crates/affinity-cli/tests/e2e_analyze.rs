//! E2E tests for `affinity analyze`, `affinity matrices`, and
//! `affinity completions`.
//!
//! Covers: JSON report schema, graph exports on disk, delimiter detection,
//! degenerate graphs, config file handling, and fatal load errors.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test harness helpers
// ---------------------------------------------------------------------------

const WORKED_EXAMPLE: &str = "aluno,tecnologia,peso\nA,X,1\nA,Y,1\nB,X,1\nB,Z,1\nC,Y,1\n";

fn affinity_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("affinity"));
    cmd.current_dir(dir);
    cmd.env("AFFINITY_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd.env_remove("AFFINITY_TIMING");
    cmd
}

fn write_dataset(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).expect("write dataset");
}

fn analyze_json(dir: &Path, args: &[&str]) -> Value {
    let output = affinity_cmd(dir)
        .arg("analyze")
        .args(args)
        .arg("--json")
        .output()
        .expect("analyze should not crash");
    assert!(
        output.status.success(),
        "analyze failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("analyze --json must produce valid JSON")
}

fn graph<'a>(report: &'a Value, id: &str) -> &'a Value {
    report["graphs"]
        .as_array()
        .and_then(|graphs| graphs.iter().find(|g| g["id"] == id))
        .unwrap_or_else(|| panic!("graph {id} missing from report"))
}

// ---------------------------------------------------------------------------
// affinity analyze
// ---------------------------------------------------------------------------

#[test]
fn analyze_worked_example_reports_top_nodes() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    let report = analyze_json(dir.path(), &["data.csv"]);

    assert_eq!(report["dataset"]["subjects"], 3);
    assert_eq!(report["dataset"]["items"], 3);
    assert_eq!(report["dataset"]["triples"], 5);
    assert_eq!(report["dataset"]["delimiter"], "comma");

    let sim = graph(&report, "similarity");
    assert_eq!(sim["edges"], 2);
    assert_eq!(sim["top"]["label"], "A");
    assert_eq!(sim["top"]["centrality"], 1.0);

    let cooc = graph(&report, "co-occurrence");
    assert_eq!(cooc["top"]["label"], "X");

    let inc = graph(&report, "incidence");
    assert_eq!(inc["nodes"], 6);
    assert_eq!(inc["edges"], 5);
    assert!(
        inc["content_hash"]
            .as_str()
            .is_some_and(|h| h.starts_with("blake3:"))
    );
}

#[test]
fn analyze_writes_one_export_per_graph() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    let report = analyze_json(dir.path(), &["data.csv"]);
    assert_eq!(report["exports"].as_array().map(Vec::len), Some(3));

    for name in ["incidence", "similarity", "co-occurrence"] {
        let path = dir.path().join("results").join(format!("{name}.json"));
        let body = fs::read_to_string(&path).expect("export file exists");
        let export: Value = serde_json::from_str(&body).expect("export is JSON");
        assert_eq!(export["id"], name);
        assert!(export["nodes"].is_array());
        assert!(export["edges"].is_array());
    }

    let bipartite: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("results/incidence.json")).expect("read"),
    )
    .expect("JSON");
    assert_eq!(bipartite["layout"], "bipartite");
    assert_eq!(bipartite["mode"], "bipartite");
}

#[test]
fn analyze_rerun_produces_identical_exports() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    analyze_json(dir.path(), &["data.csv"]);
    let first = fs::read_to_string(dir.path().join("results/co-occurrence.json")).expect("read");
    analyze_json(dir.path(), &["data.csv"]);
    let second = fs::read_to_string(dir.path().join("results/co-occurrence.json")).expect("read");
    assert_eq!(first, second);
}

#[test]
fn analyze_no_export_writes_nothing() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    let report = analyze_json(dir.path(), &["data.csv", "--no-export"]);
    assert_eq!(report["exports"], serde_json::json!([]));
    assert!(!dir.path().join("results").exists());
}

#[test]
fn analyze_out_flag_creates_directory() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    analyze_json(dir.path(), &["data.csv", "--out", "graphs/run1"]);
    assert!(dir.path().join("graphs/run1/similarity.json").is_file());
}

#[test]
fn analyze_export_failure_still_reports_analysis() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);
    // A regular file where the output directory's parent should be.
    fs::write(dir.path().join("blocker"), "not a directory").expect("write blocker");

    let report = analyze_json(dir.path(), &["data.csv", "--out", "blocker/sub"]);
    assert_eq!(report["exports"], serde_json::json!([]));
    assert_eq!(report["export_error"]["code"], "E5001");
    assert!(
        report["export_error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("blocker"))
    );
    assert_eq!(graph(&report, "similarity")["top"]["label"], "A");
}

#[test]
fn analyze_export_failure_text_mode_exits_zero() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);
    fs::write(dir.path().join("blocker"), "not a directory").expect("write blocker");

    affinity_cmd(dir.path())
        .args(["--format", "text", "analyze", "data.csv", "--out", "blocker/sub"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graph co-occurrence"))
        .stdout(predicate::str::contains("export-failed[E5001]"));
}

#[test]
fn analyze_detects_semicolons_and_defaults_weight() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "pairs.csv", "aluno;tecnologia\nana;rust\nbia;rust\n");

    let report = analyze_json(dir.path(), &["pairs.csv", "--no-export"]);
    assert_eq!(report["dataset"]["delimiter"], "semicolon");

    // Both picked rust with weight 1, so they are similar with weight 1.
    let sim = graph(&report, "similarity");
    assert_eq!(sim["edges"], 1);
    let inc = graph(&report, "incidence");
    assert_eq!(inc["edges"], 2);
}

#[test]
fn analyze_single_subject_is_degenerate_not_fatal() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "one.csv", "s,i,w\nana,rust,1\nana,go,1\n");

    let report = analyze_json(dir.path(), &["one.csv", "--no-export"]);
    let sim = graph(&report, "similarity");
    assert_eq!(sim["nodes"], 1);
    assert!(sim["top"].is_null());
    assert!(!graph(&report, "co-occurrence")["top"].is_null());
}

#[test]
fn analyze_small_dataset_warns_but_succeeds() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    let report = analyze_json(dir.path(), &["data.csv", "--no-export"]);
    let kinds: Vec<_> = report["warnings"]
        .as_array()
        .expect("warnings array")
        .iter()
        .map(|w| w["kind"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(kinds, ["too_few_subjects", "too_few_items"]);

    let report = analyze_json(
        dir.path(),
        &["data.csv", "--no-export", "--min-subjects", "3", "--min-items", "3"],
    );
    assert_eq!(report["warnings"], serde_json::json!([]));
}

#[test]
fn analyze_text_output_formats_centrality() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    affinity_cmd(dir.path())
        .args(["--format", "text", "analyze", "data.csv", "--no-export"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "graph incidence nodes=6 edges=5 top=A centrality=0.40",
        ))
        .stdout(predicate::str::contains("dataset subjects=3 items=3 triples=5"));
}

#[test]
fn analyze_pretty_output_shows_dimensions() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    affinity_cmd(dir.path())
        .args(["analyze", "data.csv", "--no-export", "--format", "pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 subjects x 3 items"))
        .stdout(predicate::str::contains("Similarity graph (between subjects)"));
}

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

#[test]
fn analyze_invalid_weight_fails_with_code() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "bad.csv", "s,i,w\nana,rust,lots\n");

    affinity_cmd(dir.path())
        .args(["analyze", "bad.csv", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2004"))
        .stderr(predicate::str::contains("line 2"));
    assert!(!dir.path().join("results").exists());
}

#[test]
fn analyze_json_error_leaves_stderr_as_one_json_document() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "bad.csv", "s,i,w\nana,rust,lots\n");

    let output = affinity_cmd(dir.path())
        .args(["analyze", "bad.csv", "--json"])
        .output()
        .expect("analyze should not crash");
    assert!(!output.status.success());
    let err: Value =
        serde_json::from_slice(&output.stderr).expect("stderr must be a single JSON document");
    assert_eq!(err["error"]["error_code"], "E2004");
}

#[test]
fn analyze_unterminated_quote_fails_with_line() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "open.csv", "s,i,w\n\"Silva, ana,rust,1\n");

    affinity_cmd(dir.path())
        .args(["--format", "text", "analyze", "open.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2003]"))
        .stderr(predicate::str::contains("line 2: unterminated quoted field"));
}

#[test]
fn analyze_missing_file_fails_with_code() {
    let dir = TempDir::new().unwrap();

    affinity_cmd(dir.path())
        .args(["--format", "text", "analyze", "nope.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2001]"));
}

#[test]
fn analyze_single_column_fails() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "narrow.csv", "only\nana\n");

    affinity_cmd(dir.path())
        .args(["analyze", "narrow.csv", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));
}

#[test]
fn analyze_header_only_fails() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "empty.csv", "s,i,w\n");

    affinity_cmd(dir.path())
        .args(["analyze", "empty.csv", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2005"));
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn config_file_in_working_directory_is_used() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);
    fs::write(
        dir.path().join("affinity.toml"),
        "[validation]\nmin_subjects = 1\nmin_items = 1\n\n[output]\ndir = \"graphs\"\n",
    )
    .expect("write config");

    let report = analyze_json(dir.path(), &["data.csv"]);
    assert_eq!(report["warnings"], serde_json::json!([]));
    assert!(dir.path().join("graphs/incidence.json").is_file());
    assert!(!dir.path().join("results").exists());
}

#[test]
fn config_export_false_disables_exports() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);
    fs::write(dir.path().join("custom.toml"), "[output]\nexport = false\n").expect("write");

    let report = analyze_json(dir.path(), &["data.csv", "--config", "custom.toml"]);
    assert_eq!(report["exports"], serde_json::json!([]));
    assert!(!dir.path().join("results").exists());
}

#[test]
fn malformed_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);
    fs::write(dir.path().join("affinity.toml"), "[validation\n").expect("write");

    affinity_cmd(dir.path())
        .args(["analyze", "data.csv", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

#[test]
fn missing_explicit_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    affinity_cmd(dir.path())
        .args(["--config", "absent.toml", "analyze", "data.csv", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

// ---------------------------------------------------------------------------
// affinity matrices / completions / timing
// ---------------------------------------------------------------------------

#[test]
fn matrices_text_prints_similarity() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    affinity_cmd(dir.path())
        .args([
            "matrices",
            "data.csv",
            "--which",
            "similarity",
            "--format",
            "text",
        ])
        .assert()
        .success()
        .stdout("# similarity\n\tA\tB\tC\nA\t0\t1\t1\nB\t1\t0\t0\nC\t1\t0\t0\n");
}

#[test]
fn matrices_json_lists_all_three() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    let output = affinity_cmd(dir.path())
        .args(["matrices", "data.csv", "--json"])
        .output()
        .expect("matrices should not crash");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let ids: Vec<_> = json["matrices"]
        .as_array()
        .expect("array")
        .iter()
        .map(|m| m["id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids, ["incidence", "similarity", "co-occurrence"]);
    assert_eq!(json["matrices"][2]["matrix"]["values"][0][2], 1.0);
}

#[test]
fn completions_emit_script() {
    let dir = TempDir::new().unwrap();
    affinity_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("affinity"));
}

#[test]
fn timing_flag_reports_stages() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), "data.csv", WORKED_EXAMPLE);

    affinity_cmd(dir.path())
        .args(["--timing", "analyze", "data.csv", "--no-export", "--json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("timing report"))
        .stderr(predicate::str::contains("derive"))
        .stderr(predicate::str::contains("centrality.similarity"));
}
