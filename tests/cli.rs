mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, business_csv, fixture_path};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

fn finratio() -> Command {
    Command::cargo_bin("finratio").expect("binary exists")
}

#[test]
fn run_prints_every_report_section() {
    let input = fixture_path("businesses.csv");
    finratio()
        .args(["run", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("== Duplicate records =="))
        .stdout(contains("Unique rows: 2"))
        .stdout(contains("Duplicate rows: 1"))
        .stdout(contains("== Non-null counts =="))
        .stdout(contains("== Businesses with negative debt-to-equity =="))
        .stdout(contains("== Statistics by state =="))
        .stdout(contains("== Debt-to-income ratio =="))
        .stdout(contains("NaN"))
        .stdout(contains("== Merged table =="));
}

#[test]
fn run_writes_merged_csv_and_chart_datasets() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("merged.csv");
    let reports = workspace.path().join("charts");
    let input = fixture_path("businesses_mixed.csv");
    finratio()
        .args([
            "run",
            "-i",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--report-dir",
            reports.to_str().unwrap(),
            "--quiet",
        ])
        .assert()
        .success()
        .stdout(contains("== Merged table ==").not());

    let merged = fs::read_to_string(&output).expect("read merged");
    let mut lines = merged.lines();
    assert_eq!(
        lines.next(),
        Some(
            "business_id,business_state,total_long_term_debt,total_equity,debt_to_equity,total_liabilities,total_revenue,profit_margin,Sector,debt_to_income_ratio"
        )
    );
    assert_eq!(merged.lines().count(), 7);
    assert!(merged.contains("13,WA,50,100,0.5,80,0,0.05,tech,NaN"));

    for file in [
        "bar_chart.csv",
        "pie_chart.csv",
        "scatterplot.csv",
        "hor_bar_chart.csv",
        "stats.csv",
        "manifest.json",
    ] {
        assert!(reports.join(file).is_file(), "missing {file}");
    }
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(reports.join("manifest.json")).expect("read"))
            .expect("parse manifest");
    assert_eq!(manifest["merged_rows"], 6);
    assert_eq!(manifest["states"], 5);
    let counts = fs::read_to_string(reports.join("hor_bar_chart.csv")).expect("read counts");
    assert_eq!(
        counts.lines().take(2).collect::<Vec<_>>(),
        vec!["business_state,cnt_of_businesses", "CA,2"]
    );
}

#[test]
fn run_resolves_name_in_source_dir() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "source_data/q3.csv",
        &business_csv(&["5,OR,10,20,0.5,30,100,0.1"]),
    );
    finratio()
        .current_dir(workspace.path())
        .args(["run", "--name", "q3"])
        .assert()
        .success()
        .stdout(contains("Unique rows: 1"));
}

#[test]
fn run_prompts_until_a_file_is_found() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "data/q4.csv",
        &business_csv(&["5,OR,10,20,0.5,30,100,0.1"]),
    );
    let source_dir = workspace.path().join("data");
    finratio()
        .args(["run", "--source-dir", source_dir.to_str().unwrap()])
        .write_stdin("missing\nq4\n")
        .assert()
        .success()
        .stdout(contains("Please enter a filename"))
        .stdout(contains("ERROR: File not found."))
        .stdout(contains("Unique rows: 1"));
}

#[test]
fn run_exit_at_prompt_is_not_an_error() {
    let workspace = TestWorkspace::new();
    finratio()
        .args(["run", "--source-dir", workspace.path().to_str().unwrap()])
        .write_stdin("exit\n")
        .assert()
        .success()
        .stdout(contains("Exiting."));
}

#[test]
fn missing_input_fails_with_error_prefix() {
    finratio()
        .args(["run", "-i", "does/not/exist.csv"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("error:"));
}

#[test]
fn coercion_failure_reports_column() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "bad.csv",
        &business_csv(&["1,CA,100,50,not-a-number,500,1000,0.1"]),
    );
    finratio()
        .args(["run", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("debt_to_equity"));
}

#[test]
fn stats_json_nests_state_then_column() {
    let input = fixture_path("businesses_mixed.csv");
    let assert = finratio()
        .args(["stats", "-i", input.to_str().unwrap(), "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    assert_eq!(parsed["CA"]["total_revenue"]["mean"], 2000.0);
    assert_eq!(parsed["CA"]["total_revenue"]["count"], 2);
    assert!(parsed["NY"]["profit_margin"]["mean"].is_null());
}

#[test]
fn stats_table_lists_each_state() {
    let input = fixture_path("businesses.csv");
    finratio()
        .args(["stats", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("business_state"))
        .stdout(contains("CA"))
        .stdout(contains("NY"));
}

#[test]
fn schema_show_lists_default_mapping() {
    finratio()
        .args(["schema", "show"])
        .assert()
        .success()
        .stdout(contains("Total Long-term Debt"))
        .stdout(contains("total_long_term_debt"))
        .stdout(contains("Float"));
}

#[test]
fn schema_init_writes_loadable_mapping() {
    let workspace = TestWorkspace::new();
    let mapping = workspace.path().join("mapping.yml");
    let input = fixture_path("businesses_mixed.csv");
    finratio()
        .args([
            "schema",
            "init",
            "-i",
            input.to_str().unwrap(),
            "-o",
            mapping.to_str().unwrap(),
        ])
        .assert()
        .success();
    let contents = fs::read_to_string(&mapping).expect("read mapping");
    assert!(contents.contains("source: Total Long-term Debt"));
    assert!(contents.contains("name: total_long_term_debt"));
    assert!(contents.contains("name: sector"));

    finratio()
        .args(["schema", "show", "--schema", mapping.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("debt_to_equity"));
}

#[test]
fn preview_limits_rows() {
    let input = fixture_path("businesses_mixed.csv");
    let assert = finratio()
        .args(["preview", "-i", input.to_str().unwrap(), "--rows", "2"])
        .assert()
        .success()
        .stdout(contains("business_id"))
        .stdout(contains("TX"))
        .stdout(contains("FL").not());
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    assert_eq!(stdout.lines().count(), 4);
}

#[test]
fn custom_delimiter_is_honoured() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "semi.txt",
        &business_csv(&["1,CA,100,50,2.0,500,1000,0.1"]).replace(',', ";"),
    );
    finratio()
        .args(["preview", "-i", input.to_str().unwrap(), "--delimiter", ";"])
        .assert()
        .success()
        .stdout(contains("total_revenue"));
}

#[test]
fn input_encoding_decodes_legacy_bytes() {
    let workspace = TestWorkspace::new();
    let input = workspace.path().join("legacy.csv");
    let mut contents = format!("{},Venue\n", common::BUSINESS_HEADERS).into_bytes();
    contents.extend_from_slice(b"1,CA,100,50,2.0,500,1000,0.1,Caf\xe9\n");
    fs::write(&input, contents).expect("write legacy csv");

    finratio()
        .args(["preview", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Failed to decode text with encoding UTF-8"));

    finratio()
        .args([
            "preview",
            "-i",
            input.to_str().unwrap(),
            "--input-encoding",
            "windows-1252",
        ])
        .assert()
        .success()
        .stdout(contains("Café"));
}

#[test]
fn round_places_outside_range_is_rejected() {
    let input = fixture_path("businesses.csv");
    finratio()
        .args(["run", "-i", input.to_str().unwrap(), "--round-places", "99"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("round-places"));
}
