//! The `xqsight` binary on files.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use xqsight::position::{Grid, PositionRecord};
use xqsight::{save_color_image, AssistantConfig, AttemptReport, AttemptStatus};

fn xqsight() -> Command {
    Command::cargo_bin("xqsight").unwrap()
}

#[test]
fn recognize_prints_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("board.png");
    save_color_image(&common::render(&Grid::standard_opening()), &png).unwrap();
    let report = dir.path().join("report.json");

    xqsight()
        .arg("recognize")
        .arg(&png)
        .args(["--strategy", "heuristic", "--report"])
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains(PositionRecord::opening().as_str()))
        .stdout(predicate::str::contains("position recognized"));

    let text = std::fs::read_to_string(&report).unwrap();
    let report: AttemptReport = serde_json::from_str(&text).unwrap();
    assert_eq!(report.status, AttemptStatus::Valid);
    assert_eq!(report.record, Some(PositionRecord::opening()));
}

#[test]
fn blank_screenshot_exits_with_two() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("blank.png");
    save_color_image(&common::blank_canvas(), &png).unwrap();

    xqsight()
        .arg("recognize")
        .arg(&png)
        .args(["--strategy", "heuristic"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("board not found"));
}

#[test]
fn substitute_opening_succeeds_on_a_blank_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("blank.png");
    save_color_image(&common::blank_canvas(), &png).unwrap();

    xqsight()
        .arg("recognize")
        .arg(&png)
        .args(["--strategy", "heuristic", "--side", "black", "--substitute-opening"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            PositionRecord::opening().with_side(xqsight::position::Side::Black).as_str(),
        ));
}

#[test]
fn missing_image_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    xqsight()
        .arg("recognize")
        .arg(dir.path().join("nope.png"))
        .assert()
        .code(2);
}

#[test]
fn init_config_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("xqsight.json");
    xqsight()
        .arg("init-config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));

    let cfg = AssistantConfig::load_json(&path).unwrap();
    assert_eq!(cfg, AssistantConfig::default());
}

#[test]
fn watch_rejects_a_zero_interval() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("board.png");
    save_color_image(&common::blank_canvas(), &png).unwrap();

    xqsight()
        .arg("watch")
        .arg("--image")
        .arg(&png)
        .args(["--interval-ms", "0", "--no-analyze"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("interval_ms"));
}
