//! Screenshot to suggestion with a scripted UCI engine.
#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use xqsight::engine::{BestMove, Score};
use xqsight::position::{Grid, PositionRecord, Side};
use xqsight::{AssistantConfig, AttemptStatus, Orchestrator, Stage, Strategy};

const ENGINE: &str = r#"#!/bin/sh
while read -r line; do
  case "$line" in
    uci) echo "id name fake"; echo "uciok" ;;
    isready) echo "readyok" ;;
    position*) echo "$line" >> positions.log ;;
    go*) echo "info depth 8 score cp 31 pv h2e2"
         echo "bestmove h2e2" ;;
    quit) exit 0 ;;
  esac
done
"#;

fn config(dir: &Path, script: &str) -> AssistantConfig {
    let engine = dir.join("engine.sh");
    std::fs::write(&engine, script).unwrap();
    std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut cfg = AssistantConfig {
        strategy: Strategy::Heuristic,
        ..AssistantConfig::default()
    };
    cfg.engine.path = engine;
    cfg.engine.timeout_ms = 2_000;
    cfg.engine.quit_grace_ms = 300;
    cfg
}

#[test]
fn opening_screenshot_gets_a_suggestion() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = Orchestrator::from_config(&config(dir.path(), ENGINE));
    let frame = common::render(&Grid::standard_opening());

    let report = orch.attempt(Ok(frame.clone()));
    assert_eq!(report.status, AttemptStatus::Valid);
    assert_eq!(report.suggestions.len(), 1);
    let s = &report.suggestions[0];
    assert_eq!(s.side, Side::Red);
    assert_eq!(s.best, Some(BestMove::Move("h2e2".parse().unwrap())));
    assert_eq!(s.score, Some(Score::Centipawns(31)));
    assert_eq!(s.summary(), "h2e2 | 炮二平五 | h2 -> e2");

    // the same screen again does not reach the engine
    let again = orch.attempt(Ok(frame));
    assert!(!again.analyzed());
    drop(orch);

    let log = std::fs::read_to_string(dir.path().join("positions.log")).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert_eq!(
        log.trim(),
        format!("position fen {}", PositionRecord::opening().as_str())
    );
}

#[test]
fn both_sides_are_analyzed_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), ENGINE);
    cfg.both_sides = true;
    let mut orch = Orchestrator::from_config(&cfg);

    let report = orch.attempt(Ok(common::render(&Grid::standard_opening())));
    let sides: Vec<_> = report.suggestions.iter().map(|s| s.side).collect();
    assert_eq!(sides, vec![Side::Red, Side::Black]);
    drop(orch);

    let log = std::fs::read_to_string(dir.path().join("positions.log")).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(" w "), "{}", lines[0]);
    assert!(lines[1].contains(" b "), "{}", lines[1]);
}

#[test]
fn missing_engine_is_reported_without_losing_the_position() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), ENGINE);
    cfg.engine.path = dir.path().join("no-such-engine");
    let mut orch = Orchestrator::from_config(&cfg);

    let report = orch.attempt(Ok(common::render(&Grid::standard_opening())));
    assert_eq!(report.status, AttemptStatus::Valid);
    assert_eq!(report.failed_stage, Some(Stage::Analyze));
    assert!(report.suggestions[0].error.is_some());
    assert_eq!(orch.last_record(), Some(&PositionRecord::opening()));
}
