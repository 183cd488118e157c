//! Drives [`UciEngine`] against small shell scripts speaking just enough UCI.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use xqsight_engine::{AnalysisError, Analyzer, BestMove, EngineConfig, Score, UciAnalyzer, UciEngine};
use xqsight_position::PositionRecord;

fn write_engine(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("engine.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

const RESPONSIVE: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "id name fake"; echo "uciok" ;;
    isready) echo "readyok" ;;
    setoption*) echo "$line" >> options.log ;;
    position*) echo "$line" > position.log ;;
    go*) echo "info depth 1 score cp 12 pv h2e2"
         echo "info depth 2 score cp 20 pv h2e2 h9g7"
         echo "bestmove h2e2 ponder h9g7" ;;
    quit) exit 0 ;;
  esac
done
"#;

fn config(path: PathBuf) -> EngineConfig {
    EngineConfig {
        timeout_ms: 2_000,
        quit_grace_ms: 500,
        ..EngineConfig::with_path(path)
    }
}

#[test]
fn handshake_then_best_move() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(write_engine(dir.path(), RESPONSIVE));
    cfg.options.push(("Threads".into(), "1".into()));

    let mut engine = UciEngine::start(&cfg).unwrap();
    let a = engine.analyze(&PositionRecord::opening(), 2).unwrap();
    assert_eq!(a.best, BestMove::Move("h2e2".parse().unwrap()));
    assert_eq!(a.score, Some(Score::Centipawns(20)));
    assert_eq!(a.depth, Some(2));
    engine.quit();

    // the engine runs in its own directory
    let options = std::fs::read_to_string(dir.path().join("options.log")).unwrap();
    assert_eq!(options.trim(), "setoption name Threads value 1");
    let position = std::fs::read_to_string(dir.path().join("position.log")).unwrap();
    assert_eq!(
        position.trim(),
        format!("position fen {}", PositionRecord::opening().as_str())
    );
}

#[test]
fn relative_engine_path_starts_in_its_own_dir() {
    // a directory under the current one, named relative to it
    let dir = tempfile::Builder::new()
        .prefix(".engine-")
        .tempdir_in(".")
        .unwrap();
    let path = write_engine(dir.path(), RESPONSIVE);
    assert!(path.is_relative());

    let mut engine = UciEngine::start(&config(path)).unwrap();
    let a = engine.analyze(&PositionRecord::opening(), 2).unwrap();
    assert_eq!(a.best, BestMove::Move("h2e2".parse().unwrap()));
    engine.quit();
    assert!(dir.path().join("position.log").is_file());
}

#[test]
fn no_legal_move() {
    let dir = tempfile::tempdir().unwrap();
    let script = RESPONSIVE.replace("bestmove h2e2 ponder h9g7", "bestmove (none)");
    let mut analyzer = UciAnalyzer::new(config(write_engine(dir.path(), &script)));
    let a = analyzer.analyze(&PositionRecord::opening()).unwrap();
    assert_eq!(a.best, BestMove::NoMove);
}

#[test]
fn silent_search_times_out_and_is_killed() {
    let dir = tempfile::tempdir().unwrap();
    let script = RESPONSIVE.replace(
        r#"go*) echo "info depth 1 score cp 12 pv h2e2""#,
        r#"go*) exec sleep 30 ; echo "info depth 1 score cp 12 pv h2e2""#,
    );
    let mut cfg = config(write_engine(dir.path(), &script));
    cfg.timeout_ms = 300;

    let mut engine = UciEngine::start(&cfg).unwrap();
    let started = Instant::now();
    let err = engine.analyze(&PositionRecord::opening(), 8).unwrap_err();
    assert!(err.is_timeout(), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!engine.is_alive());
    assert!(matches!(
        engine.analyze(&PositionRecord::opening(), 8),
        Err(AnalysisError::Process(_))
    ));
}

#[test]
fn engine_without_handshake_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(write_engine(dir.path(), "exit 0\n"));
    cfg.timeout_ms = 500;
    assert!(matches!(UciEngine::start(&cfg), Err(AnalysisError::Process(_))));
}

#[test]
fn analyzer_restarts_after_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    // answers one search, then exits
    let script = RESPONSIVE.replace(
        r#"echo "bestmove h2e2 ponder h9g7" ;;"#,
        r#"echo "bestmove h2e2 ponder h9g7" ; exit 0 ;;"#,
    );
    let mut analyzer = UciAnalyzer::new(config(write_engine(dir.path(), &script)));
    let record = PositionRecord::opening();
    assert!(analyzer.analyze(&record).is_ok());
    assert!(analyzer.analyze(&record).is_err());
    assert!(analyzer.analyze(&record).is_ok());
}
