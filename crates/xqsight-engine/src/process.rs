//! A running UCI engine process.

use crate::uci::{parse_bestmove, parse_info, BestMove, Score};
use crate::{AnalysisError, EngineConfig};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use xqsight_position::PositionRecord;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Result of one `go` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub best: BestMove,
    /// Last reported score, from the side to move.
    pub score: Option<Score>,
    /// Deepest `info depth` seen.
    pub depth: Option<u32>,
    pub elapsed_ms: u64,
}

/// Engine process with a reader thread forwarding stdout lines.
///
/// The handshake (`uci`, options, `isready`) runs once in [`UciEngine::start`];
/// each [`UciEngine::analyze`] is a bounded request/response. A timeout kills
/// the process, after which the engine reports itself dead.
pub struct UciEngine {
    cfg: EngineConfig,
    child: Child,
    stdin: BufWriter<ChildStdin>,
    lines: Receiver<String>,
    alive: bool,
}

impl UciEngine {
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all, fields(path = %cfg.path.display())))]
    pub fn start(cfg: &EngineConfig) -> Result<Self, AnalysisError> {
        let path = cfg.resolved_path();
        if !path.is_file() {
            return Err(AnalysisError::NotFound(cfg.path.clone()));
        }
        let mut cmd = Command::new(&path);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(dir) = cfg.resolved_working_dir() {
            cmd.current_dir(dir);
        }
        let mut child = cmd.spawn().map_err(|source| AnalysisError::Spawn {
            path: cfg.path.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AnalysisError::Process("no stdin handle".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalysisError::Process("no stdout handle".into()))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        // Detached: it ends when every holder of the pipe is gone.
        thread::Builder::new()
            .name("uci-reader".into())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })?;

        let mut engine = Self {
            cfg: cfg.clone(),
            child,
            stdin: BufWriter::new(stdin),
            lines: rx,
            alive: true,
        };
        if let Err(e) = engine.handshake() {
            engine.kill();
            return Err(e);
        }
        info!("engine {} ready", cfg.path.display());
        Ok(engine)
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    fn handshake(&mut self) -> Result<(), AnalysisError> {
        let deadline = Instant::now() + self.cfg.timeout();
        self.send("uci")?;
        self.wait_for(deadline, |l| l.trim() == "uciok")?;
        for line in self.cfg.setoption_lines() {
            self.send(&line)?;
        }
        self.send("isready")?;
        self.wait_for(deadline, |l| l.trim() == "readyok")?;
        Ok(())
    }

    fn send(&mut self, line: &str) -> Result<(), AnalysisError> {
        if !self.alive {
            return Err(AnalysisError::Process("engine is not running".into()));
        }
        trace!(">> {line}");
        writeln!(self.stdin, "{line}")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn recv(&mut self, deadline: Instant) -> Result<String, AnalysisError> {
        let left = deadline.saturating_duration_since(Instant::now());
        match self.lines.recv_timeout(left) {
            Ok(line) => {
                trace!("<< {line}");
                Ok(line)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("engine timed out, killing it");
                self.kill();
                Err(AnalysisError::Timeout(self.cfg.timeout()))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.alive = false;
                Err(AnalysisError::Process("engine closed its output".into()))
            }
        }
    }

    fn wait_for(
        &mut self,
        deadline: Instant,
        done: impl Fn(&str) -> bool,
    ) -> Result<String, AnalysisError> {
        loop {
            let line = self.recv(deadline)?;
            if done(&line) {
                return Ok(line);
            }
        }
    }

    /// Ask for the best move of `record` searched to `depth` plies.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self), fields(record = record.as_str())))]
    pub fn analyze(&mut self, record: &PositionRecord, depth: u32) -> Result<Analysis, AnalysisError> {
        let start = Instant::now();
        let deadline = start + self.cfg.timeout();
        self.send(&format!("position fen {}", record.as_str()))?;
        self.send(&format!("go depth {depth}"))?;

        let (mut score, mut reached) = (None, None);
        loop {
            let line = self.recv(deadline)?;
            if let Some(best) = parse_bestmove(&line) {
                let analysis = Analysis {
                    best: best?,
                    score,
                    depth: reached,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                };
                debug!("analysis of {}: {analysis:?}", record.as_str());
                return Ok(analysis);
            }
            if let Some(i) = parse_info(&line) {
                score = i.score.or(score);
                reached = i.depth.max(reached);
            }
        }
    }

    /// Send `quit`, then kill the process if it is still running after the
    /// grace period.
    pub fn quit(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.alive {
            let _ = self.send("quit");
            let deadline = Instant::now() + self.cfg.quit_grace();
            while Instant::now() < deadline {
                match self.child.try_wait() {
                    Ok(Some(status)) => {
                        debug!("engine exited: {status}");
                        self.alive = false;
                        break;
                    }
                    Ok(None) => thread::sleep(Duration::from_millis(10)),
                    Err(_) => break,
                }
            }
        }
        self.kill();
    }

    fn kill(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        self.alive = false;
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
