use crate::{Analysis, AnalysisError, EngineConfig, UciEngine};
use log::{debug, info};
use xqsight_position::{PositionRecord, Side};

/// Something that turns a position record into a best move.
pub trait Analyzer: Send {
    fn analyze(&mut self, record: &PositionRecord) -> Result<Analysis, AnalysisError>;
}

/// [`Analyzer`] over a UCI engine process.
///
/// The process is started on first use and kept for later requests. After a
/// timeout or process failure it is dropped and restarted on the next call.
pub struct UciAnalyzer {
    cfg: EngineConfig,
    engine: Option<UciEngine>,
}

impl UciAnalyzer {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg, engine: None }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    fn engine(&mut self) -> Result<&mut UciEngine, AnalysisError> {
        if self.engine.as_ref().is_some_and(|e| !e.is_alive()) {
            debug!("dropping dead engine");
            self.engine = None;
        }
        match &mut self.engine {
            Some(e) => Ok(e),
            slot => {
                info!("starting engine {}", self.cfg.path.display());
                Ok(slot.insert(UciEngine::start(&self.cfg)?))
            }
        }
    }

    /// Quit the running engine, if any.
    pub fn shutdown(&mut self) {
        if let Some(e) = self.engine.take() {
            e.quit();
        }
    }
}

impl Analyzer for UciAnalyzer {
    fn analyze(&mut self, record: &PositionRecord) -> Result<Analysis, AnalysisError> {
        let depth = self.cfg.depth;
        let result = self.engine()?.analyze(record, depth);
        if result.is_err() {
            // A failed request leaves the engine in an unknown state.
            self.shutdown();
        }
        result
    }
}

impl Drop for UciAnalyzer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Best moves for the same placement with red and with black to move.
#[derive(Debug)]
pub struct BothSides {
    pub red: Result<Analysis, AnalysisError>,
    pub black: Result<Analysis, AnalysisError>,
}

impl BothSides {
    pub fn get(&self, side: Side) -> &Result<Analysis, AnalysisError> {
        match side {
            Side::Red => &self.red,
            Side::Black => &self.black,
        }
    }
}

pub fn analyze_both_sides(analyzer: &mut dyn Analyzer, record: &PositionRecord) -> BothSides {
    BothSides {
        red: analyzer.analyze(&record.with_side(Side::Red)),
        black: analyzer.analyze(&record.with_side(Side::Black)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BestMove;

    struct Recorder(Vec<String>);

    impl Analyzer for Recorder {
        fn analyze(&mut self, record: &PositionRecord) -> Result<Analysis, AnalysisError> {
            self.0.push(record.as_str().to_owned());
            Ok(Analysis {
                best: BestMove::NoMove,
                score: None,
                depth: None,
                elapsed_ms: 0,
            })
        }
    }

    #[test]
    fn both_sides_flips_side_to_move() {
        let mut r = Recorder(Vec::new());
        let both = analyze_both_sides(&mut r, &PositionRecord::opening());
        assert!(both.get(Side::Red).is_ok() && both.get(Side::Black).is_ok());
        assert!(r.0[0].contains(" w "));
        assert!(r.0[1].contains(" b "));
        assert_eq!(r.0[0].split(' ').next(), r.0[1].split(' ').next());
    }

    #[test]
    fn missing_executable_is_not_found() {
        let mut a = UciAnalyzer::new(EngineConfig::with_path("/nonexistent/pikafish"));
        let err = a.analyze(&PositionRecord::opening()).unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound(_)));
    }
}
