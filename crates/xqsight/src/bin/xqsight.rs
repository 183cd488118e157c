use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use xqsight::position::Side;
use xqsight::{
    load_color_image, AssistantConfig, AttemptReport, AttemptStatus, FailurePolicy, FileCapture,
    Orchestrator, Scheduler, ScreenCapture, Strategy,
};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

#[derive(Parser, Debug)]
#[command(name = "xqsight", version, about = "Recognize a xiangqi board on screen and suggest a move")]
struct Cli {
    /// More output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Errors only.
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recognize one screenshot and print the position record.
    Recognize {
        image: PathBuf,
        #[command(flatten)]
        common: CommonArgs,
        /// Ask the engine for the best move.
        #[arg(long)]
        analyze: bool,
        /// Write the attempt report as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Recognize periodically and print suggestions until stdin closes.
    Watch {
        #[command(flatten)]
        common: CommonArgs,
        /// Read frames from this file instead of the screen.
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Recognize only, no engine.
        #[arg(long)]
        no_analyze: bool,
    },
    /// Write the default configuration as JSON.
    InitConfig { path: PathBuf },
}

#[derive(Args, Debug)]
struct CommonArgs {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,
    /// Side to move; it cannot be seen on the board.
    #[arg(long, value_enum)]
    side: Option<SideArg>,
    /// Engine executable.
    #[arg(long)]
    engine: Option<PathBuf>,
    #[arg(long)]
    depth: Option<u32>,
    /// Best move for both red and black.
    #[arg(long)]
    both_sides: bool,
    /// Save the captured frame and the aligned board here.
    #[arg(long)]
    debug_dir: Option<PathBuf>,
    /// Fall back to the opening position when recognition fails.
    #[arg(long)]
    substitute_opening: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SideArg {
    Red,
    Black,
}

impl From<SideArg> for Side {
    fn from(s: SideArg) -> Self {
        match s {
            SideArg::Red => Side::Red,
            SideArg::Black => Side::Black,
        }
    }
}

impl CommonArgs {
    fn resolve(&self) -> Result<AssistantConfig, Box<dyn std::error::Error>> {
        let mut cfg = match &self.config {
            Some(path) => AssistantConfig::load_json(path)?,
            None => AssistantConfig::default(),
        };
        if let Some(s) = self.strategy {
            cfg.strategy = s;
        }
        if let Some(side) = self.side {
            cfg.side_to_move = side.into();
        }
        if let Some(engine) = &self.engine {
            cfg.engine.path = engine.clone();
        }
        if let Some(depth) = self.depth {
            cfg.engine.depth = depth;
        }
        if self.both_sides {
            cfg.both_sides = true;
        }
        if self.debug_dir.is_some() {
            cfg.debug_dir = self.debug_dir.clone();
        }
        if self.substitute_opening {
            cfg.failure_policy = FailurePolicy::SubstituteOpening;
        }
        Ok(cfg)
    }
}

fn init_logging(cli: &Cli) {
    #[cfg(feature = "tracing")]
    {
        let _ = (cli.verbose, cli.quiet);
        xqsight::core::init_tracing(false);
        // already installed unless the subscriber failed to initialize
        let _ = LogTracer::init();
    }
    #[cfg(not(feature = "tracing"))]
    {
        let level = if cli.quiet {
            log::LevelFilter::Error
        } else {
            xqsight::core::level_from_verbosity(cli.verbose)
        };
        let _ = xqsight::core::init_with_level(level);
    }
}

fn print_report(report: &AttemptReport) {
    println!("status: {}", report.status_text);
    if let Some(record) = &report.record {
        if let Ok(grid) = record.decode() {
            println!("{}", grid.render_text());
        }
        println!("{record}");
    }
    if report.low_confidence_cells > 0 {
        println!("low-confidence points: {}", report.low_confidence_cells);
    }
    for s in &report.suggestions {
        println!("{} to move: {}", s.side, s.summary());
    }
}

fn recognize(
    image: PathBuf,
    common: &CommonArgs,
    analyze: bool,
    report_path: Option<PathBuf>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut cfg = common.resolve()?;
    cfg.analyze = analyze || common.both_sides;
    let mut orchestrator = Orchestrator::from_config(&cfg);
    let report = orchestrator.attempt(load_color_image(&image));

    print_report(&report);
    if let Some(path) = report_path {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
    }
    Ok(match report.status {
        AttemptStatus::Valid => ExitCode::SUCCESS,
        _ if report.substituted => ExitCode::SUCCESS,
        _ => ExitCode::from(2),
    })
}

fn screen_capture(cfg: &AssistantConfig) -> Result<Box<dyn ScreenCapture>, Box<dyn std::error::Error>> {
    #[cfg(feature = "screen")]
    {
        Ok(Box::new(xqsight::XcapCapture::new(cfg.capture.region)))
    }
    #[cfg(not(feature = "screen"))]
    {
        let _ = cfg;
        Err("screen capture needs the `screen` feature; pass --image instead".into())
    }
}

fn watch(
    common: &CommonArgs,
    image: Option<PathBuf>,
    interval_ms: Option<u64>,
    no_analyze: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut cfg = common.resolve()?;
    if let Some(ms) = interval_ms {
        cfg.interval_ms = ms;
    }
    cfg.validate()?;
    if no_analyze {
        cfg.analyze = false;
    }
    let capture: Box<dyn ScreenCapture> = match image.or_else(|| cfg.capture.image_path.clone()) {
        Some(path) => Box::new(FileCapture::new(path, cfg.capture.region)),
        None => screen_capture(&cfg)?,
    };

    let scheduler = Scheduler::start(Orchestrator::from_config(&cfg), capture, cfg.interval())?;
    scheduler.trigger();
    eprintln!("watching every {} ms; close stdin (Ctrl-D) to stop", cfg.interval_ms);

    let (eof_tx, eof_rx) = crossbeam_channel::bounded::<()>(1);
    std::thread::spawn(move || {
        let mut line = String::new();
        while std::io::stdin().read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
            line.clear();
        }
        let _ = eof_tx.send(());
    });

    let mut last_status = String::new();
    loop {
        crossbeam_channel::select! {
            recv(scheduler.reports()) -> report => {
                let Ok(report) = report else { break };
                if report.changed || report.status_text != last_status {
                    print_report(&report);
                }
                last_status = report.status_text;
            }
            recv(eof_rx) -> _ => break,
        }
    }
    let snap = scheduler.snapshot();
    drop(scheduler.join());
    eprintln!("{} attempts, {} ticks skipped", snap.attempts, snap.skipped_ticks);
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Command::Recognize {
            image,
            common,
            analyze,
            report,
        } => recognize(image, &common, analyze, report),
        Command::Watch {
            common,
            image,
            interval_ms,
            no_analyze,
        } => watch(&common, image, interval_ms, no_analyze),
        Command::InitConfig { path } => {
            AssistantConfig::default().write_json(&path)?;
            println!("wrote {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
