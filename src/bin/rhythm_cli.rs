use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use rhythm_trainer::calibration::calibrate;
use rhythm_trainer::config::{AppConfig, TrainingDay, TrainingMode};
use rhythm_trainer::rhythm::{base_patterns, DaySchedule, RANDOM_PATTERN_INDEX};
use rhythm_trainer::scheduler::RoundVerdict;
use rhythm_trainer::testing::{PlayerProfile, SimulationDriver, SimulationOptions};
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "rhythm_cli",
    about = "Headless tooling for the adaptive rhythm trainer"
)]
struct Cli {
    /// JSON configuration file (assets/session_config.json when absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a virtual-time session against a simulated player
    Simulate {
        #[arg(long, default_value_t = 1)]
        rounds: u32,
        #[arg(long, default_value_t = 1.0)]
        hit_rate: f64,
        #[arg(long, default_value_t = 0.0)]
        jitter_ms: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Starting bpm (training mode only)
        #[arg(long)]
        bpm: Option<f64>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        day: Option<u8>,
        /// Decline every round instead of accepting it
        #[arg(long)]
        decline: bool,
        /// Write accepted rounds to this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Stop after this many ticks even if rounds remain
        #[arg(long)]
        max_ticks: Option<u64>,
    },
    /// Print the base pattern catalog
    Patterns {
        #[arg(long, value_enum, default_value_t = ModeArg::Training)]
        mode: ModeArg,
    },
    /// Print a day schedule
    Schedule {
        #[arg(long, value_enum, default_value_t = ModeArg::Training)]
        mode: ModeArg,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
        day: u8,
    },
    /// Derive a starting bpm from typing-test keystroke instants (seconds)
    Calibrate {
        #[arg(long, value_delimiter = ',', required = true)]
        instants: Vec<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Training,
    Evaluation,
}

impl From<ModeArg> for TrainingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Training => TrainingMode::Training,
            ModeArg::Evaluation => TrainingMode::Evaluation,
        }
    }
}

fn day_from_number(day: u8) -> TrainingDay {
    if day == 2 {
        TrainingDay::Two
    } else {
        TrainingDay::One
    }
}

#[derive(Serialize)]
struct PatternEntry {
    index: usize,
    values: Vec<u8>,
}

#[derive(Serialize)]
struct ScheduleReport {
    mode: TrainingMode,
    day: TrainingDay,
    random_index: usize,
    entries: Vec<usize>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    rhythm_trainer::init_logging(match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    });

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Simulate {
            rounds,
            hit_rate,
            jitter_ms,
            seed,
            bpm,
            mode,
            day,
            decline,
            output_dir,
            max_ticks,
        } => {
            let mut config = config;
            if let Some(mode) = mode {
                config.session.mode = mode.into();
            }
            if let Some(day) = day {
                config.session.day = day_from_number(day);
            }
            if config.session.rng_seed.is_none() {
                config.session.rng_seed = Some(seed);
            }
            let options = SimulationOptions {
                rounds,
                initial_bpm: bpm,
                player: PlayerProfile {
                    hit_rate,
                    jitter_ms,
                    seed,
                },
                verdict: if decline {
                    RoundVerdict::Decline
                } else {
                    RoundVerdict::Accept
                },
                output_dir,
                max_ticks,
            };
            run_simulate(config, options)
        }
        Commands::Patterns { mode } => run_patterns(mode.into()),
        Commands::Schedule { mode, day } => run_schedule(mode.into(), day_from_number(day)),
        Commands::Calibrate { instants } => run_calibrate(&config, &instants),
    }
}

fn run_simulate(config: AppConfig, options: SimulationOptions) -> Result<ExitCode> {
    let mut driver =
        SimulationDriver::new(config, options).context("building simulation session")?;
    let summary = driver.run().context("running simulation")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::from(0))
}

fn run_patterns(mode: TrainingMode) -> Result<ExitCode> {
    let entries: Vec<PatternEntry> = base_patterns(mode)
        .iter()
        .enumerate()
        .map(|(index, pattern)| PatternEntry {
            index,
            values: pattern.iter().map(|kind| kind.value()).collect(),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(ExitCode::from(0))
}

fn run_schedule(mode: TrainingMode, day: TrainingDay) -> Result<ExitCode> {
    let schedule = DaySchedule::for_session(mode, day);
    let report = ScheduleReport {
        mode,
        day,
        random_index: RANDOM_PATTERN_INDEX,
        entries: schedule.entries().to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_calibrate(config: &AppConfig, instants: &[f64]) -> Result<ExitCode> {
    let result = calibrate(instants, &config.tempo).context("calibrating starting tempo")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::from(0))
}
