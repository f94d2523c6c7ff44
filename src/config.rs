//! Configuration management for session and controller tuning
//!
//! This module provides runtime configuration loading from JSON files so that
//! tempo bounds, adaptive-controller parameters and session identity can be
//! changed between runs without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tempo: TempoConfig,
    pub adaptive: AdaptiveConfig,
    pub round: RoundConfig,
    pub scheduler: SchedulerConfig,
    pub session: SessionConfig,
}

/// Tempo bounds and the subdivision grid
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    /// Starting bpm when no calibration result is supplied
    pub initial_bpm: f64,
    /// Lowest bpm the controller may reach
    pub min_bpm: f64,
    /// Highest bpm the controller may reach; also normalizes performance
    pub max_bpm: f64,
    /// Replaces `max_bpm` in evaluation mode
    pub evaluation_max_bpm: f64,
    /// Ticks per quarter-note beat
    pub subdivisions: u32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            initial_bpm: 80.0,
            min_bpm: 5.0,
            max_bpm: 750.0,
            evaluation_max_bpm: 1000.0,
            subdivisions: 8,
        }
    }
}

/// Adaptive tempo controller parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Consecutive successes needed before tempo increases
    pub modification_frequency: u32,
    pub min_modification_frequency: u32,
    pub max_modification_frequency: u32,
    /// Bpm change applied per increase/decrease
    pub modification_step: u32,
    pub min_modification_step: u32,
    pub max_modification_step: u32,
    /// Multiplier applied to the step on error
    pub error_penalty_factor: f64,
    /// Bpm change applied by a manual tempo nudge
    pub bpm_nudge: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            modification_frequency: 2,
            min_modification_frequency: 1,
            max_modification_frequency: 8,
            modification_step: 1,
            min_modification_step: 0,
            max_modification_step: 5,
            error_penalty_factor: 1.0,
            bpm_nudge: 5.0,
        }
    }
}

/// Round bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Resolved units per round
    pub length: u32,
    /// `allUnits` is trimmed by `length` once it reaches this size
    pub trim_threshold: usize,
    /// Note at which the captured round start becomes effective
    pub start_capture_offset: u32,
    /// Note of the following round at which the flush happens
    pub flush_offset: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            length: 600,
            trim_threshold: 604,
            start_capture_offset: 3,
            flush_offset: 2,
        }
    }
}

/// Scheduler thread tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Sleep stops this many microseconds before a deadline; the rest is polled
    pub spin_margin_us: u64,
    /// Elapsed time of at least `overrun_factor` intervals counts as an overrun
    pub overrun_factor: f64,
    pub keystroke_queue_capacity: usize,
    pub command_queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            spin_margin_us: 500,
            overrun_factor: 2.0,
            keystroke_queue_capacity: 256,
            command_queue_capacity: 64,
        }
    }
}

/// Training mode selecting the catalog variant and tempo policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    /// Data collection: calibrated start tempo, random patterns, adjustable parameters
    Training,
    /// Evaluation: fixed start tempo reset every round, parameters locked
    Evaluation,
}

/// Training day within a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingDay {
    One,
    Two,
}

/// Participant and output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub mode: TrainingMode,
    pub day: TrainingDay,
    /// Participant pseudonym used to key round exports
    pub pseudonym: String,
    /// Characters assigned to non-silent units, cycled
    pub practice_text: String,
    /// Directory for round export files
    pub output_dir: PathBuf,
    /// Seed for random pattern generation; entropy when absent
    pub rng_seed: Option<u64>,
    /// Accept every round without waiting for confirmation
    pub auto_validate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: TrainingMode::Training,
            day: TrainingDay::One,
            pseudonym: "anonymous".to_string(),
            practice_text: "asdfjklghqweruiop".to_string(),
            output_dir: PathBuf::from("rounds"),
            rng_seed: None,
            auto_validate: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults when the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/session_config.json")
    }

    /// Upper bpm bound for the configured mode
    pub fn effective_max_bpm(&self) -> f64 {
        match self.session.mode {
            TrainingMode::Training => self.tempo.max_bpm,
            TrainingMode::Evaluation => self.tempo.evaluation_max_bpm,
        }
    }
}
