//! Multi-round simulations through the public API
//!
//! These tests drive whole sessions on virtual time and check the
//! round-level behavior:
//! - Round boundaries and the 600-row export size
//! - Evaluation-mode tempo reset and locked parameters
//! - Adaptive tempo direction for strong and weak players

use rhythm_trainer::config::{AppConfig, TrainingDay, TrainingMode};
use rhythm_trainer::performance::METRIC_COLUMNS;
use rhythm_trainer::testing::{PlayerProfile, SimulationDriver, SimulationOptions};

fn config(mode: TrainingMode, day: TrainingDay) -> AppConfig {
    let mut config = AppConfig::default();
    config.session.mode = mode;
    config.session.day = day;
    config.session.rng_seed = Some(21);
    config
}

#[test]
fn test_two_training_rounds_export_full_matrices() {
    let options = SimulationOptions {
        rounds: 2,
        initial_bpm: Some(150.0),
        player: PlayerProfile {
            hit_rate: 0.95,
            jitter_ms: 15.0,
            seed: 3,
        },
        ..SimulationOptions::default()
    };
    let mut driver =
        SimulationDriver::new(config(TrainingMode::Training, TrainingDay::Two), options).unwrap();
    let summary = driver.run().unwrap();

    assert_eq!(summary.rounds_completed, 2);
    assert_eq!(summary.exports.len(), 2);
    assert_eq!(summary.exports[0].round, 1);
    assert_eq!(summary.exports[1].round, 2);
    assert!(summary.exports.iter().all(|e| e.rows == 600 && e.persisted));

    let exports = driver.scheduler().sink().exports();
    assert_eq!(exports.len(), 2);
    for export in exports {
        assert_eq!(export.rows.len(), 600);
        assert_eq!(export.rows[0].values().len(), METRIC_COLUMNS);
        assert_eq!(export.pseudonym, "anonymous");
    }
    // Tracker stays bounded across rounds.
    assert!(driver.scheduler().tracker().len() < 604);
    assert_eq!(driver.scheduler().round(), 3);
}

#[test]
fn test_evaluation_rounds_restart_at_default_tempo() {
    let options = SimulationOptions {
        rounds: 1,
        initial_bpm: Some(300.0),
        ..SimulationOptions::default()
    };
    let mut driver =
        SimulationDriver::new(config(TrainingMode::Evaluation, TrainingDay::One), options)
            .unwrap();
    let summary = driver.run().unwrap();

    assert_eq!(summary.rounds_completed, 1);
    assert!(summary.peak_bpm > 80.0);
    assert_eq!(summary.final_bpm, 80.0);
}

#[test]
fn test_player_skill_sets_tempo_direction() {
    let run = |hit_rate: f64| {
        let options = SimulationOptions {
            rounds: 1,
            initial_bpm: Some(120.0),
            max_ticks: Some(2_400),
            player: PlayerProfile {
                hit_rate,
                jitter_ms: 10.0,
                seed: 8,
            },
            ..SimulationOptions::default()
        };
        SimulationDriver::new(config(TrainingMode::Training, TrainingDay::One), options)
            .unwrap()
            .run()
            .unwrap()
    };

    let strong = run(1.0);
    let weak = run(0.2);
    assert!(strong.final_bpm > 120.0);
    assert!(weak.final_bpm < 120.0);
    assert!(strong.mean_accuracy > weak.mean_accuracy);
    assert!(weak.errors > strong.errors);
}
