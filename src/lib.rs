// Rhythm Trainer Core - adaptive rhythm-training engine
// Fixed-rate tick scheduler with keystroke scoring and tempo adaptation

// Module declarations
pub mod calibration;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod managers;
pub mod performance;
pub mod rhythm;
pub mod scheduler;
pub mod telemetry;
pub mod testing;

// Re-exports for convenience
pub use config::AppConfig;
pub use engine::{ParamPatch, SessionHandle, SessionStatus};
pub use scheduler::{RoundVerdict, TickScheduler};

use tracing_subscriber::filter::LevelFilter;

/// Install the fmt subscriber; `log` records are bridged into it.
///
/// Safe to call more than once: later calls leave the first subscriber in
/// place.
pub fn init_logging(level: LevelFilter) {
    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();
    if installed {
        log::debug!("[Logging] Subscriber installed at {}", level);
    }
}
