//! Deterministic simulation harness.
//!
//! A seeded [`SimulatedPlayer`] presses keys with configurable reliability and
//! timing spread, and a [`SimulationDriver`] runs a whole session on virtual
//! time without threads or sleeping. Used by integration tests and the CLI
//! `simulate` command.

pub mod driver;
pub mod player;

pub use driver::{ExportSummary, SimulationDriver, SimulationOptions, SimulationSummary};
pub use player::{PlayerProfile, SimulatedPlayer};
