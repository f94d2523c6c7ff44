// Managers Module
//
// Focused helpers shared between the session runtime and its callers.
//
// Each manager handles one specific concern:
// - LatestValueChannel: newest-value publication for live visualization
// - CalibrationManager: typing-test calibration and its result

pub mod calibration_manager;
pub mod latest_value;

pub use calibration_manager::CalibrationManager;
pub use latest_value::LatestValueChannel;
