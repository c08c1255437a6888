mod axis;
mod drive;
mod encoder;
mod error;
mod estop;
mod homing;
mod pid;

pub use axis::{wrap_azimuth_error, wrap_degrees, Axis, AxisId, MotorStage};
pub use drive::{run_control_loop, DriveCommand, DriveLoop, DriveMode, FaultKind, TickReport};
pub use encoder::Encoder;
pub use error::ControlError;
pub use estop::EmergencyStop;
pub use homing::{AxisHoming, HomingSequencer, HomingState};
pub use pid::PidController;
