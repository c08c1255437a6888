//! Two-axis satellite tracking mount.
//!
//! The crate is split along the two loops that run the mount:
//!
//! - [`control`]: the fast loop. Encoders, per-axis PID, homing, emergency stop
//!   and the motor output stage.
//! - [`tracker`]: the slow loop. Accepts orbital elements through a single-slot
//!   handoff and drives the [`predict`] pipeline that writes the shared target.
//!
//! Both loops only meet in [`shared::SharedState`]. Hardware is reached through
//! the capability traits in [`hardware`], so everything here runs against
//! [`hardware::sim`] as well as real drivers.

pub mod config;
pub mod control;
pub mod hardware;
pub mod mount;
pub mod predict;
pub mod shared;
pub mod tracker;

pub use config::Config;
pub use mount::{Mount, MountHardware};
pub use shared::{MountStatus, SharedState, TargetPosition};
