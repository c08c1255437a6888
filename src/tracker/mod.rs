mod error;
mod handoff;
mod parsing;
mod tracker;
mod types;

pub use error::TrackerError;
pub use handoff::{Delivery, HandoffState, Mailbox};
pub use parsing::{parse_tle_file, parse_tle_lines};
pub use tracker::{run_tracking_loop, TrackingEvent, TrackingLoop};
pub use types::{ElementSet, LINE_LEN, NAME_MAX};
