//! Platform abstraction layer
//!
//! Everything the simulation needs from the host, reduced to plain data:
//! - Input intent (direction, intensity, fire)
//! - Time (monotonic milliseconds)

pub mod input;
pub mod time;

pub use input::{InputIntent, InputSource};
pub use time::{Clock, ManualClock, SystemClock};
