//! Manchester-coded framing for a single signal line with no shared clock.
//!
//! The sender toggles a line through a signal callback ([`phy::PhyEncoder`]);
//! the receiver feeds timestamped edges to [`phy::PhyDecoder`], which
//! recovers bit timing from the transition intervals and reassembles
//! preamble-synchronized, CRC32-checked frames.

pub mod error;
pub mod line;
pub mod phy;
pub mod ui;
pub mod utils;

pub use error::{ConfigError, FrameError};
