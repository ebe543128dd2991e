// Line adapters: where edges come from and where levels go to.
// The codec itself only sees signal callbacks, waits and edge events.

pub mod clock;
pub mod loopback;
pub mod sim;
pub mod worker;

pub use clock::{Clock, MonotonicClock, SimClock, SimWait};
pub use loopback::LoopbackLine;
pub use sim::{SimulatedLine, SimulatedLink};
pub use worker::EdgeWorker;
