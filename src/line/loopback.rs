use crossbeam_channel::Sender;
use tracing::warn;

use super::clock::{Clock, MonotonicClock};
use crate::phy::{Edge, EdgeEvent};

/// Real-time line: every level change is stamped with the wall clock at the
/// moment it is driven and queued for the receiver.
pub struct LoopbackLine<C: Clock = MonotonicClock> {
    clock: C,
    level: bool,
    events: Sender<EdgeEvent>,
    disconnected: bool,
}

impl LoopbackLine<MonotonicClock> {
    pub fn new(events: Sender<EdgeEvent>) -> Self {
        Self::with_clock(MonotonicClock::new(), events)
    }
}

impl<C: Clock> LoopbackLine<C> {
    pub fn with_clock(clock: C, events: Sender<EdgeEvent>) -> Self {
        Self {
            clock,
            level: false,
            events,
            disconnected: false,
        }
    }

    pub fn drive(&mut self, level: bool) {
        if level == self.level {
            return;
        }
        self.level = level;

        let event = EdgeEvent::new(Edge::from_level(level), self.clock.now_ns());
        if self.events.send(event).is_err() && !self.disconnected {
            warn!("Receiver gone, edges are being dropped");
            self.disconnected = true;
        }
    }
}
