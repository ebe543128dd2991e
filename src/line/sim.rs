// Deterministic line simulation: a sender paced by virtual time and a
// recorder that turns level changes into timestamped edges.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::clock::{Clock, SimClock, SimWait};
use crate::error::{ConfigError, FrameError};
use crate::phy::{Edge, EdgeEvent, Frame, LinkConfig, PhyEncoder};

/// Records the edges seen on a line driven in virtual time.
pub struct SimulatedLine {
    clock: SimClock,
    level: bool,
    jitter_ns: i64,
    rng: StdRng,
    events: Vec<EdgeEvent>,
}

impl SimulatedLine {
    /// Line idles low
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            level: false,
            jitter_ns: 0,
            rng: StdRng::seed_from_u64(0),
            events: Vec::new(),
        }
    }

    /// Offset every edge by up to `±jitter_ns`, reproducibly for a seed.
    pub fn with_jitter(mut self, jitter_ns: u64, seed: u64) -> Self {
        self.jitter_ns = jitter_ns as i64;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn level(&self) -> bool {
        self.level
    }

    /// Drive the line. Only actual level changes produce an edge.
    pub fn drive(&mut self, level: bool) {
        if level == self.level {
            return;
        }
        self.level = level;

        let mut timestamp_ns = self.clock.now_ns();
        if self.jitter_ns > 0 {
            timestamp_ns += self.rng.random_range(-self.jitter_ns..=self.jitter_ns);
        }
        // edges must reach the decoder in order
        if let Some(last) = self.events.last() {
            timestamp_ns = timestamp_ns.max(last.timestamp_ns);
        }
        self.events.push(EdgeEvent::new(Edge::from_level(level), timestamp_ns));
    }

    pub fn events(&self) -> &[EdgeEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<EdgeEvent> {
        std::mem::take(&mut self.events)
    }
}

/// A sender wired to a `SimulatedLine`.
pub struct SimulatedLink {
    clock: SimClock,
    line: SimulatedLine,
    encoder: PhyEncoder<SimWait>,
}

impl SimulatedLink {
    pub fn new(config: &LinkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let timing = config.timing()?;
        let format = config.frame_format()?;
        let clock = SimClock::new();
        let wait = SimWait::new(clock.clone(), timing.half_period_ns());
        let encoder = PhyEncoder::new(timing, format, wait)
            .with_sync_bytes(config.sync_bytes)
            .with_inter_frame_gap(config.inter_frame_gap);

        Ok(Self {
            line: SimulatedLine::new(clock.clone()),
            clock,
            encoder,
        })
    }

    pub fn with_jitter(mut self, jitter_ns: u64, seed: u64) -> Self {
        self.line = self.line.with_jitter(jitter_ns, seed);
        self
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn send(&mut self, payload: &[u8]) -> Result<usize, FrameError> {
        let line = &mut self.line;
        let sent = self.encoder.send(payload, &mut |level| line.drive(level))?;
        debug!(
            "Simulated send of {} bytes: {} bits, {} edges so far",
            payload.len(),
            sent,
            self.line.events().len()
        );
        Ok(sent)
    }

    pub fn send_frame(&mut self, frame: &Frame) -> Result<usize, FrameError> {
        let line = &mut self.line;
        self.encoder.send_frame(frame, &mut |level| line.drive(level))
    }

    /// Manchester-encode bytes with no framing around them.
    pub fn send_raw(&mut self, bytes: &[u8]) -> usize {
        let line = &mut self.line;
        self.encoder.send_raw(bytes, &mut |level| line.drive(level))
    }

    /// Leave the line untouched for `ns` of virtual time.
    pub fn idle_ns(&mut self, ns: i64) {
        self.clock.advance(ns);
    }

    pub fn events(&self) -> &[EdgeEvent] {
        self.line.events()
    }

    pub fn take_events(&mut self) -> Vec<EdgeEvent> {
        self.line.take_events()
    }
}
