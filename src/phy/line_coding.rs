// Manchester encoding: 0 -> high then low, 1 -> low then high.
// Equal consecutive bits get an extra transition at the bit boundary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::timing::HalfPeriodWait;
use crate::error::ConfigError;
use crate::utils::consts::{DEFAULT_SENSITIVITY, NANOS_PER_SECOND};

/// Direction of an observed transition; Up is the line going high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Down,
    Up,
}

impl Edge {
    /// Edge that brings the line to `level`
    pub fn from_level(level: bool) -> Self {
        if level { Edge::Up } else { Edge::Down }
    }

    /// Bit carried by this edge when it is a mid-bit transition
    pub fn bit(self) -> bool {
        self == Edge::Up
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEvent {
    pub edge: Edge,
    pub timestamp_ns: i64,
}

impl EdgeEvent {
    pub fn new(edge: Edge, timestamp_ns: i64) -> Self {
        Self { edge, timestamp_ns }
    }
}

/// Half-period and tolerance band of a link, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManchesterTiming {
    half_period_ns: u64,
    sensitivity_ns: u64,
}

impl ManchesterTiming {
    /// `transfer_speed` in bits per second, sensitivity at the default 0.6.
    pub fn from_speed(transfer_speed: u32) -> Result<Self, ConfigError> {
        Self::with_sensitivity_fraction(transfer_speed, DEFAULT_SENSITIVITY)
    }

    pub fn with_sensitivity_fraction(
        transfer_speed: u32,
        fraction: f64,
    ) -> Result<Self, ConfigError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::SensitivityFraction(fraction));
        }
        let half_period_ns = Self::half_period_for(transfer_speed)?;
        let sensitivity_ns = (half_period_ns as f64 * fraction) as u64;
        Self::new(half_period_ns, sensitivity_ns)
            .map_err(|_| ConfigError::HalfPeriodTooShort { bps: transfer_speed })
    }

    pub fn with_sensitivity_nanos(
        transfer_speed: u32,
        sensitivity_ns: u64,
    ) -> Result<Self, ConfigError> {
        Self::new(Self::half_period_for(transfer_speed)?, sensitivity_ns)
    }

    pub fn new(
        half_period_ns: u64,
        sensitivity_ns: u64,
    ) -> Result<Self, ConfigError> {
        if sensitivity_ns == 0 || sensitivity_ns >= half_period_ns {
            return Err(ConfigError::SensitivityOutOfRange {
                sensitivity_ns,
                half_period_ns,
            });
        }
        Ok(Self {
            half_period_ns,
            sensitivity_ns,
        })
    }

    fn half_period_for(transfer_speed: u32) -> Result<u64, ConfigError> {
        if transfer_speed == 0 {
            return Err(ConfigError::ZeroTransferSpeed);
        }
        let half_period_ns = NANOS_PER_SECOND / u64::from(transfer_speed) / 2;
        if half_period_ns == 0 {
            return Err(ConfigError::HalfPeriodTooShort { bps: transfer_speed });
        }
        Ok(half_period_ns)
    }

    pub fn half_period_ns(&self) -> u64 {
        self.half_period_ns
    }

    pub fn half_period(&self) -> Duration {
        Duration::from_nanos(self.half_period_ns)
    }

    pub fn sensitivity_ns(&self) -> u64 {
        self.sensitivity_ns
    }

    /// Round an interval to a number of half-periods, biased by the
    /// sensitivity: `1 + floor((elapsed - sensitivity) / half_period)`.
    pub fn multiplier(&self, elapsed_ns: i64) -> i64 {
        let shifted = elapsed_ns.saturating_sub(self.sensitivity_ns as i64);
        1 + shifted.div_euclid(self.half_period_ns as i64)
    }
}

/// Sender half of the codec. Drives the line through a signal callback and
/// paces itself with the injected wait.
pub struct ManchesterEncoder<W: HalfPeriodWait> {
    timing: ManchesterTiming,
    previous_bit: bool,
    wait: W,
}

impl<W: HalfPeriodWait> ManchesterEncoder<W> {
    pub fn new(timing: ManchesterTiming, wait: W) -> Self {
        Self {
            timing,
            previous_bit: false,
            wait,
        }
    }

    pub fn timing(&self) -> &ManchesterTiming {
        &self.timing
    }

    pub fn pacing(&self) -> &W {
        &self.wait
    }

    /// Level the line was left at by the last bit
    pub fn previous_bit(&self) -> bool {
        self.previous_bit
    }

    /// Hold the line for one half-period
    pub fn idle(&mut self) {
        self.wait.wait();
    }

    pub fn encode_bit<S>(&mut self, bit: bool, signal: &mut S)
    where
        S: FnMut(bool),
    {
        if self.previous_bit == bit {
            signal(!bit);
        }
        self.previous_bit = bit;
        self.wait.wait();
        signal(bit);
        self.wait.wait();
    }

    pub fn encode_bits<I, S>(&mut self, bits: I, signal: &mut S)
    where
        I: IntoIterator<Item = bool>,
        S: FnMut(bool),
    {
        for bit in bits {
            self.encode_bit(bit, signal);
        }
    }
}

/// Receiver half of the codec: classifies edge intervals into bits.
#[derive(Debug, Clone)]
pub struct ManchesterDecoder {
    timing: ManchesterTiming,
    // Start of the current bit period, or of the half-period after a
    // boundary edge. None until the first edge or after lock loss.
    last_sync: Option<i64>,
    desync_count: u64,
}

impl ManchesterDecoder {
    pub fn new(timing: ManchesterTiming) -> Self {
        Self {
            timing,
            last_sync: None,
            desync_count: 0,
        }
    }

    pub fn timing(&self) -> &ManchesterTiming {
        &self.timing
    }

    pub fn is_synchronized(&self) -> bool {
        self.last_sync.is_some()
    }

    pub fn last_sync(&self) -> Option<i64> {
        self.last_sync
    }

    /// Number of times the clock lock was lost
    pub fn desync_count(&self) -> u64 {
        self.desync_count
    }

    pub fn reset(&mut self) {
        self.last_sync = None;
    }

    fn data_edge(&mut self, edge: Edge, timestamp_ns: i64) -> Option<bool> {
        self.last_sync =
            Some(timestamp_ns.saturating_sub(self.timing.half_period_ns as i64));
        Some(edge.bit())
    }

    /// Classify one edge. Timestamps must be non-decreasing.
    pub fn decode_edge(&mut self, edge: Edge, timestamp_ns: i64) -> Option<bool> {
        let Some(last_sync) = self.last_sync else {
            return self.data_edge(edge, timestamp_ns);
        };

        match self.timing.multiplier(timestamp_ns.saturating_sub(last_sync)) {
            2 => {
                self.last_sync = Some(timestamp_ns);
                None
            }
            1 | 3 => self.data_edge(edge, timestamp_ns),
            _ => {
                self.last_sync = None;
                self.desync_count += 1;
                None
            }
        }
    }

    pub fn decode_event(&mut self, event: EdgeEvent) -> Option<bool> {
        self.decode_edge(event.edge, event.timestamp_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoWait;

    impl HalfPeriodWait for NoWait {
        fn wait(&mut self) {}
    }

    // 1000 bps -> 500 us half-period
    fn timing() -> ManchesterTiming {
        ManchesterTiming::from_speed(1000).unwrap()
    }

    fn bits_to_u16(bits: &[bool]) -> u16 {
        bits.iter().fold(0, |acc, &b| (acc << 1) | u16::from(b))
    }

    #[test]
    fn test_timing_from_speed() {
        let t = timing();
        assert_eq!(t.half_period_ns(), 500_000);
        assert_eq!(t.sensitivity_ns(), 300_000);
    }

    #[test]
    fn test_timing_rejects_bad_config() {
        assert!(matches!(
            ManchesterTiming::from_speed(0),
            Err(ConfigError::ZeroTransferSpeed)
        ));
        assert!(matches!(
            ManchesterTiming::from_speed(u32::MAX),
            Err(ConfigError::HalfPeriodTooShort { .. })
        ));
        assert!(matches!(
            ManchesterTiming::with_sensitivity_fraction(1000, 1.5),
            Err(ConfigError::SensitivityFraction(_))
        ));
        assert!(matches!(
            ManchesterTiming::with_sensitivity_nanos(1000, 500_000),
            Err(ConfigError::SensitivityOutOfRange { .. })
        ));
    }

    #[test]
    fn test_decoding() {
        let mut m = ManchesterDecoder::new(timing());
        let t = timing().half_period_ns() as i64;
        let mut out = Vec::new();
        let mut now = 0i64;

        // 0 1 0 0 1 1
        let script = [
            (Edge::Down, 0),
            (Edge::Up, 2 * t),
            (Edge::Down, 2 * t),
            (Edge::Up, t), // boundary
            (Edge::Down, t),
            (Edge::Up, 2 * t),
            (Edge::Down, t), // boundary
            (Edge::Up, t),
        ];
        let mut emitted = Vec::new();
        for (edge, step) in script {
            now += step;
            let bit = m.decode_edge(edge, now);
            emitted.push(bit.is_some());
            out.extend(bit);
        }

        assert_eq!(out, vec![false, true, false, false, true, true]);
        assert_eq!(bits_to_u16(&out), 19);
        assert_eq!(
            emitted,
            vec![true, true, true, false, true, true, false, true]
        );
        assert_eq!(m.desync_count(), 0);
    }

    #[test]
    fn test_encoder_transitions() {
        let mut enc = ManchesterEncoder::new(timing(), NoWait);
        let mut levels = Vec::new();
        let mut signal = |level: bool| levels.push(level);

        // line idles low, so a leading 1 needs no boundary transition
        enc.encode_bit(true, &mut signal);
        enc.encode_bit(true, &mut signal);
        enc.encode_bit(false, &mut signal);
        enc.encode_bit(false, &mut signal);

        assert_eq!(levels, vec![true, false, true, false, true, false]);
        assert!(!enc.previous_bit());
    }

    #[test]
    fn test_encode_then_decode_with_virtual_time() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct Tick(Rc<Cell<i64>>, i64);
        impl HalfPeriodWait for Tick {
            fn wait(&mut self) {
                self.0.set(self.0.get() + self.1);
            }
        }

        let t = timing();
        let now = Rc::new(Cell::new(0i64));
        let mut enc =
            ManchesterEncoder::new(t, Tick(now.clone(), t.half_period_ns() as i64));
        let mut dec = ManchesterDecoder::new(t);

        let bits = [true, false, true, true, false, false, false, true, false];
        let mut out = Vec::new();
        let mut signal = |level: bool| {
            out.extend(dec.decode_edge(Edge::from_level(level), now.get()));
        };
        enc.encode_bits(bits, &mut signal);

        assert_eq!(out, bits.to_vec());
    }

    #[test]
    fn test_jitter_inside_band() {
        let t = timing();
        let h = t.half_period_ns() as i64;
        let s = t.sensitivity_ns() as i64;

        // lowest and highest elapsed values for each multiplier
        assert_eq!(t.multiplier(s), 1);
        assert_eq!(t.multiplier(h + s - 1), 1);
        assert_eq!(t.multiplier(h + s), 2);
        assert_eq!(t.multiplier(2 * h + s - 1), 2);
        assert_eq!(t.multiplier(2 * h + s), 3);
        assert_eq!(t.multiplier(3 * h + s - 1), 3);
        assert_eq!(t.multiplier(3 * h + s), 4);
        assert_eq!(t.multiplier(s - 1), 0);
        assert_eq!(t.multiplier(-h), -1);
    }

    #[test]
    fn test_drifted_edges_still_decode() {
        let t = timing();
        let h = t.half_period_ns() as i64;
        let mut m = ManchesterDecoder::new(t);

        assert_eq!(m.decode_edge(Edge::Up, 0), Some(true));
        // data edge one full bit later, 25% late
        assert_eq!(m.decode_edge(Edge::Down, 2 * h + h / 4), Some(false));
        // boundary edge, 30% early
        let boundary = 3 * h + h / 4 - 3 * h / 10;
        assert_eq!(m.decode_edge(Edge::Up, boundary), None);
        // mid-bit edge, 20% late
        assert_eq!(m.decode_edge(Edge::Down, boundary + h + h / 5), Some(false));
        assert!(m.is_synchronized());
    }

    #[test]
    fn test_desync_on_long_gap() {
        let t = timing();
        let h = t.half_period_ns() as i64;
        let mut m = ManchesterDecoder::new(t);

        assert_eq!(m.decode_edge(Edge::Down, 0), Some(false));
        // 4 half-periods after the reference
        assert_eq!(m.decode_edge(Edge::Up, 3 * h), None);
        assert!(!m.is_synchronized());
        assert_eq!(m.desync_count(), 1);

        // next edge re-anchors and emits immediately
        assert_eq!(m.decode_edge(Edge::Down, 10 * h), Some(false));
        assert_eq!(m.last_sync(), Some(9 * h));
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let mut m = ManchesterDecoder::new(timing());

        assert_eq!(m.decode_edge(Edge::Up, i64::MIN), Some(true));
        assert_eq!(m.last_sync(), Some(i64::MIN));
        assert_eq!(m.decode_edge(Edge::Down, i64::MAX), None);
        assert!(!m.is_synchronized());
        assert_eq!(m.desync_count(), 1);
    }

    #[test]
    fn test_desync_on_early_glitch() {
        let t = timing();
        let h = t.half_period_ns() as i64;
        let mut m = ManchesterDecoder::new(t);

        assert_eq!(m.decode_edge(Edge::Up, 0), Some(true));
        assert_eq!(m.decode_edge(Edge::Down, h), None);
        // glitch well inside the tolerance band of the last reference
        assert_eq!(m.decode_edge(Edge::Up, h + h / 10), None);
        assert!(!m.is_synchronized());
    }
}
