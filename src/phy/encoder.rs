use super::crc::byte_to_bits;
use super::frame::{Frame, FrameFormat};
use super::line_coding::{ManchesterEncoder, ManchesterTiming};
use super::timing::HalfPeriodWait;
use crate::error::FrameError;
use crate::utils::consts::{
    DEFAULT_INTER_FRAME_GAP, DEFAULT_SYNC_BYTES, SYNC_PATTERN,
};
use tracing::{debug, info};

/// Sender side of the link: frames payloads and drives the line.
///
/// A transmission is `[sync: N x 0xAA] [frame] [idle gap]`. The sync bits
/// alternate, so every transition they produce is a mid-bit one and the
/// receiver locks onto the right half-period phase before the preamble.
pub struct PhyEncoder<W: HalfPeriodWait> {
    line_code: ManchesterEncoder<W>,
    format: FrameFormat,
    sync_bytes: usize,
    inter_frame_gap: u32,
}

impl<W: HalfPeriodWait> PhyEncoder<W> {
    pub fn new(timing: ManchesterTiming, format: FrameFormat, wait: W) -> Self {
        info!("PhyEncoder initialized:");
        info!("  - half-period: {} ns", timing.half_period_ns());
        info!(
            "  - preamble: {:#x} ({} bytes)",
            format.preamble(),
            format.preamble_width()
        );

        Self {
            line_code: ManchesterEncoder::new(timing, wait),
            format,
            sync_bytes: DEFAULT_SYNC_BYTES,
            inter_frame_gap: DEFAULT_INTER_FRAME_GAP,
        }
    }

    pub fn with_sync_bytes(mut self, sync_bytes: usize) -> Self {
        self.sync_bytes = sync_bytes;
        self
    }

    pub fn with_inter_frame_gap(mut self, half_periods: u32) -> Self {
        self.inter_frame_gap = half_periods;
        self
    }

    pub fn format(&self) -> &FrameFormat {
        &self.format
    }

    pub fn line_code(&self) -> &ManchesterEncoder<W> {
        &self.line_code
    }

    /// Bits put on the line for a payload of `payload_len` bytes
    pub fn bits_for_payload(&self, payload_len: usize) -> usize {
        (self.sync_bytes + self.format.wire_len(payload_len)) * 8
    }

    /// Manchester-encode `bytes` as-is, without sync, framing or gap.
    pub fn send_raw<S>(&mut self, bytes: &[u8], signal: &mut S) -> usize
    where
        S: FnMut(bool),
    {
        self.line_code
            .encode_bits(bytes.iter().flat_map(|&b| byte_to_bits(b)), signal);
        bytes.len() * 8
    }

    /// Build a frame around `payload` and transmit it. Blocks for the whole
    /// transmission.
    pub fn send<S>(&mut self, payload: &[u8], signal: &mut S) -> Result<usize, FrameError>
    where
        S: FnMut(bool),
    {
        let frame = Frame::build_with_format(self.format, payload)?;
        self.send_frame(&frame, signal)
    }

    pub fn send_frame<S>(&mut self, frame: &Frame, signal: &mut S) -> Result<usize, FrameError>
    where
        S: FnMut(bool),
    {
        self.send_frame_observed(frame, signal, |_| {})
    }

    /// Like `send_frame`, calling `on_bit` with the number of bits sent so far.
    pub fn send_frame_observed<S, P>(
        &mut self,
        frame: &Frame,
        signal: &mut S,
        mut on_bit: P,
    ) -> Result<usize, FrameError>
    where
        S: FnMut(bool),
        P: FnMut(usize),
    {
        let wire = frame.to_bytes()?;
        let sync = vec![SYNC_PATTERN; self.sync_bytes];

        debug!(
            "Encoding frame: size={}, checksum={:#010x}, total_bits={}",
            frame.size(),
            frame.checksum(),
            (sync.len() + wire.len()) * 8
        );

        let mut sent = 0;
        for &byte in sync.iter().chain(wire.iter()) {
            for bit in byte_to_bits(byte) {
                self.line_code.encode_bit(bit, signal);
                sent += 1;
                on_bit(sent);
            }
        }

        for _ in 0..self.inter_frame_gap {
            self.line_code.idle();
        }

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingWait(usize);

    impl HalfPeriodWait for CountingWait {
        fn wait(&mut self) {
            self.0 += 1;
        }
    }

    fn encoder() -> PhyEncoder<CountingWait> {
        PhyEncoder::new(
            ManchesterTiming::from_speed(1000).unwrap(),
            FrameFormat::default(),
            CountingWait(0),
        )
    }

    #[test]
    fn test_encoder_bit_count() {
        let mut enc = encoder();
        let mut transitions = 0;
        let sent = enc.send(b"HELLO", &mut |_| transitions += 1).unwrap();

        // sync(2) + preamble(4) + size(1) + payload(5) + crc(4)
        assert_eq!(sent, 16 * 8);
        assert_eq!(sent, enc.bits_for_payload(5));
        // checksum 0xC1446436 ends on a 0 bit
        assert!(!enc.line_code().previous_bit());
        assert!(transitions >= sent);
    }

    #[test]
    fn test_waits_per_transmission() {
        let mut enc = encoder().with_sync_bytes(0).with_inter_frame_gap(3);
        let sent = enc.send(b"A", &mut |_| {}).unwrap();
        // two half-periods per bit plus the idle gap
        assert_eq!(enc.line_code().pacing().0, sent * 2 + 3);
    }

    #[test]
    fn test_rejects_empty_payload() {
        let mut enc = encoder();
        assert_eq!(
            enc.send(&[], &mut |_| {}).unwrap_err(),
            FrameError::EmptyPayload
        );
    }

    #[test]
    fn test_progress_reaches_total() {
        let mut enc = encoder();
        let frame = Frame::build(b"xyz").unwrap();
        let mut last = 0;
        enc.send_frame_observed(&frame, &mut |_| {}, |n| last = n)
            .unwrap();
        assert_eq!(last, enc.bits_for_payload(3));
    }
}
