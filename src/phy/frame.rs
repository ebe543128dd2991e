// Frame format: [Preamble: 1-4] [Size: 1] [Payload: Size] [CRC32: 4]
// All fields are sent MSB-first, multi-byte fields big-endian.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::crc::{bytes_to_bits, calculate_crc32, verify_crc32};
use crate::error::{ConfigError, FrameError};
use crate::utils::consts::{
    CHECKSUM_BITS, DEFAULT_PREAMBLE, DEFAULT_PREAMBLE_WIDTH, MAX_PAYLOAD_SIZE,
    SIZE_BITS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Preamble,
    Size,
    Data,
    Checksum,
    Done,
}

/// Wire parameters both ends of a link must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    preamble: u32,
    preamble_width: u8,
    max_payload: u8,
}

impl FrameFormat {
    pub fn new(
        preamble: u32,
        preamble_width: u8,
        max_payload: u8,
    ) -> Result<Self, ConfigError> {
        if !(1..=4).contains(&preamble_width) {
            return Err(ConfigError::PreambleWidth(preamble_width));
        }
        if preamble & !Self::mask_for(preamble_width) != 0 {
            return Err(ConfigError::PreambleOverflow {
                preamble,
                width: preamble_width,
            });
        }
        if max_payload == 0 {
            return Err(ConfigError::ZeroMaxPayload);
        }
        Ok(Self {
            preamble,
            preamble_width,
            max_payload,
        })
    }

    fn mask_for(width: u8) -> u32 {
        if width >= 4 {
            u32::MAX
        } else {
            (1u32 << (u32::from(width) * 8)) - 1
        }
    }

    pub fn preamble(&self) -> u32 {
        self.preamble
    }

    pub fn preamble_width(&self) -> u8 {
        self.preamble_width
    }

    pub fn max_payload(&self) -> u8 {
        self.max_payload
    }

    pub fn preamble_mask(&self) -> u32 {
        Self::mask_for(self.preamble_width)
    }

    /// Preamble bytes as they appear on the wire
    pub fn preamble_bytes(&self) -> Vec<u8> {
        let width = self.preamble_width as usize;
        self.preamble.to_be_bytes()[4 - width..].to_vec()
    }

    /// Bytes on the wire for a payload of `payload_len` bytes
    pub fn wire_len(&self, payload_len: usize) -> usize {
        self.preamble_width as usize + 1 + payload_len + 4
    }
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE,
            preamble_width: DEFAULT_PREAMBLE_WIDTH,
            max_payload: MAX_PAYLOAD_SIZE,
        }
    }
}

/// One frame, either being assembled bit by bit on the receive side or
/// built in one go on the send side.
#[derive(Debug, Clone)]
pub struct Frame {
    format: FrameFormat,
    preamble: u32,
    size: u8,
    payload: Vec<u8>,
    checksum: u32,
    stage: Stage,
    // bits accumulated in the current stage
    bit_pos: u16,
}

impl Frame {
    /// Empty receive-side frame waiting for the preamble
    pub fn new(format: FrameFormat) -> Self {
        Self {
            format,
            preamble: 0,
            size: 0,
            payload: Vec::new(),
            checksum: 0,
            stage: Stage::Preamble,
            bit_pos: 0,
        }
    }

    /// Send-side frame in the default format
    pub fn build(payload: &[u8]) -> Result<Self, FrameError> {
        Self::build_with_format(FrameFormat::default(), payload)
    }

    /// Send-side frame; goes straight to `Stage::Done`.
    pub fn build_with_format(
        format: FrameFormat,
        payload: &[u8],
    ) -> Result<Self, FrameError> {
        if payload.is_empty() {
            return Err(FrameError::EmptyPayload);
        }
        if payload.len() > format.max_payload as usize {
            return Err(FrameError::PayloadTooLarge {
                len: payload.len(),
                max: format.max_payload,
            });
        }

        Ok(Self {
            format,
            preamble: format.preamble,
            size: payload.len() as u8,
            payload: payload.to_vec(),
            checksum: calculate_crc32(payload),
            stage: Stage::Done,
            bit_pos: 0,
        })
    }

    pub fn format(&self) -> &FrameFormat {
        &self.format
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn preamble(&self) -> u32 {
        self.preamble
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Back to the freshly created state, keeping the format.
    pub fn reset(&mut self) {
        *self = Self::new(self.format);
    }

    /// Only meaningful once the frame is done; false before that.
    pub fn is_valid(&self) -> bool {
        self.is_done() && verify_crc32(&self.payload, self.checksum)
    }

    fn advance(&mut self, next: Stage) {
        trace!("frame stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
        self.bit_pos = 0;
    }

    /// Feed one received bit. Returns true once the frame is done.
    pub fn consume_bit(&mut self, bit: bool) -> bool {
        let bit = u8::from(bit);
        match self.stage {
            Stage::Preamble => {
                self.preamble = ((self.preamble << 1) | u32::from(bit))
                    & self.format.preamble_mask();
                if self.preamble == self.format.preamble {
                    self.advance(Stage::Size);
                }
            }
            Stage::Size => {
                self.size = (self.size << 1) | bit;
                self.bit_pos += 1;
                if self.bit_pos == SIZE_BITS {
                    if self.size == 0 || self.size > self.format.max_payload {
                        debug!("Invalid frame size {}, resetting", self.size);
                        self.reset();
                    } else {
                        self.payload = vec![0; self.size as usize];
                        self.advance(Stage::Data);
                    }
                }
            }
            Stage::Data => {
                let idx = (self.bit_pos / 8) as usize;
                self.payload[idx] = (self.payload[idx] << 1) | bit;
                self.bit_pos += 1;
                if self.bit_pos == u16::from(self.size) * 8 {
                    self.advance(Stage::Checksum);
                }
            }
            Stage::Checksum => {
                self.checksum = (self.checksum << 1) | u32::from(bit);
                self.bit_pos += 1;
                if self.bit_pos == CHECKSUM_BITS {
                    self.advance(Stage::Done);
                }
            }
            Stage::Done => {}
        }
        self.is_done()
    }

    /// Wire image: preamble, size, payload, checksum.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        if !self.is_done() {
            return Err(FrameError::Incomplete(self.stage));
        }

        let mut bytes = Vec::with_capacity(self.wire_len());
        bytes.extend_from_slice(&self.format.preamble_bytes());
        bytes.push(self.size);
        bytes.extend_from_slice(&self.payload);
        bytes.extend_from_slice(&self.checksum.to_be_bytes());
        Ok(bytes)
    }

    pub fn wire_len(&self) -> usize {
        self.format.wire_len(self.payload.len())
    }

    /// Push the wire image into `sink` one bit at a time, MSB-first.
    pub fn serialize<F>(&self, mut sink: F) -> Result<(), FrameError>
    where
        F: FnMut(bool),
    {
        for bit in bytes_to_bits(&self.to_bytes()?) {
            sink(bit);
        }
        Ok(())
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(FrameFormat::default())
    }
}
