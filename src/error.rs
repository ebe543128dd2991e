//! Error types for link configuration and frame construction.
//!
//! Per-edge and per-bit failures are not represented here: desynchronization,
//! preamble noise and invalid size fields are absorbed by the codecs.

use std::path::PathBuf;

use thiserror::Error;

use crate::phy::frame::Stage;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("transfer speed must be greater than zero")]
    ZeroTransferSpeed,
    #[error("transfer speed {bps} bps leaves a zero-length half-period")]
    HalfPeriodTooShort { bps: u32 },
    #[error("sensitivity {sensitivity_ns} ns must be within (0, {half_period_ns}) ns")]
    SensitivityOutOfRange {
        sensitivity_ns: u64,
        half_period_ns: u64,
    },
    #[error("sensitivity fraction {0} must be within (0, 1)")]
    SensitivityFraction(f64),
    #[error("preamble width {0} must be between 1 and 4 bytes")]
    PreambleWidth(u8),
    #[error("preamble {preamble:#x} does not fit in {width} byte(s)")]
    PreambleOverflow { preamble: u32, width: u8 },
    #[error("maximum payload size must be at least 1")]
    ZeroMaxPayload,
    #[error("at least one sync byte is needed ahead of each frame")]
    ZeroSyncBytes,
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("payload must contain at least one byte")]
    EmptyPayload,
    #[error("payload of {len} bytes exceeds the maximum of {max}")]
    PayloadTooLarge { len: usize, max: u8 },
    #[error("frame is still in {0:?} stage")]
    Incomplete(Stage),
}
