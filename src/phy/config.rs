use std::path::Path;

use serde::{Deserialize, Serialize};

use super::frame::FrameFormat;
use super::line_coding::ManchesterTiming;
use crate::error::ConfigError;
use crate::utils::consts::*;

/// Tolerance band, relative to the half-period or absolute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Fraction(f64),
    Nanos(u64),
}

impl Default for Sensitivity {
    fn default() -> Self {
        Sensitivity::Fraction(DEFAULT_SENSITIVITY)
    }
}

/// Link configuration shared by sender and receiver.
/// Both ends must agree on everything except `sync_bytes` and `inter_frame_gap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Bits per second
    pub transfer_speed: u32,
    pub sensitivity: Sensitivity,
    pub preamble: u32,
    /// Preamble width in bytes (1-4)
    pub preamble_width: u8,
    pub max_payload: u8,
    /// 0xAA bytes sent ahead of each frame (at least 1). The receiver drops
    /// the first edge after an idle gap, so the preamble itself cannot carry
    /// the lock.
    pub sync_bytes: usize,
    /// Idle half-periods after each frame
    pub inter_frame_gap: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            transfer_speed: DEFAULT_TRANSFER_SPEED,
            sensitivity: Sensitivity::default(),
            preamble: DEFAULT_PREAMBLE,
            preamble_width: DEFAULT_PREAMBLE_WIDTH,
            max_payload: MAX_PAYLOAD_SIZE,
            sync_bytes: DEFAULT_SYNC_BYTES,
            inter_frame_gap: DEFAULT_INTER_FRAME_GAP,
        }
    }
}

impl LinkConfig {
    pub fn with_speed(transfer_speed: u32) -> Self {
        Self {
            transfer_speed,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_json(&json)
    }

    /// Check every derived value, so misconfiguration surfaces before any
    /// line activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing()?;
        self.frame_format()?;
        if self.sync_bytes == 0 {
            return Err(ConfigError::ZeroSyncBytes);
        }
        Ok(())
    }

    pub fn timing(&self) -> Result<ManchesterTiming, ConfigError> {
        match self.sensitivity {
            Sensitivity::Fraction(fraction) => {
                ManchesterTiming::with_sensitivity_fraction(
                    self.transfer_speed,
                    fraction,
                )
            }
            Sensitivity::Nanos(ns) => {
                ManchesterTiming::with_sensitivity_nanos(self.transfer_speed, ns)
            }
        }
    }

    pub fn frame_format(&self) -> Result<FrameFormat, ConfigError> {
        FrameFormat::new(self.preamble, self.preamble_width, self.max_payload)
    }
}
