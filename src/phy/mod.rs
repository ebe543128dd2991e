// Physical and link layer: Manchester line code over a single signal line,
// with preamble-synchronized, CRC32-checked frames on top.

pub mod config;
pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod line_coding;
pub mod timing;

pub use config::{LinkConfig, Sensitivity};
pub use decoder::{DecoderStats, PhyDecoder};
pub use encoder::PhyEncoder;
pub use frame::{Frame, FrameFormat, Stage};
pub use line_coding::{Edge, EdgeEvent, ManchesterDecoder, ManchesterEncoder, ManchesterTiming};
pub use timing::{HalfPeriodWait, Pacer};
