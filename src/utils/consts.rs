/// Log level (overridable through RUST_LOG)
pub const LOG_LEVEL: &str = "info";

// ============================================================================
// Line Parameters
// ============================================================================

/// Default transfer speed (bits per second)
pub const DEFAULT_TRANSFER_SPEED: u32 = 1000;

/// Tolerance band as a fraction of the half-period
pub const DEFAULT_SENSITIVITY: f64 = 0.6;

/// Half-periods above this use a blocking sleep, shorter ones busy-wait
pub const BLOCKING_SLEEP_THRESHOLD_NS: u64 = 500_000;

/// Busy-wait step is the half-period divided by this
pub const BUSY_WAIT_DIVISOR: u32 = 10_000;

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

// ============================================================================
// Frame Parameters
// ============================================================================

/// Synchronization register constant
pub const DEFAULT_PREAMBLE: u32 = 0xB77B_EFCF;

/// Preamble width on the wire (bytes)
pub const DEFAULT_PREAMBLE_WIDTH: u8 = 4;

/// Largest payload the 1-byte size field can carry
pub const MAX_PAYLOAD_SIZE: u8 = u8::MAX;

pub const SIZE_BITS: u16 = 8;
pub const CHECKSUM_BITS: u16 = 32;

/// Alternating pattern sent ahead of each frame: 0xAA = 10101010
pub const SYNC_PATTERN: u8 = 0xAA;

/// Number of sync pattern bytes before the preamble
pub const DEFAULT_SYNC_BYTES: usize = 2;

/// Idle half-periods after each frame
pub const DEFAULT_INTER_FRAME_GAP: u32 = 8;

// ============================================================================
// Receiver
// ============================================================================

/// Bound of the edge queue between the line and the decoder thread
pub const EDGE_QUEUE_CAPACITY: usize = 1000;
