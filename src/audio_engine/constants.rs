//! Audio engine configuration constants and limits.

/// Minimum volume level (silence).
pub const VOLUME_MIN: f32 = 0.0;

/// Maximum volume level (100%).
pub const VOLUME_MAX: f32 = 1.0;

/// Capacity of the owner → audio thread command ring buffer.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Maximum number of decoded clips kept in memory by the output handle.
pub const DECODE_CACHE_CAPACITY: usize = 32;
