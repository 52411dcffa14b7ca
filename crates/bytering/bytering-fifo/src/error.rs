/// C-style status codes for callers that bridge the ring to a numeric error
/// table (e.g. a driver returning `u32` statuses across an FFI boundary).
pub mod status {
    pub const SUCCESS: u32 = 0;
    pub const NO_MEM: u32 = 4;
    pub const NOT_FOUND: u32 = 5;
    pub const INVALID_LENGTH: u32 = 9;
    pub const NULL: u32 = 14;
}

/// Failures reported by the ring buffer.
///
/// None of these leave the ring in a different state than before the call.
/// Transferring fewer bytes than requested is not an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FifoError {
    #[error("backing buffer is empty")]
    InvalidArgument,

    #[error("capacity {capacity} is not a power of two within the supported range")]
    InvalidLength { capacity: usize },

    #[error("ring buffer is full")]
    Full,

    #[error("ring buffer is empty")]
    Empty,

    #[error("no byte at offset {index} (only {len} queued)")]
    NotFound { index: usize, len: usize },
}

impl FifoError {
    /// Numeric status for this error. Never [`status::SUCCESS`].
    pub fn code(&self) -> u32 {
        match self {
            FifoError::InvalidArgument => status::NULL,
            FifoError::InvalidLength { .. } => status::INVALID_LENGTH,
            FifoError::Full => status::NO_MEM,
            FifoError::Empty | FifoError::NotFound { .. } => status::NOT_FOUND,
        }
    }
}
