//! # bytering-fifo
//!
//! Fixed-capacity byte FIFO over a caller-supplied, power-of-two-sized array.
//!
//! Two free-running position counters and a bitmask turn the flat array into a
//! wrap-around queue. Every operation is non-blocking and returns a
//! [`FifoError`] instead of waiting.
//!
//! ```
//! use bytering_fifo::{FifoError, RingBuffer};
//!
//! let mut storage = [0u8; 4];
//! let mut rb = RingBuffer::new(&mut storage).unwrap();
//!
//! assert_eq!(rb.write(b"ABCDE"), Ok(4)); // partial write, not an error
//! assert_eq!(rb.put(b'E'), Err(FifoError::Full));
//! assert_eq!(rb.get(), Ok(b'A'));
//! ```

mod capacity;
mod error;
mod fifo;
mod split;

pub use capacity::{Capacity, MAX_CAPACITY};
pub use error::{FifoError, status};
pub use fifo::RingBuffer;
pub use split::{Consumer, Producer};
