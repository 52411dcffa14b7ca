//! Capacity validation and position-to-slot arithmetic.
//!
//! The ring never stores a count. It keeps two free-running `u32` positions and
//! maps them into the backing array with a bitmask, which only works when the
//! capacity is a power of two.

use crate::error::FifoError;

/// Largest capacity a ring can have.
///
/// Positions are `u32` and occupancy is their wrapping difference, so the
/// occupancy must stay representable: `capacity <= 2^31`.
pub const MAX_CAPACITY: usize = 1 << 31;

/// A validated ring capacity.
///
/// Always a power of 2 in `1..=MAX_CAPACITY`, enabling index calculation via
/// bitmasking instead of modulo.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Capacity(u32);

impl Capacity {
    /// Validates `capacity`.
    ///
    /// # Errors
    /// `FifoError::InvalidLength` if `capacity` is zero, not a power of 2, or
    /// larger than [`MAX_CAPACITY`].
    ///
    /// # Example
    /// ```
    /// use bytering_fifo::Capacity;
    /// assert!(Capacity::new(1024).is_ok());
    /// assert!(Capacity::new(1000).is_err());
    /// ```
    pub fn new(capacity: usize) -> Result<Self, FifoError> {
        if !capacity.is_power_of_two() || capacity > MAX_CAPACITY {
            return Err(FifoError::InvalidLength { capacity });
        }
        Ok(Self(capacity as u32))
    }

    /// Number of slots.
    #[inline(always)]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Returns the bitmask for index calculation.
    ///
    /// The mask is `capacity - 1`, which has all lower bits set to 1.
    ///
    /// # Example
    /// ```
    /// use bytering_fifo::Capacity;
    /// let cap = Capacity::new(8).unwrap();
    /// assert_eq!(cap.mask(), 7); // 0b111
    /// ```
    #[inline(always)]
    pub fn mask(self) -> u32 {
        self.0 - 1
    }

    /// Converts a logical position to an array index.
    ///
    /// With `capacity = 8` (mask = `0b111`):
    /// ```text
    /// pos =  5 → 5 & 7 = 5
    /// pos =  8 → 8 & 7 = 0  (wraps around)
    /// pos = 15 → 15 & 7 = 7
    /// ```
    ///
    /// Positions may wrap at `u32::MAX`; since the capacity divides `2^32`
    /// the mapping stays continuous across that wrap.
    #[inline(always)]
    pub fn index(self, pos: u32) -> usize {
        (pos & self.mask()) as usize
    }
}

/// Number of unread bytes between two positions.
///
/// Wrapping subtraction in the same width as the counters, so a writer that
/// has wrapped past `u32::MAX` while the reader has not still yields the
/// right distance.
#[inline(always)]
pub fn occupancy(write_pos: u32, read_pos: u32) -> u32 {
    write_pos.wrapping_sub(read_pos)
}
