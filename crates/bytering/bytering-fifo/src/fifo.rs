//! Power-of-two byte FIFO over a caller-supplied array.
//!
//! # Design
//! - **Positions**: `read_pos` and `write_pos` are free-running `u32` counters.
//!   The physical slot is `pos & mask`; occupancy is `write_pos - read_pos`
//!   (wrapping). There is no separate count field.
//! - **Single writer per counter**: only the producer stores `write_pos`, only
//!   the consumer stores `read_pos`. Each side publishes its counter with
//!   `Release` after touching the slots and reads the other side's counter with
//!   `Acquire` before touching them.
//!
//! # Thread Safety
//! `RingBuffer` is `Send + Sync`, but every method reachable through `&self`
//! only loads counters or reads occupied slots. Mutation goes through
//! `&mut self` or through the [`Producer`]/[`Consumer`] pair from
//! [`RingBuffer::split`], which hands out exactly one of each.
//!
//! [`Producer`]: crate::Producer
//! [`Consumer`]: crate::Consumer

use crate::capacity::{Capacity, occupancy};
use crate::error::FifoError;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

/// Fixed-capacity byte FIFO borrowing its storage.
pub struct RingBuffer<'a> {
    /// Start of the caller's array. Only the first `capacity` bytes are used.
    base: *mut u8,
    capacity: Capacity,
    /// Next position to consume. Stored only by the consumer.
    read_pos: AtomicU32,
    /// Next position to fill. Stored only by the producer.
    write_pos: AtomicU32,
    /// Ties the ring to the exclusive borrow of the backing array.
    _buf: PhantomData<&'a mut [u8]>,
}

// SAFETY: the ring is a `&mut [u8]` plus two atomics. Slots are only written by
// the single producer (outside the occupied region) and only read inside the
// occupied region, with counter hand-off through Release/Acquire.
unsafe impl Send for RingBuffer<'_> {}
unsafe impl Sync for RingBuffer<'_> {}

impl<'a> RingBuffer<'a> {
    /// Builds a ring over the whole of `buf`; capacity is `buf.len()`.
    ///
    /// # Errors
    /// - `InvalidArgument` if `buf` is empty.
    /// - `InvalidLength` if `buf.len()` is not a power of 2.
    pub fn new(buf: &'a mut [u8]) -> Result<Self, FifoError> {
        let capacity = buf.len();
        Self::with_capacity(buf, capacity)
    }

    /// Builds a ring over the first `capacity` bytes of `buf`.
    ///
    /// # Errors
    /// - `InvalidArgument` if `buf` is empty.
    /// - `InvalidLength` if `capacity` is not a power of 2, exceeds
    ///   [`MAX_CAPACITY`](crate::MAX_CAPACITY), or exceeds `buf.len()`.
    ///
    /// # Example
    /// ```
    /// use bytering_fifo::RingBuffer;
    /// let mut storage = [0u8; 100];
    /// let mut rb = RingBuffer::with_capacity(&mut storage, 64).unwrap();
    /// rb.put(7).unwrap();
    /// assert_eq!(rb.get(), Ok(7));
    /// ```
    pub fn with_capacity(buf: &'a mut [u8], capacity: usize) -> Result<Self, FifoError> {
        if buf.is_empty() {
            return Err(FifoError::InvalidArgument);
        }
        let capacity = Capacity::new(capacity)?;
        if capacity.get() > buf.len() {
            return Err(FifoError::InvalidLength {
                capacity: capacity.get(),
            });
        }

        tracing::debug!(
            capacity = capacity.get(),
            backing_len = buf.len(),
            "ring buffer initialized"
        );

        Ok(Self {
            base: buf.as_mut_ptr(),
            capacity,
            read_pos: AtomicU32::new(0),
            write_pos: AtomicU32::new(0),
            _buf: PhantomData,
        })
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Number of unread bytes, in `0..=capacity`.
    #[inline]
    pub fn len(&self) -> usize {
        // Read position first: it can only trail the write position loaded after it.
        let read = self.read_pos.load(Ordering::Acquire);
        let write = self.write_pos.load(Ordering::Acquire);
        occupancy(write, read) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Bytes a [`read`](Self::read) could return right now.
    #[inline]
    pub fn available_to_read(&self) -> usize {
        self.len()
    }

    /// Bytes a [`write`](Self::write) could accept right now.
    #[inline]
    pub fn available_to_write(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Appends one byte.
    ///
    /// # Errors
    /// `Full` if `capacity` bytes are already queued; nothing is written.
    pub fn put(&mut self, byte: u8) -> Result<(), FifoError> {
        // SAFETY: `&mut self` makes this the only producer.
        unsafe { self.push(byte) }
    }

    /// Removes and returns the oldest byte.
    ///
    /// # Errors
    /// `Empty` if nothing is queued.
    pub fn get(&mut self) -> Result<u8, FifoError> {
        // SAFETY: `&mut self` makes this the only consumer.
        unsafe { self.pop() }
    }

    /// Returns the byte `index` positions after the oldest one without
    /// consuming anything. `peek(0)` is what `get` would return.
    ///
    /// # Errors
    /// `NotFound` if `index >= len()`; this covers the empty ring too.
    pub fn peek(&self, index: usize) -> Result<u8, FifoError> {
        // SAFETY: with `&self` alive nobody can hold `&mut self` or a split half,
        // so the occupied region is stable.
        unsafe { self.peek_at(index) }
    }

    /// Discards every unread byte. The write position is left untouched.
    pub fn flush(&mut self) {
        self.discard();
    }

    /// Moves up to `dst.len()` bytes out of the ring, oldest first.
    ///
    /// Returns how many bytes were copied; fewer than requested is a normal
    /// outcome and the rest stays queued.
    ///
    /// # Errors
    /// `Empty` if nothing is queued.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize, FifoError> {
        // SAFETY: `&mut self` makes this the only consumer.
        unsafe { self.pop_slice(dst) }
    }

    /// Copies up to `src.len()` bytes into the ring, in order.
    ///
    /// Returns how many bytes were accepted; the caller retries the remainder.
    ///
    /// # Errors
    /// `Full` if there is no room at all.
    pub fn write(&mut self, src: &[u8]) -> Result<usize, FifoError> {
        // SAFETY: `&mut self` makes this the only producer.
        unsafe { self.push_slice(src) }
    }

    // ─── Producer side ──────────────────────────────────────────────────────

    /// Producer's snapshot: own position and current occupancy.
    #[inline(always)]
    fn producer_view(&self) -> (u32, u32) {
        let write = self.write_pos.load(Ordering::Relaxed);
        let read = self.read_pos.load(Ordering::Acquire);
        (write, occupancy(write, read))
    }

    /// # Safety
    /// The caller must be the only producer for the duration of the call.
    #[inline]
    pub(crate) unsafe fn push(&self, byte: u8) -> Result<(), FifoError> {
        let (write, used) = self.producer_view();
        if used > self.capacity.mask() {
            return Err(FifoError::Full);
        }
        // SAFETY: the slot lies outside the occupied region, so the consumer
        // does not read it until the Release below publishes it.
        unsafe { self.slot(write).write(byte) };
        self.write_pos.store(write.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// # Safety
    /// The caller must be the only producer for the duration of the call.
    pub(crate) unsafe fn push_slice(&self, src: &[u8]) -> Result<usize, FifoError> {
        let (write, used) = self.producer_view();
        let room = self.capacity() - used as usize;
        if room == 0 {
            return Err(FifoError::Full);
        }
        let n = src.len().min(room);
        // SAFETY: the `n` slots after `write` are free.
        unsafe { self.copy_in(write, &src[..n]) };
        self.write_pos
            .store(write.wrapping_add(n as u32), Ordering::Release);
        Ok(n)
    }

    // ─── Consumer side ──────────────────────────────────────────────────────

    /// Consumer's snapshot: own position and current occupancy.
    #[inline(always)]
    fn consumer_view(&self) -> (u32, u32) {
        let read = self.read_pos.load(Ordering::Relaxed);
        let write = self.write_pos.load(Ordering::Acquire);
        (read, occupancy(write, read))
    }

    /// # Safety
    /// The caller must be the only consumer for the duration of the call.
    #[inline]
    pub(crate) unsafe fn pop(&self) -> Result<u8, FifoError> {
        let (read, used) = self.consumer_view();
        if used == 0 {
            return Err(FifoError::Empty);
        }
        // SAFETY: the slot is occupied; the producer won't touch it until the
        // Release below hands it back.
        let byte = unsafe { self.slot(read).read() };
        self.read_pos.store(read.wrapping_add(1), Ordering::Release);
        Ok(byte)
    }

    /// # Safety
    /// No other consumer may advance `read_pos` during the call.
    #[inline]
    pub(crate) unsafe fn peek_at(&self, index: usize) -> Result<u8, FifoError> {
        let (read, used) = self.consumer_view();
        let len = used as usize;
        if index >= len {
            return Err(FifoError::NotFound { index, len });
        }
        // `index < len <= 2^31`, so the cast is lossless.
        let pos = read.wrapping_add(index as u32);
        // SAFETY: `pos` is inside the occupied region.
        Ok(unsafe { self.slot(pos).read() })
    }

    pub(crate) fn discard(&self) {
        let write = self.write_pos.load(Ordering::Acquire);
        self.read_pos.store(write, Ordering::Release);
    }

    /// # Safety
    /// The caller must be the only consumer for the duration of the call.
    pub(crate) unsafe fn pop_slice(&self, dst: &mut [u8]) -> Result<usize, FifoError> {
        let (read, used) = self.consumer_view();
        if used == 0 {
            return Err(FifoError::Empty);
        }
        let n = dst.len().min(used as usize);
        // SAFETY: the `n` slots after `read` are occupied.
        unsafe { self.copy_out(read, &mut dst[..n]) };
        self.read_pos
            .store(read.wrapping_add(n as u32), Ordering::Release);
        Ok(n)
    }

    // ─── Slot access ────────────────────────────────────────────────────────

    #[inline(always)]
    fn slot(&self, pos: u32) -> *mut u8 {
        // SAFETY: the index is masked into `0..capacity` and `capacity <= buf.len()`.
        unsafe { self.base.add(self.capacity.index(pos)) }
    }

    /// Copies `src` into the slots starting at `pos`, splitting at the end of
    /// the array.
    ///
    /// # Safety
    /// `src.len() <= capacity` and those slots must be free.
    unsafe fn copy_in(&self, pos: u32, src: &[u8]) {
        let start = self.capacity.index(pos);
        let first = src.len().min(self.capacity() - start);
        // SAFETY: `start + first <= capacity` and the wrapped tail is
        // `src.len() - first <= start` bytes from the beginning. `src` cannot
        // alias the backing array, which the ring borrows mutably.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), self.base.add(start), first);
            ptr::copy_nonoverlapping(src.as_ptr().add(first), self.base, src.len() - first);
        }
    }

    /// Copies the slots starting at `pos` into `dst`, splitting at the end of
    /// the array.
    ///
    /// # Safety
    /// `dst.len() <= capacity` and those slots must be occupied.
    unsafe fn copy_out(&self, pos: u32, dst: &mut [u8]) {
        let start = self.capacity.index(pos);
        let first = dst.len().min(self.capacity() - start);
        // SAFETY: same bounds as `copy_in`.
        unsafe {
            ptr::copy_nonoverlapping(self.base.add(start), dst.as_mut_ptr(), first);
            ptr::copy_nonoverlapping(self.base, dst.as_mut_ptr().add(first), dst.len() - first);
        }
    }
}

impl std::fmt::Debug for RingBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("read_pos", &self.read_pos)
            .field("write_pos", &self.write_pos)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Moves both counters to `pos` so tests can start right before a wrap.
    fn seek(rb: &mut RingBuffer<'_>, pos: u32) {
        *rb.read_pos.get_mut() = pos;
        *rb.write_pos.get_mut() = pos;
    }

    #[test]
    fn init_validates_capacity() {
        let mut storage = [0u8; 256];
        for cap in [0usize, 3, 5, 100] {
            assert_eq!(
                RingBuffer::with_capacity(&mut storage, cap).unwrap_err(),
                FifoError::InvalidLength { capacity: cap }
            );
        }
        for cap in [1usize, 2, 4, 256] {
            let rb = RingBuffer::with_capacity(&mut storage, cap).unwrap();
            assert_eq!(rb.capacity(), cap);
            assert!(rb.is_empty());
        }
    }

    #[test]
    fn init_rejects_empty_buffer() {
        let mut storage: [u8; 0] = [];
        assert_eq!(
            RingBuffer::new(&mut storage).unwrap_err(),
            FifoError::InvalidArgument
        );
        assert_eq!(
            RingBuffer::with_capacity(&mut storage, 4).unwrap_err(),
            FifoError::InvalidArgument
        );
    }

    #[test]
    fn init_rejects_capacity_larger_than_buffer() {
        let mut storage = [0u8; 8];
        assert_eq!(
            RingBuffer::with_capacity(&mut storage, 16).unwrap_err(),
            FifoError::InvalidLength { capacity: 16 }
        );
    }

    #[test]
    fn new_uses_whole_slice() {
        let mut storage = [0u8; 32];
        assert_eq!(RingBuffer::new(&mut storage).unwrap().capacity(), 32);

        let mut odd = [0u8; 33];
        assert_eq!(
            RingBuffer::new(&mut odd).unwrap_err(),
            FifoError::InvalidLength { capacity: 33 }
        );
    }

    #[test]
    fn capacity_four_scenario() {
        let mut storage = [0u8; 4];
        let mut rb = RingBuffer::new(&mut storage).unwrap();

        for b in *b"ABCD" {
            rb.put(b).unwrap();
        }
        assert!(rb.is_full());
        assert_eq!(rb.put(b'E'), Err(FifoError::Full));

        assert_eq!(rb.get(), Ok(b'A'));
        rb.put(b'E').unwrap();

        let got: Vec<u8> = (0..4).map(|_| rb.get().unwrap()).collect();
        assert_eq!(got, b"BCDE");
        assert_eq!(rb.get(), Err(FifoError::Empty));
    }

    #[test]
    fn full_rejects_without_overwriting() {
        let mut storage = [0u8; 8];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        for i in 0..8 {
            rb.put(i).unwrap();
        }
        assert_eq!(rb.put(99), Err(FifoError::Full));
        assert_eq!(rb.len(), 8);
        assert_eq!(rb.peek(0), Ok(0));
        assert_eq!(rb.peek(7), Ok(7));
    }

    #[test]
    fn get_on_empty_is_empty() {
        let mut storage = [0u8; 2];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        assert_eq!(rb.get(), Err(FifoError::Empty));
        rb.put(1).unwrap();
        assert_eq!(rb.get(), Ok(1));
        assert_eq!(rb.get(), Err(FifoError::Empty));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut storage = [0u8; 8];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        rb.write(&[10, 20, 30]).unwrap();

        for _ in 0..5 {
            assert_eq!(rb.peek(0), Ok(10));
            assert_eq!(rb.peek(2), Ok(30));
        }
        assert_eq!(rb.peek(3), Err(FifoError::NotFound { index: 3, len: 3 }));
        assert_eq!(rb.get(), Ok(10));
        assert_eq!(rb.peek(0), Ok(20));
        assert_eq!(rb.len(), 2);
    }

    #[test]
    fn peek_on_empty_is_not_found() {
        let mut storage = [0u8; 4];
        let rb = RingBuffer::new(&mut storage).unwrap();
        assert_eq!(rb.peek(0), Err(FifoError::NotFound { index: 0, len: 0 }));
    }

    #[test]
    fn flush_discards_and_keeps_write_position() {
        let mut storage = [0u8; 4];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        rb.write(b"xyz").unwrap();
        rb.flush();
        assert_eq!(rb.len(), 0);
        assert_eq!(rb.get(), Err(FifoError::Empty));
        assert_eq!(*rb.write_pos.get_mut(), 3);
        assert_eq!(*rb.read_pos.get_mut(), 3);

        rb.put(b'q').unwrap();
        assert_eq!(rb.get(), Ok(b'q'));
        assert_eq!(rb.available_to_write(), 4);
    }

    #[test]
    fn flush_on_empty_is_noop() {
        let mut storage = [0u8; 4];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        rb.flush();
        assert!(rb.is_empty());
    }

    #[test]
    fn partial_write_reports_room() {
        let mut storage = [0u8; 8];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        assert_eq!(rb.write(&[1, 2, 3, 4, 5]), Ok(5));
        assert_eq!(rb.available_to_write(), 3);

        let src: Vec<u8> = (100..110).collect();
        assert_eq!(rb.write(&src), Ok(3));
        assert!(rb.is_full());
        assert_eq!(rb.write(&src), Err(FifoError::Full));
        assert_eq!(rb.available_to_write(), 0);

        let mut out = [0u8; 8];
        assert_eq!(rb.read(&mut out), Ok(8));
        assert_eq!(out, [1, 2, 3, 4, 5, 100, 101, 102]);
    }

    #[test]
    fn partial_read_leaves_remainder() {
        let mut storage = [0u8; 8];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        rb.write(b"hello").unwrap();

        let mut out = [0u8; 2];
        assert_eq!(rb.read(&mut out), Ok(2));
        assert_eq!(&out, b"he");
        assert_eq!(rb.available_to_read(), 3);

        let mut big = [0u8; 16];
        assert_eq!(rb.read(&mut big), Ok(3));
        assert_eq!(&big[..3], b"llo");
        assert_eq!(rb.read(&mut big), Err(FifoError::Empty));
    }

    #[test]
    fn zero_length_transfers_succeed_when_not_blocked() {
        let mut storage = [0u8; 4];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        assert_eq!(rb.write(&[]), Ok(0));
        assert_eq!(rb.read(&mut []), Err(FifoError::Empty));
        rb.put(1).unwrap();
        assert_eq!(rb.read(&mut []), Ok(0));
        assert_eq!(rb.len(), 1);
    }

    #[test]
    fn size_queries_track_occupancy() {
        let mut storage = [0u8; 16];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        assert_eq!(rb.available_to_read(), 0);
        assert_eq!(rb.available_to_write(), 16);

        rb.write(&[0; 10]).unwrap();
        rb.get().unwrap();
        assert_eq!(rb.available_to_read(), 9);
        assert_eq!(rb.available_to_write(), 7);
        assert_eq!(rb.available_to_read(), rb.len());
    }

    #[test]
    fn bulk_transfer_splits_across_array_end() {
        let mut storage = [0u8; 8];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        rb.write(&[0; 6]).unwrap();
        let mut sink = [0u8; 6];
        rb.read(&mut sink).unwrap();

        // Positions are at 6, so this write lands in slots 6, 7, 0, 1, 2.
        assert_eq!(rb.write(b"abcde"), Ok(5));
        assert_eq!(rb.peek(2), Ok(b'c'));
        let mut out = [0u8; 5];
        assert_eq!(rb.read(&mut out), Ok(5));
        assert_eq!(&out, b"abcde");
    }

    #[test]
    fn capacity_one_alternates() {
        let mut storage = [0u8; 1];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        for b in 0..10u8 {
            rb.put(b).unwrap();
            assert_eq!(rb.put(b), Err(FifoError::Full));
            assert_eq!(rb.get(), Ok(b));
        }
    }

    #[test]
    fn counters_wrap_past_u32_max() {
        let mut storage = [0u8; 4];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        seek(&mut rb, u32::MAX - 2);

        for b in 1..=4u8 {
            rb.put(b).unwrap();
        }
        assert_eq!(rb.len(), 4);
        assert_eq!(rb.put(5), Err(FifoError::Full));
        assert!(*rb.write_pos.get_mut() < *rb.read_pos.get_mut());

        assert_eq!(rb.peek(3), Ok(4));
        for b in 1..=4u8 {
            assert_eq!(rb.get(), Ok(b));
        }
        assert!(rb.is_empty());
    }

    #[test]
    fn bulk_transfer_across_counter_wrap() {
        let mut storage = [0u8; 8];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        seek(&mut rb, u32::MAX - 4);

        assert_eq!(rb.write(b"0123456789"), Ok(8));
        assert_eq!(rb.available_to_read(), 8);
        let mut out = [0u8; 8];
        assert_eq!(rb.read(&mut out), Ok(8));
        assert_eq!(&out, b"01234567");
        assert_eq!(*rb.read_pos.get_mut(), 3);
    }

    mod wraparound {
        use super::seek;
        use crate::error::FifoError;
        use crate::fifo::RingBuffer;
        use proptest::prelude::*;

        proptest! {
            // Starting anywhere in the counter range stands in for having
            // already streamed billions of bytes through the ring.
            #[test]
            fn occupancy_is_position_independent(
                start in any::<u32>(),
                shift in 0u32..5,
                steps in prop::collection::vec((0usize..20, 0usize..20), 1..50),
            ) {
                let capacity = 1usize << shift;
                let mut storage = vec![0u8; capacity];
                let mut rb = RingBuffer::new(&mut storage).unwrap();
                seek(&mut rb, start);

                let mut next_in: u8 = 0;
                let mut next_out: u8 = 0;
                let mut queued = 0usize;

                for (puts, gets) in steps {
                    for _ in 0..puts {
                        match rb.put(next_in) {
                            Ok(()) => {
                                next_in = next_in.wrapping_add(1);
                                queued += 1;
                            }
                            Err(e) => {
                                prop_assert_eq!(e, FifoError::Full);
                                prop_assert_eq!(queued, capacity);
                            }
                        }
                    }
                    for _ in 0..gets {
                        match rb.get() {
                            Ok(b) => {
                                prop_assert_eq!(b, next_out);
                                next_out = next_out.wrapping_add(1);
                                queued -= 1;
                            }
                            Err(e) => {
                                prop_assert_eq!(e, FifoError::Empty);
                                prop_assert_eq!(queued, 0);
                            }
                        }
                    }
                    prop_assert_eq!(rb.len(), queued);
                    let (read, write) = (*rb.read_pos.get_mut(), *rb.write_pos.get_mut());
                    prop_assert_eq!(write.wrapping_sub(read) as usize, queued);
                }
            }
        }
    }

    #[test]
    fn debug_shows_positions() {
        let mut storage = [0u8; 4];
        let mut rb = RingBuffer::new(&mut storage).unwrap();
        rb.put(1).unwrap();
        let s = format!("{rb:?}");
        assert!(s.contains("capacity: 4"));
        assert!(s.contains("write_pos: 1"));
    }
}
