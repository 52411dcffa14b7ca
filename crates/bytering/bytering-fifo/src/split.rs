//! Producer/consumer halves of a [`RingBuffer`] for use from two contexts.
//!
//! The typical layout is a UART receive interrupt (or a worker thread standing
//! in for one) owning the [`Producer`] and a main loop owning the [`Consumer`].
//!
//! # Thread Safety
//! - `Producer` and `Consumer` are `Send`; move each to its own context.
//! - Neither is `Clone`. One split yields exactly one producer and one
//!   consumer, so `write_pos` and `read_pos` each keep a single writer.

use crate::error::FifoError;
use crate::fifo::RingBuffer;

/// The filling side. Only ever advances the write position.
pub struct Producer<'r, 'a> {
    ring: &'r RingBuffer<'a>,
}

/// The draining side. Only ever advances the read position.
pub struct Consumer<'r, 'a> {
    ring: &'r RingBuffer<'a>,
}

impl<'a> RingBuffer<'a> {
    /// Splits the ring into its two halves.
    ///
    /// Both halves borrow the ring, so it can't be used directly (or split
    /// again) until they are dropped. Bytes already queued stay queued.
    ///
    /// # Example
    /// ```
    /// use bytering_fifo::RingBuffer;
    /// let mut storage = [0u8; 16];
    /// let mut rb = RingBuffer::new(&mut storage).unwrap();
    /// let (mut tx, mut rx) = rb.split();
    /// std::thread::scope(|s| {
    ///     s.spawn(move || tx.write(b"ping").unwrap());
    /// });
    /// let mut out = [0u8; 4];
    /// assert_eq!(rx.read(&mut out), Ok(4));
    /// assert_eq!(&out, b"ping");
    /// ```
    pub fn split(&mut self) -> (Producer<'_, 'a>, Consumer<'_, 'a>) {
        let ring: &RingBuffer<'a> = self;
        (Producer { ring }, Consumer { ring })
    }
}

impl Producer<'_, '_> {
    /// See [`RingBuffer::put`].
    #[inline]
    pub fn put(&mut self, byte: u8) -> Result<(), FifoError> {
        // SAFETY: this is the only producer handed out by `split`.
        unsafe { self.ring.push(byte) }
    }

    /// See [`RingBuffer::write`].
    #[inline]
    pub fn write(&mut self, src: &[u8]) -> Result<usize, FifoError> {
        // SAFETY: this is the only producer handed out by `split`.
        unsafe { self.ring.push_slice(src) }
    }

    /// Room the consumer has left. May grow (never shrink) behind our back.
    #[inline]
    pub fn available_to_write(&self) -> usize {
        self.ring.available_to_write()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl Consumer<'_, '_> {
    /// See [`RingBuffer::get`].
    #[inline]
    pub fn get(&mut self) -> Result<u8, FifoError> {
        // SAFETY: this is the only consumer handed out by `split`.
        unsafe { self.ring.pop() }
    }

    /// See [`RingBuffer::peek`].
    #[inline]
    pub fn peek(&self, index: usize) -> Result<u8, FifoError> {
        // SAFETY: only this consumer advances `read_pos`, and it can't while
        // borrowed here.
        unsafe { self.ring.peek_at(index) }
    }

    /// See [`RingBuffer::flush`]. Bytes the producer publishes after the
    /// write position is sampled survive the flush.
    #[inline]
    pub fn flush(&mut self) {
        self.ring.discard();
    }

    /// See [`RingBuffer::read`].
    #[inline]
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize, FifoError> {
        // SAFETY: this is the only consumer handed out by `split`.
        unsafe { self.ring.pop_slice(dst) }
    }

    /// Bytes queued right now. May grow (never shrink) behind our back.
    #[inline]
    pub fn available_to_read(&self) -> usize {
        self.ring.available_to_read()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}
