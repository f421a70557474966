//! Fixed-capacity circular history buffer ("delay line").
//!
//! One write and any number of offset reads per logical sample tick. The
//! write cursor is a monotonically increasing logical index, reduced by a
//! power-of-two bitmask only when touching storage, so wraparound costs a
//! single AND per access.
//!
//! Numeric policy: single-precision all the way, no denormal or NaN
//! handling. An offset beyond the capacity silently aliases inside the
//! horizon; callers that care must keep requested offsets in `[1, capacity]`.

use alloc::boxed::Box;
use alloc::vec;

/// Circular f32 history buffer with power-of-two capacity.
///
/// The buffer is allocated and zero-filled once at construction; `tick` and
/// `read_back` never allocate, which keeps the audio path real-time safe.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buf: Box<[f32]>,
    mask: usize,
    cursor: usize,
}

impl DelayLine {
    /// Allocate a zeroed line holding at least `capacity` samples.
    ///
    /// The actual capacity is `capacity` rounded up to the next power of two
    /// (minimum 2) so indexing can use a mask instead of a modulo.
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(2).next_power_of_two();
        Self {
            buf: vec![0.0; cap].into_boxed_slice(),
            mask: cap - 1,
            cursor: 0,
        }
    }

    /// True capacity (power of two, >= the requested one).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Logical number of ticks performed since construction or [`clear`](Self::clear).
    #[inline]
    pub fn ticks(&self) -> usize {
        self.cursor
    }

    /// Zero the history and rewind the cursor.
    pub fn clear(&mut self) {
        self.buf.fill(0.0);
        self.cursor = 0;
    }

    /// Store `x` at the cursor and advance one tick.
    #[inline]
    pub fn tick(&mut self, x: f32) {
        self.buf[self.cursor & self.mask] = x;
        self.cursor = self.cursor.wrapping_add(1);
    }

    /// Sample written `offset` ticks before the *next* write.
    ///
    /// `read_back(1)` is the most recently ticked value; `read_back(capacity)`
    /// is the oldest retrievable one. Offsets outside `[1, capacity]` are
    /// masked and alias within the horizon rather than failing.
    #[inline]
    pub fn read_back(&self, offset: usize) -> f32 {
        self.buf[self.cursor.wrapping_sub(offset) & self.mask]
    }
}
