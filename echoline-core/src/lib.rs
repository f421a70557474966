#![cfg_attr(not(feature = "std"), no_std)]
//! Echoline Core — no_std-ready DSP primitives for the echoline effect engine.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//!
//! Modules
//! - [`dsp`]   : math backend selection and delay-time quantization helpers
//! - [`delay`] : fixed-capacity circular history buffer (the delay line)
//!
//! Design
//! - One heap allocation per delay line, made at construction; everything on
//!   the per-sample path is branch-light index arithmetic
//! - Clear separation between math helpers and the history buffer itself
//! - Friendly to embedded / real-time targets (`alloc` only, no `std` needed)

extern crate alloc;

pub mod delay;
pub mod dsp;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::delay::DelayLine;
    pub use crate::dsp::{quantize_delay, samples_per_ms, SAMPLE_RATE_CEILING};
}
