//! Math backend selection and delay-time quantization.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Clean, side-effect free helpers that are easy to test
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Argument and return domains are documented per function.

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] fn m_round(x: f32) -> f32 { x.round() }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] fn m_round(x: f32) -> f32 { libm::roundf(x) }
    // std backend
    } else {
        #[inline] fn m_round(x: f32) -> f32 { x.round() }
    }
}

// --------------------------------- Constants -------------------------------------

/// Highest sample rate the delay-time constant will honor. Rates above this
/// are treated as 192 kHz when converting milliseconds to samples.
pub const SAMPLE_RATE_CEILING: u32 = 192_000;

// --------------------------------- Delay time ------------------------------------

/// Samples per millisecond for a given sample rate, as `f32`.
///
/// The rate is clamped into `[1, SAMPLE_RATE_CEILING]` first, so a zero or
/// absurd host-reported rate still yields a usable constant.
#[inline]
pub fn samples_per_ms(sample_rate: u32) -> f32 {
    0.001 * sample_rate.clamp(1, SAMPLE_RATE_CEILING) as f32
}

/// Quantize a requested delay time (milliseconds) to a whole-sample offset
/// in `[1, horizon]`.
///
/// `horizon` must be a power of two. The rounded sample count is wrapped
/// into range with a bitmask rather than clamped: a request longer than the
/// horizon aliases back into it, and a request of zero comes out as the full
/// horizon. Non-finite `ms` degenerates to an in-range offset the same way
/// (garbage in, aliasing out — never a panic).
#[inline]
pub fn quantize_delay(ms: f32, samples_per_ms: f32, horizon: usize) -> usize {
    debug_assert!(horizon.is_power_of_two());
    let requested = m_round(samples_per_ms * ms) as i64;
    // Two's-complement AND lands in [0, horizon-1] even for requests <= 0.
    // Wrapping subtraction keeps the saturated i64::MIN case panic-free; the
    // mask bounds the result regardless.
    1 + (requested.wrapping_sub(1) & (horizon as i64 - 1)) as usize
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_per_ms_typical_rates() {
        assert!((samples_per_ms(44_100) - 44.1).abs() < 1e-4);
        assert!((samples_per_ms(48_000) - 48.0).abs() < 1e-4);
    }

    #[test]
    fn samples_per_ms_clamps_rate() {
        assert!((samples_per_ms(0) - 0.001).abs() < 1e-7);
        let capped = samples_per_ms(384_000);
        assert!((capped - 192.0).abs() < 1e-4);
    }

    #[test]
    fn ten_ms_at_44100_is_441_samples() {
        let spms = samples_per_ms(44_100);
        assert_eq!(quantize_delay(10.0, spms, 65_536), 441);
    }

    #[test]
    fn zero_ms_wraps_to_full_horizon() {
        let spms = samples_per_ms(44_100);
        assert_eq!(quantize_delay(0.0, spms, 65_536), 65_536);
    }

    #[test]
    fn over_horizon_request_aliases() {
        let spms = samples_per_ms(44_100);
        // 2000 ms at 44.1 kHz is 88200 samples; past the horizon it wraps,
        // it does not saturate.
        let off = quantize_delay(2_000.0, spms, 65_536);
        assert_eq!(off, 1 + ((88_200 - 1) & 65_535));
        assert!(off >= 1 && off <= 65_536);
    }

    #[test]
    fn garbage_ms_stays_in_range() {
        let spms = samples_per_ms(44_100);
        // NEG_INFINITY saturates the cast to i64::MIN; must still wrap, not trap.
        for ms in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, -123.4, f32::MIN] {
            let off = quantize_delay(ms, spms, 65_536);
            assert!(off >= 1 && off <= 65_536, "ms={ms} off={off}");
        }
    }
}
