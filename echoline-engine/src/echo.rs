//! Feedback delay ("echo") processor: 1 input channel, 1 output channel.
//!
//! The recurrence per sample is
//!
//! ```text
//! y[n] = gain * y[n - d] + x[n]
//! ```
//!
//! a feedback comb filter over a fixed 131072-sample history. `gain` comes
//! from the `feedback` cell (percent, so 100 → 1.0) and `d` from the
//! `millisecond` cell, quantized once per block. Stability needs
//! `|gain| <= 1`; the declared range guarantees that, but raw writes past it
//! are accepted and will make the filter diverge — a documented policy, not
//! something `process` re-validates.

use echoline_core::delay::DelayLine;
use echoline_core::dsp::{quantize_delay, samples_per_ms};

use crate::graph::Processor;
use crate::params::{CellId, ParamError, ParamSpec, ParameterStore};

/// History capacity in samples (power of two, ~3 s at 44.1 kHz).
pub const ECHO_CAPACITY: usize = 131_072;

/// Wrap horizon for the delay control, half the capacity. Requests past it
/// alias back into range instead of clamping; keeping the horizon at half
/// the buffer means a wrapped offset can never collide with the write cursor.
pub const ECHO_HORIZON: usize = 65_536;

/// Feedback amount in percent. 0 (initial) is a single pass-through echo
/// tap; 100 sustains indefinitely.
pub const FEEDBACK: &str = "feedback";

/// Delay time in milliseconds.
pub const MILLISECOND: &str = "millisecond";

/// The feedback delay line effect.
pub struct Echo {
    line: DelayLine,
    samples_per_ms: f32,
    feedback: Option<CellId>,
    millisecond: Option<CellId>,
}

impl Echo {
    pub fn new() -> Self {
        Self {
            line: DelayLine::new(ECHO_CAPACITY),
            samples_per_ms: samples_per_ms(44_100),
            feedback: None,
            millisecond: None,
        }
    }
}

impl Default for Echo {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Echo {
    fn inputs(&self) -> usize {
        1
    }

    fn outputs(&self) -> usize {
        1
    }

    fn bind(&mut self, store: &mut ParameterStore) -> Result<(), ParamError> {
        self.feedback = Some(store.register(FEEDBACK, ParamSpec::slider(0.0, 0.0, 100.0, 0.1))?);
        self.millisecond =
            Some(store.register(MILLISECOND, ParamSpec::slider(0.0, 0.0, 1000.0, 0.1))?);
        Ok(())
    }

    fn reset(&mut self, sample_rate: u32) {
        self.samples_per_ms = samples_per_ms(sample_rate);
        self.line.clear();
    }

    fn process(&mut self, params: &ParameterStore, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let input = inputs[0];
        debug_assert_eq!(input.len(), outputs[0].len());

        // Slow-varying controls: read the cells once per block, not per sample.
        let gain = 0.01 * self.feedback.map_or(0.0, |id| params.get(id));
        let ms = self.millisecond.map_or(0.0, |id| params.get(id));
        let offset = quantize_delay(ms, self.samples_per_ms, ECHO_HORIZON);

        let line = &mut self.line;
        for (o, &x) in outputs[0].iter_mut().zip(input.iter()) {
            let y = gain * line.read_back(offset) + x;
            line.tick(y);
            *o = y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Engine;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn ready_engine(sample_rate: u32) -> Engine<Echo> {
        let mut engine = Engine::new(Echo::new());
        engine.init(sample_rate).unwrap();
        engine
    }

    fn run_block(engine: &mut Engine<Echo>, input: &[f32]) -> Vec<f32> {
        let mut output = vec![0.0f32; input.len()];
        engine.compute(&[input], &mut [&mut output]);
        output
    }

    fn impulse(len: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; len];
        v[0] = 1.0;
        v
    }

    #[test]
    fn zero_feedback_zero_input_is_silent_despite_history() {
        let mut engine = ready_engine(44_100);
        engine.set_value(FEEDBACK, 80.0);
        engine.set_value(MILLISECOND, 5.0);
        let _ = run_block(&mut engine, &impulse(1024)); // seed the history

        engine.set_value(FEEDBACK, 0.0);
        let out = run_block(&mut engine, &vec![0.0; 512]);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn zero_feedback_passes_input_through() {
        let mut engine = ready_engine(44_100);
        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).sin()).collect();
        let out = run_block(&mut engine, &input);
        assert_eq!(out, input);
    }

    #[test]
    fn ten_ms_at_44100_echoes_441_samples_later() {
        let mut engine = ready_engine(44_100);
        engine.set_value(FEEDBACK, 50.0);
        engine.set_value(MILLISECOND, 10.0);

        let out = run_block(&mut engine, &impulse(1500));
        assert_eq!(out[0], 1.0);
        assert!((out[441] - 0.5).abs() < 1e-6);
        assert!((out[882] - 0.25).abs() < 1e-6);
        assert!((out[1323] - 0.125).abs() < 1e-6);
        // Nothing between the echoes.
        assert_eq!(out[1], 0.0);
        assert_eq!(out[440], 0.0);
        assert_eq!(out[442], 0.0);
    }

    #[test]
    fn feedback_decays_geometrically() {
        let mut engine = ready_engine(48_000);
        engine.set_value(FEEDBACK, 50.0);
        engine.set_value(MILLISECOND, 2.0); // 96 samples at 48 kHz

        let out = run_block(&mut engine, &impulse(1000));
        let mut expected = 1.0f32;
        for k in 0..10 {
            let i = k * 96;
            assert!(
                (out[i] - expected).abs() < 1e-6,
                "echo {k} at {i}: {} vs {expected}",
                out[i]
            );
            expected *= 0.5;
        }
    }

    #[test]
    fn unity_feedback_sustains_exactly() {
        let mut engine = ready_engine(44_100);
        engine.set_value(FEEDBACK, 100.0);
        engine.set_value(MILLISECOND, 10.0); // 441 samples

        let input = vec![1.0f32; 2000];
        let out = run_block(&mut engine, &input);
        for i in 441..2000 {
            assert!(
                (out[i] - (out[i - 441] + input[i])).abs() < 1e-5,
                "at {i}: {} vs {}",
                out[i],
                out[i - 441] + input[i]
            );
        }
    }

    #[test]
    fn over_horizon_delay_wraps_instead_of_clamping() {
        let mut engine = ready_engine(44_100);
        engine.set_value(FEEDBACK, 50.0);
        // 2000 ms → 88200 samples, past the 65536 horizon: masks down to 22664.
        engine.set_value(MILLISECOND, 2_000.0);
        let wrapped = 1 + ((88_200 - 1) & (ECHO_HORIZON - 1));
        assert_eq!(wrapped, 22_664);

        let out = run_block(&mut engine, &impulse(wrapped + 10));
        assert!((out[wrapped] - 0.5).abs() < 1e-6);
        assert_eq!(out[wrapped - 1], 0.0);
    }

    #[test]
    fn echo_spans_block_boundaries() {
        let mut engine = ready_engine(44_100);
        engine.set_value(FEEDBACK, 50.0);
        engine.set_value(MILLISECOND, 10.0); // 441 samples

        // Impulse in the first block, echo lands in the second.
        let first = run_block(&mut engine, &impulse(256));
        assert_eq!(first[0], 1.0);
        let second = run_block(&mut engine, &vec![0.0; 512]);
        assert!((second[441 - 256] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn reinit_clears_history_and_controls() {
        let mut engine = ready_engine(44_100);
        engine.set_value(FEEDBACK, 100.0);
        engine.set_value(MILLISECOND, 1.0);
        let _ = run_block(&mut engine, &impulse(512));

        engine.init(44_100).unwrap();
        assert_eq!(engine.get_value(FEEDBACK), Some(0.0));
        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.03).cos()).collect();
        // Fresh history + zero feedback: output is exactly the input again.
        assert_eq!(run_block(&mut engine, &input), input);
    }

    #[test]
    fn random_input_matches_reference_recurrence() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut engine = ready_engine(44_100);
        engine.set_value(FEEDBACK, 73.0);
        engine.set_value(MILLISECOND, 3.7); // round(44.1 * 3.7) = 163 samples

        let input: Vec<f32> = (0..4096).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
        let out = run_block(&mut engine, &input);

        let gain = 0.73f32;
        let d = 163usize;
        let mut reference = vec![0.0f32; input.len()];
        for i in 0..input.len() {
            let delayed = if i >= d { reference[i - d] } else { 0.0 };
            reference[i] = gain * delayed + input[i];
        }
        for (i, (&got, &want)) in out.iter().zip(reference.iter()).enumerate() {
            assert!((got - want).abs() < 1e-4, "sample {i}: {got} vs {want}");
        }
    }

    #[test]
    fn empty_block_is_a_no_op() {
        let mut engine = ready_engine(44_100);
        let out = run_block(&mut engine, &[]);
        assert!(out.is_empty());
    }
}
