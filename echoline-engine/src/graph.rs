//! Block-processing core: the `Processor` trait and the `Engine<P>` wrapper.
//!
//! This module defines the minimal [`Processor`] contract for a fixed-topology
//! effect and a lightweight [`Engine<P>`] that owns one processor plus the
//! [`ParameterStore`] its controls live in.
//!
//! Design goals
//! - No dynamic allocations and no locks in the audio thread
//! - Generic over the processor type, so topologies can be swapped without
//!   trait objects
//! - An explicit engine value threaded through every call; no process-wide
//!   singleton

use std::sync::Arc;

use crate::params::{ParamError, ParameterStore};

/// A fixed-topology block processor.
///
/// Channel counts are fixed per topology (the echo is 1-in/1-out, the noise
/// generator 0-in/1-out). `bind` is called once per engine init with a fresh
/// store; `process` must be allocation-free and may read control cells but
/// never mutates the store's structure.
pub trait Processor: Send {
    /// Number of input channels consumed per block.
    fn inputs(&self) -> usize;

    /// Number of output channels produced per block.
    fn outputs(&self) -> usize;

    /// Register this processor's control cells and remember their handles.
    fn bind(&mut self, store: &mut ParameterStore) -> Result<(), ParamError>;

    /// Drop all history and adopt a (possibly new) sample rate.
    fn reset(&mut self, sample_rate: u32);

    /// Process exactly one block. Every channel slice in `inputs` and
    /// `outputs` holds the same number of samples; the caller guarantees the
    /// channel counts match [`inputs`](Self::inputs)/[`outputs`](Self::outputs).
    fn process(&mut self, params: &ParameterStore, inputs: &[&[f32]], outputs: &mut [&mut [f32]]);
}

/// Engine wrapper owning one processor and its parameter registry.
///
/// Lifecycle: `Uninitialized → Ready` after [`init`](Self::init); `init` may
/// be called again at any time and performs a full restart (history zeroed,
/// every control cell back to its declared initial).
///
/// Threading: the engine itself lives on the audio side (it is `&mut` for
/// `compute`), while [`params`](Self::params) hands out an `Arc` of the
/// store for a control thread to write through concurrently.
pub struct Engine<P: Processor> {
    proc: P,
    params: Arc<ParameterStore>,
    sample_rate: u32,
    ready: bool,
}

impl<P: Processor> Engine<P> {
    /// Wrap a processor. The engine starts uninitialized: `compute` is a
    /// zero-filling no-op and no parameters exist until [`init`](Self::init).
    pub fn new(proc: P) -> Self {
        Self {
            proc,
            params: Arc::new(ParameterStore::new()),
            sample_rate: 0,
            ready: false,
        }
    }

    /// (Re)construct the engine state for `sample_rate`.
    ///
    /// Builds a fresh store, registers the processor's parameters into it and
    /// clears all processing history. Registration failures (duplicate
    /// labels) surface here, before any audio runs. Control-side holders of
    /// a previous [`params`](Self::params) handle must re-fetch it after a
    /// re-init; the old store keeps working but is no longer observed.
    pub fn init(&mut self, sample_rate: u32) -> Result<(), ParamError> {
        let mut store = ParameterStore::new();
        self.proc.bind(&mut store)?;
        self.sample_rate = sample_rate.max(1);
        self.proc.reset(self.sample_rate);
        self.params = Arc::new(store);
        self.ready = true;
        Ok(())
    }

    /// Shared handle to the live parameter registry, for the control thread.
    pub fn params(&self) -> Arc<ParameterStore> {
        Arc::clone(&self.params)
    }

    /// Sample rate adopted by the last `init`, 0 if never initialized.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Write a parameter by label. `false` if the label is unknown (or the
    /// engine was never initialized, in which case no labels exist).
    pub fn set_value(&self, label: &str, value: f32) -> bool {
        self.params.set_by_label(label, value)
    }

    /// Read a parameter by label.
    pub fn get_value(&self, label: &str) -> Option<f32> {
        self.params.get_by_label(label)
    }

    /// Process one block through the inner processor.
    ///
    /// Before `init` this zero-fills every output channel and returns, so a
    /// host driving an engine it forgot to initialize gets silence rather
    /// than stale memory or a panic.
    pub fn compute(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        if !self.ready {
            for ch in outputs.iter_mut() {
                ch.fill(0.0);
            }
            return;
        }
        debug_assert_eq!(inputs.len(), self.proc.inputs());
        debug_assert_eq!(outputs.len(), self.proc.outputs());
        self.proc.process(&self.params, inputs, outputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo::Echo;
    use crate::noise::Noise;

    #[test]
    fn uninitialized_compute_zero_fills() {
        let mut engine = Engine::new(Noise::new());
        let mut out = [0.7f32; 64];
        engine.compute(&[], &mut [&mut out]);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn uninitialized_engine_has_no_parameters() {
        let engine = Engine::new(Echo::new());
        assert_eq!(engine.get_value("feedback"), None);
        assert!(!engine.set_value("feedback", 1.0));
    }

    #[test]
    fn init_registers_processor_parameters() {
        let mut engine = Engine::new(Echo::new());
        engine.init(48_000).unwrap();
        assert_eq!(engine.sample_rate(), 48_000);
        assert_eq!(engine.get_value("feedback"), Some(0.0));
        assert_eq!(engine.get_value("millisecond"), Some(0.0));
        assert!(engine.set_value("feedback", 50.0));
        assert_eq!(engine.get_value("feedback"), Some(50.0));
    }

    #[test]
    fn reinit_restores_declared_initials() {
        let mut engine = Engine::new(Echo::new());
        engine.init(44_100).unwrap();
        engine.set_value("feedback", 75.0);
        engine.init(44_100).unwrap();
        assert_eq!(engine.get_value("feedback"), Some(0.0));
    }

    #[test]
    fn zero_sample_rate_is_clamped() {
        let mut engine = Engine::new(Noise::new());
        engine.init(0).unwrap();
        assert_eq!(engine.sample_rate(), 1);
    }
}
