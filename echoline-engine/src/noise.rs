//! Pseudo-random noise generator: 0 input channels, 1 output channel.
//!
//! A plain linear congruential recurrence over wrapping `i32`:
//!
//! ```text
//! state[n] = 12345 + 1103515245 * state[n-1]
//! ```
//!
//! scaled by `volume / 2^31` to land in roughly `[-volume, volume]`. Included
//! mostly to show the registry/engine contract is not delay-specific: same
//! lifecycle, different internal state, no history buffer at all.

use crate::graph::Processor;
use crate::params::{CellId, ParamError, ParamSpec, ParameterStore};

/// Output level in `[0, 1]`.
pub const VOLUME: &str = "volume";

/// 2^-31, mapping the full i32 range onto [-1, 1).
const STATE_SCALE: f32 = 4.656_613e-10;

pub struct Noise {
    state: i32,
    volume: Option<CellId>,
}

impl Noise {
    pub fn new() -> Self {
        Self { state: 0, volume: None }
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Noise {
    fn inputs(&self) -> usize {
        0
    }

    fn outputs(&self) -> usize {
        1
    }

    fn bind(&mut self, store: &mut ParameterStore) -> Result<(), ParamError> {
        self.volume = Some(store.register(VOLUME, ParamSpec::slider(0.5, 0.0, 1.0, 0.1))?);
        Ok(())
    }

    fn reset(&mut self, _sample_rate: u32) {
        self.state = 0;
    }

    fn process(&mut self, params: &ParameterStore, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let level = STATE_SCALE * self.volume.map_or(0.5, |id| params.get(id));
        let mut state = self.state;
        for o in outputs[0].iter_mut() {
            state = 12345i32.wrapping_add(1103515245i32.wrapping_mul(state));
            *o = level * state as f32;
        }
        self.state = state;
    }
}
