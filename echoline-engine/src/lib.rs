//! Echoline Engine — parameter registry + block processors + engine wrapper.
//!
//! Crate layout:
//! - [`params`] : label-addressed [`ParameterStore`](params::ParameterStore) of live control cells
//! - [`graph`]  : [`Processor`](graph::Processor) trait and [`Engine<P>`](graph::Engine) wrapper
//! - [`echo`]   : feedback delay line effect (1 in, 1 out)
//! - [`noise`]  : linear-congruential noise generator (0 in, 1 out)
//!
//! The engine deliberately avoids heap allocations and locks on the audio
//! path. Control cells are atomic scalars, so a host/UI thread may write
//! parameters by label while another thread is inside `compute`.

pub mod echo;
pub mod graph;
pub mod noise;
pub mod params;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use echo::Echo;
pub use graph::{Engine, Processor};
pub use noise::Noise;
pub use params::{CellId, ControlKind, ParamError, ParamSpec, ParameterStore};
