//! Label-addressed registry of live control values.
//!
//! A [`ParameterStore`] owns a flat, insertion-ordered collection of control
//! cells. Each cell pairs a unique label with a current `f32` value and a
//! descriptor (`initial`/`min`/`max`/`step` plus a widget-kind tag). The
//! descriptor is hinting for adaptation layers; writes are *never* clamped
//! against it.
//!
//! Threading
//! - Registration happens during engine init, before the store is shared.
//!   After that the collection is structurally frozen; only cell *values*
//!   change, through atomics.
//! - `get`/`set` (and the by-label variants) take `&self` and are safe to
//!   call from a control thread while an audio thread reads the same cells.
//!   A value is a single `AtomicU32` holding the f32 bit pattern, so reads
//!   can never observe a torn write.

use core::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

/// Registry errors. Lookup misses on the by-label convenience calls are
/// reported as `Option`/`bool` instead; hosts probing for optional
/// parameters are expected usage, not failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// A label was registered twice in the same store.
    #[error("duplicate parameter label: {0:?}")]
    DuplicateLabel(String),
    /// A required label is not present in the store.
    #[error("unknown parameter label: {0:?}")]
    NotFound(String),
}

/// Widget tag carried for adaptation layers (UI, FFI headers). Not
/// behaviorally significant to the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControlKind {
    Slider,
    NumEntry,
    Toggle,
    Bargraph,
}

/// Static descriptor of a control cell.
#[derive(Copy, Clone, Debug)]
pub struct ParamSpec {
    pub initial: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub kind: ControlKind,
}

impl ParamSpec {
    /// Shorthand for the common slider case.
    #[inline]
    pub fn slider(initial: f32, min: f32, max: f32, step: f32) -> Self {
        Self { initial, min, max, step, kind: ControlKind::Slider }
    }
}

/// Stable handle to a cell within the store that minted it.
///
/// Handles stay valid until that store is dropped (i.e. until the owning
/// engine is re-initialized, which builds a fresh store).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellId(usize);

#[derive(Debug)]
struct ControlCell {
    label: String,
    bits: AtomicU32,
    spec: ParamSpec,
}

/// Insertion-ordered collection of named control cells.
#[derive(Debug, Default)]
pub struct ParameterStore {
    cells: Vec<ControlCell>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// Insert a new cell initialized to `spec.initial`.
    ///
    /// Fails if `label` already exists in this store (exact, case-sensitive
    /// comparison). Registration is a setup-time operation and therefore
    /// takes `&mut self`.
    pub fn register(&mut self, label: &str, spec: ParamSpec) -> Result<CellId, ParamError> {
        if self.find(label).is_some() {
            return Err(ParamError::DuplicateLabel(label.to_owned()));
        }
        self.cells.push(ControlCell {
            label: label.to_owned(),
            bits: AtomicU32::new(spec.initial.to_bits()),
            spec,
        });
        Ok(CellId(self.cells.len() - 1))
    }

    /// Look a label up. Returns the same handle for the same label across
    /// repeated calls. Linear scan; stores hold a handful of cells.
    pub fn find(&self, label: &str) -> Option<CellId> {
        self.cells.iter().position(|c| c.label == label).map(CellId)
    }

    /// Like [`find`](Self::find), but an absent label is an error. Useful for
    /// hosts that treat a missing required control as a setup failure.
    pub fn require(&self, label: &str) -> Result<CellId, ParamError> {
        self.find(label).ok_or_else(|| ParamError::NotFound(label.to_owned()))
    }

    /// Current value of a cell. Never fails for a handle minted by this store.
    #[inline]
    pub fn get(&self, id: CellId) -> f32 {
        // A cell is one machine word; Relaxed keeps the load tear-free and
        // visible to a subsequent block without ordering against other cells.
        f32::from_bits(self.cells[id.0].bits.load(Ordering::Relaxed))
    }

    /// Overwrite a cell's value unconditionally. No clamping against the
    /// descriptor; out-of-range values land in the raw cell as written.
    #[inline]
    pub fn set(&self, id: CellId, value: f32) {
        self.cells[id.0].bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Descriptor the cell was registered with.
    #[inline]
    pub fn spec(&self, id: CellId) -> &ParamSpec {
        &self.cells[id.0].spec
    }

    #[inline]
    pub fn label(&self, id: CellId) -> &str {
        &self.cells[id.0].label
    }

    /// `find` + `get`. `None` if the label is unknown.
    pub fn get_by_label(&self, label: &str) -> Option<f32> {
        self.find(label).map(|id| self.get(id))
    }

    /// `find` + `set`. `false` if the label is unknown; no cell is created
    /// as a side effect.
    pub fn set_by_label(&self, label: &str, value: f32) -> bool {
        match self.find(label) {
            Some(id) => {
                self.set(id, value);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Enumerate cells in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (CellId, &str, &ParamSpec)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (CellId(i), c.label.as_str(), &c.spec))
    }
}
