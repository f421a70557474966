//! C ABI wrapper for the echoline effect engine.
//!
//! Exposes a small set of functions to create/destroy an echo engine,
//! process mono f32 blocks, and read/write parameters by label.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `EcholineEngine` (heap-allocated; you own/delete it).
//! - Labels are NUL-terminated UTF-8 C strings; unknown or malformed labels
//!   report failure (0), they never abort.
//!
//! Threading
//! - `echoline_compute` belongs to exactly one audio thread.
//!   `echoline_set_value`/`echoline_get_value` may be called from one other
//!   (control) thread concurrently; parameter cells are atomic scalars, and
//!   the two sides touch disjoint fields of the handle (compute borrows only
//!   `inner`, set/get borrow only the shared store handle).
//!   `echoline_init` and `echoline_destroy` must not race either of them.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::Arc;

use echoline_engine::{Echo, Engine, ParameterStore};

/// Opaque engine handle handed to C. One feedback-delay effect per handle;
/// hosts wanting several run independent handles.
///
/// `params` is a second handle to the store `inner` reads from, refreshed on
/// every init. The parameter entry points reach the store through this field
/// alone, via raw field projection, so a concurrent `echoline_compute` never
/// shares a borrow of the whole struct with them.
pub struct EcholineEngine {
    inner: Engine<Echo>,
    params: Arc<ParameterStore>,
}

// --- Creation / destruction -------------------------------------------------------

/// Create and initialize an echo engine for `sample_rate`.
/// Returns null only if initialization fails (it cannot for this topology,
/// but the contract allows it).
#[no_mangle]
pub extern "C" fn echoline_create(sample_rate: u32) -> *mut EcholineEngine {
    let mut inner = Engine::new(Echo::new());
    match inner.init(sample_rate) {
        Ok(()) => {
            let params = inner.params();
            Box::into_raw(Box::new(EcholineEngine { inner, params }))
        }
        Err(_) => std::ptr::null_mut(),
    }
}

/// Destroy an engine previously returned by `echoline_create`.
#[no_mangle]
pub extern "C" fn echoline_destroy(engine: *mut EcholineEngine) {
    if !engine.is_null() {
        unsafe { drop(Box::from_raw(engine)) };
    }
}

/// Re-initialize: zero all history and restore every parameter to its
/// declared initial value. Safe to call repeatedly.
#[no_mangle]
pub extern "C" fn echoline_init(engine: *mut EcholineEngine, sample_rate: u32) {
    if engine.is_null() {
        return;
    }
    let e = unsafe { &mut *engine };
    // Binding the same two labels into a fresh store cannot collide.
    let _ = e.inner.init(sample_rate);
    e.params = e.inner.params();
}

// --- Rendering -------------------------------------------------------------------

/// Process `frames` mono samples from `input` into `output`.
/// Both pointers must address at least `frames` f32 values.
/// Returns the number of frames processed (0 on a null argument).
#[no_mangle]
pub extern "C" fn echoline_compute(
    engine: *mut EcholineEngine,
    frames: u32,
    input: *const f32,
    output: *mut f32,
) -> u32 {
    if engine.is_null() || input.is_null() || output.is_null() {
        return 0;
    }
    // Borrow only the `inner` field; the control thread may hold a shared
    // borrow of `params` for the whole block.
    let inner = unsafe { &mut *std::ptr::addr_of_mut!((*engine).inner) };
    let input = unsafe { std::slice::from_raw_parts(input, frames as usize) };
    let output = unsafe { std::slice::from_raw_parts_mut(output, frames as usize) };
    inner.compute(&[input], &mut [output]);
    frames
}

// --- Parameter access -------------------------------------------------------------

/// Write a parameter by label. Returns 1 on success, 0 if the label is
/// unknown or not valid UTF-8.
#[no_mangle]
pub extern "C" fn echoline_set_value(
    engine: *mut EcholineEngine,
    label: *const c_char,
    value: f32,
) -> i32 {
    if engine.is_null() || label.is_null() {
        return 0;
    }
    let params = unsafe { &*std::ptr::addr_of!((*engine).params) };
    match unsafe { CStr::from_ptr(label) }.to_str() {
        Ok(label) if params.set_by_label(label, value) => 1,
        _ => 0,
    }
}

/// Read a parameter by label into `*value`. Returns 1 on success, 0 if the
/// label is unknown (in which case `*value` is untouched).
#[no_mangle]
pub extern "C" fn echoline_get_value(
    engine: *mut EcholineEngine,
    label: *const c_char,
    value: *mut f32,
) -> i32 {
    if engine.is_null() || label.is_null() || value.is_null() {
        return 0;
    }
    let params = unsafe { &*std::ptr::addr_of!((*engine).params) };
    let found = unsafe { CStr::from_ptr(label) }
        .to_str()
        .ok()
        .and_then(|label| params.get_by_label(label));
    match found {
        Some(v) => {
            unsafe { *value = v };
            1
        }
        None => 0,
    }
}
