//! # Upscale Engine Interface
//!
//! Capability seam to the external super-resolution engine. The engine is a
//! closed-source native library with process-wide state: it is bound to a
//! device context once, initialized once with the model parameters,
//! resolution-configured once, then invoked per frame. Nothing about its
//! internals is modeled here beyond that contract.

use std::ffi::c_void;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// The engine accepts at most three planes per frame.
pub const MAX_PLANES: usize = 3;

// ============================================================================
// ABI types
// ============================================================================

/// Status code returned by every engine call. Zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatus(pub i32);

pub const STATUS_OK: i32 = 0;

impl EngineStatus {
    pub fn is_ok(&self) -> bool {
        self.0 == STATUS_OK
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine status {}", self.0)
    }
}

/// Per-plane buffer description handed to the engine, matching its C layout.
/// Built fresh for every frame; unused plane slots stay zeroed.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlaneDescriptor {
    /// Device buffer handle for the plane's pixel data.
    pub data: *mut c_void,
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes.
    pub step: u32,
    /// Sample bit shift within the storage unit (6 for P010).
    pub bit_shift: u8,
}

impl PlaneDescriptor {
    pub fn zeroed() -> Self {
        Self {
            data: std::ptr::null_mut(),
            width: 0,
            height: 0,
            step: 0,
            bit_shift: 0,
        }
    }
}

/// Strategy the engine uses to merge candidate pixels into the final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum BlendingMode {
    Randomness = 1,
    CountOfBitsChanged = 2,
}

/// Input sample range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ColorRange {
    Video = 0,
    Full = 1,
}

/// Which pass performs the upscale when running two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum PassMode {
    UpscaleFirstPass = 1,
    UpscaleSecondPass = 2,
}

/// Engine execution backend. The filter always runs against externally
/// owned device buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExecutionMode {
    Avx2 = 1,
    Avx512 = 2,
    OpenCl = 3,
    OpenClExternal = 4,
}

/// Everything the engine needs at initialization time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    /// Filesystem path to the model weight folder.
    pub model_path: PathBuf,
    pub ratio: f32,
    pub bit_depth: u32,
    pub range: ColorRange,
    pub execution: ExecutionMode,
    pub passes: u32,
    pub pass_mode: PassMode,
}

// ============================================================================
// Capability trait
// ============================================================================

/// The external engine's contract, exactly as the filter consumes it.
///
/// Call order is fixed: `bind_context`, `initialize`, then
/// `configure_resolution` once before the first `process`, `process` per
/// frame, `deinitialize` once at the end. Implementations do not need to
/// defend against other orders; the adapter sequences the calls.
pub trait UpscaleEngine: Send {
    fn bind_context(
        &mut self,
        context: crate::frame::DeviceContextHandle,
        device_id: crate::frame::DeviceIdHandle,
    ) -> Result<(), FilterError>;

    fn initialize(&mut self, params: &EngineParams) -> Result<(), FilterError>;

    fn configure_resolution(
        &mut self,
        input: &[PlaneDescriptor; MAX_PLANES],
        output: &[PlaneDescriptor; MAX_PLANES],
    ) -> Result<(), FilterError>;

    fn process(
        &mut self,
        input: &[PlaneDescriptor; MAX_PLANES],
        output: &[PlaneDescriptor; MAX_PLANES],
        blending: BlendingMode,
    ) -> Result<(), FilterError>;

    fn deinitialize(&mut self);
}

// ============================================================================
// Single-session guard
// ============================================================================

static ENGINE_BOUND: AtomicBool = AtomicBool::new(false);

/// Guard over the engine's process-wide state. The engine exposes global
/// bind/init/deinit operations, so only one bound session may exist at a
/// time; a second concurrent session gets `FilterError::EngineBusy` instead
/// of undefined behavior.
pub struct EngineLock {
    _priv: (),
}

impl EngineLock {
    pub fn acquire() -> Result<Self, FilterError> {
        if ENGINE_BOUND
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Ok(Self { _priv: () })
        } else {
            Err(FilterError::EngineBusy)
        }
    }
}

impl Drop for EngineLock {
    fn drop(&mut self) {
        ENGINE_BOUND.store(false, Ordering::Release);
    }
}

/// Serializes tests that exercise the process-wide engine slot.
#[cfg(test)]
pub(crate) fn session_test_guard() -> parking_lot::MutexGuard<'static, ()> {
    use once_cell::sync::Lazy;
    static GUARD: Lazy<parking_lot::Mutex<()>> = Lazy::new(|| parking_lot::Mutex::new(()));
    GUARD.lock()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_lock_is_exclusive() {
        let _serial = session_test_guard();

        let first = EngineLock::acquire().expect("first session");
        assert!(matches!(EngineLock::acquire(), Err(FilterError::EngineBusy)));
        drop(first);
        let second = EngineLock::acquire().expect("slot released on drop");
        drop(second);
    }

    #[test]
    fn test_plane_descriptor_zeroed() {
        let d = PlaneDescriptor::zeroed();
        assert!(d.data.is_null());
        assert_eq!((d.width, d.height, d.step), (0, 0, 0));
        assert_eq!(d.bit_shift, 0);
    }
}
