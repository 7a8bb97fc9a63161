// RAISR RUNTIME - External Super-Resolution Engine Binding
//
// Binds the closed-source RAISR upscaling library at runtime via dynamic
// loading - no compile-time SDK dependency.
//
// Call sequence:
// 1. Load the engine library and resolve its symbols
// 2. Hand over the host's OpenCL context and device
// 3. Initialize with model folder and filter parameters
// 4. Configure resolution once, with the first frame's plane layout
// 5. Process one frame per call
// 6. Deinitialize at teardown

use std::ffi::{c_void, CString};
use std::sync::OnceLock;

use libc::{c_char, c_float, c_int, c_uint};

use crate::engine::{
    BlendingMode, EngineParams, EngineStatus, PlaneDescriptor, UpscaleEngine, MAX_PLANES,
    STATUS_OK,
};
use crate::error::FilterError;
use crate::frame::{DeviceContextHandle, DeviceIdHandle};

#[cfg(target_os = "windows")]
const RAISR_LIB: &str = "raisr.dll";
#[cfg(not(target_os = "windows"))]
const RAISR_LIB: &str = "libraisr.so";

const ENGINE_THREADS: c_uint = 1;

type SetOpenClContextFn = unsafe extern "C" fn(*mut c_void, *mut c_void, c_int, c_int) -> c_int;
type InitFn = unsafe extern "C" fn(
    *const c_char,
    c_float,
    c_uint,
    c_int,
    c_uint,
    c_int,
    c_uint,
    c_uint,
) -> c_int;
type SetResFn = unsafe extern "C" fn(
    *mut PlaneDescriptor,
    *mut PlaneDescriptor,
    *mut PlaneDescriptor,
    *mut PlaneDescriptor,
    *mut PlaneDescriptor,
    *mut PlaneDescriptor,
) -> c_int;
type ProcessFn = unsafe extern "C" fn(
    *mut PlaneDescriptor,
    *mut PlaneDescriptor,
    *mut PlaneDescriptor,
    *mut PlaneDescriptor,
    *mut PlaneDescriptor,
    *mut PlaneDescriptor,
    c_int,
) -> c_int;
type DeinitFn = unsafe extern "C" fn() -> c_int;

struct RaisrLibrary {
    _lib: libloading::Library,
    set_context: SetOpenClContextFn,
    init: InitFn,
    set_res: SetResFn,
    process: ProcessFn,
    deinit: DeinitFn,
}

unsafe impl Send for RaisrLibrary {}
unsafe impl Sync for RaisrLibrary {}

static RAISR: OnceLock<Option<RaisrLibrary>> = OnceLock::new();

fn load_raisr_library() -> Option<&'static RaisrLibrary> {
    RAISR
        .get_or_init(|| unsafe {
            let lib = match libloading::Library::new(RAISR_LIB) {
                Ok(l) => l,
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", RAISR_LIB, e);
                    return None;
                }
            };

            let set_context: SetOpenClContextFn = *lib.get(b"RNLHandler_SetOpenCLContext\0").ok()?;
            let init: InitFn = *lib.get(b"RNLHandler_Init\0").ok()?;
            let set_res: SetResFn = *lib.get(b"RNLHandler_SetRes\0").ok()?;
            let process: ProcessFn = *lib.get(b"RNLHandler_Process\0").ok()?;
            let deinit: DeinitFn = *lib.get(b"RNLHandler_Deinit\0").ok()?;

            tracing::info!("Engine library {} loaded", RAISR_LIB);

            Some(RaisrLibrary {
                _lib: lib,
                set_context,
                init,
                set_res,
                process,
                deinit,
            })
        })
        .as_ref()
}

/// Check whether the engine library can be loaded on this system.
pub fn raisr_available() -> bool {
    load_raisr_library().is_some()
}

/// Runtime availability report for diagnostics surfaces.
pub fn runtime_info() -> serde_json::Value {
    serde_json::json!({
        "backend": "raisr",
        "library": RAISR_LIB,
        "available": raisr_available(),
        "execution": "opencl-external",
        "max_planes": MAX_PLANES,
    })
}

/// Production engine backed by the dynamically loaded RAISR library.
pub struct RaisrRuntime {
    lib: &'static RaisrLibrary,
}

impl RaisrRuntime {
    pub fn new() -> Result<Self, FilterError> {
        let lib = load_raisr_library().ok_or_else(|| {
            FilterError::RuntimeUnavailable(format!("{RAISR_LIB} not found or missing symbols"))
        })?;
        Ok(Self { lib })
    }
}

impl UpscaleEngine for RaisrRuntime {
    fn bind_context(
        &mut self,
        context: DeviceContextHandle,
        device_id: DeviceIdHandle,
    ) -> Result<(), FilterError> {
        let status = unsafe { (self.lib.set_context)(context.0, device_id.0, 0, 0) };
        if status != STATUS_OK {
            return Err(FilterError::EngineBind(EngineStatus(status)));
        }
        Ok(())
    }

    fn initialize(&mut self, params: &EngineParams) -> Result<(), FilterError> {
        let path = params.model_path.to_string_lossy();
        let path = CString::new(path.as_bytes()).map_err(|_| {
            FilterError::InvalidOption("filterfolder contains an interior NUL byte".into())
        })?;

        let status = unsafe {
            (self.lib.init)(
                path.as_ptr(),
                params.ratio as c_float,
                params.bit_depth as c_uint,
                params.range as c_int,
                ENGINE_THREADS,
                params.execution as c_int,
                params.passes as c_uint,
                params.pass_mode as i32 as c_uint,
            )
        };
        if status != STATUS_OK {
            return Err(FilterError::EngineInit(EngineStatus(status)));
        }
        Ok(())
    }

    fn configure_resolution(
        &mut self,
        input: &[PlaneDescriptor; MAX_PLANES],
        output: &[PlaneDescriptor; MAX_PLANES],
    ) -> Result<(), FilterError> {
        let mut input = *input;
        let mut output = *output;
        let status = unsafe {
            let ip = input.as_mut_ptr();
            let op = output.as_mut_ptr();
            (self.lib.set_res)(ip, ip.add(1), ip.add(2), op, op.add(1), op.add(2))
        };
        if status != STATUS_OK {
            return Err(FilterError::ResolutionConfig(EngineStatus(status)));
        }
        Ok(())
    }

    fn process(
        &mut self,
        input: &[PlaneDescriptor; MAX_PLANES],
        output: &[PlaneDescriptor; MAX_PLANES],
        blending: BlendingMode,
    ) -> Result<(), FilterError> {
        let mut input = *input;
        let mut output = *output;
        let status = unsafe {
            let ip = input.as_mut_ptr();
            let op = output.as_mut_ptr();
            (self.lib.process)(
                ip,
                ip.add(1),
                ip.add(2),
                op,
                op.add(1),
                op.add(2),
                blending as c_int,
            )
        };
        if status != STATUS_OK {
            return Err(FilterError::Process(EngineStatus(status)));
        }
        Ok(())
    }

    fn deinitialize(&mut self) {
        let status = unsafe { (self.lib.deinit)() };
        if status != STATUS_OK {
            tracing::warn!("Engine deinit returned {}", status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_construction_matches_availability() {
        // With no engine library installed the constructor must fail
        // cleanly; with one installed it must succeed. Either way the two
        // entry points agree.
        assert_eq!(raisr_available(), RaisrRuntime::new().is_ok());
    }
}
