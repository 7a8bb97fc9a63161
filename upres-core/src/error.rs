//! Filter error types.

use thiserror::Error;

use crate::engine::EngineStatus;

/// Errors surfaced by the upscale filter.
///
/// Construction-time variants (`EngineBind`, `EngineInit`, `EngineBusy`,
/// `FormatMismatch`, `UnsupportedFormat`, `InvalidOption`) are fatal to the
/// filter. Per-frame variants (`OutOfMemory`, `Process`,
/// `MissingDeviceBuffer`) abort the current frame only. `ResolutionConfig`
/// is fatal to the session: no later frame can be processed either.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("engine rejected device context: {0}")]
    EngineBind(EngineStatus),
    #[error("engine initialization failed: {0}")]
    EngineInit(EngineStatus),
    #[error("another upscale session is already bound in this process")]
    EngineBusy,
    #[error("engine runtime not available: {0}")]
    RuntimeUnavailable(String),
    #[error("input bit depth {actual} does not match the model bit depth {expected}")]
    FormatMismatch { expected: u32, actual: u32 },
    #[error("unsupported input pixel format: {0}")]
    UnsupportedFormat(String),
    #[error("invalid filter option: {0}")]
    InvalidOption(String),
    #[error("filter is not configured")]
    NotConfigured,
    #[error("failed to allocate output frame: {0}")]
    OutOfMemory(String),
    #[error("engine resolution configuration failed: {0}")]
    ResolutionConfig(EngineStatus),
    #[error("engine processing failed: {0}")]
    Process(EngineStatus),
    #[error("input frame has no device buffer attached")]
    MissingDeviceBuffer,
}

impl FilterError {
    /// True for errors that abort the whole filter, not just one frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            FilterError::OutOfMemory(_) | FilterError::Process(_) | FilterError::MissingDeviceBuffer
        )
    }
}
