//! # Upscale Adapter
//!
//! The filter node that routes device-resident frames through the external
//! super-resolution engine, exactly once per frame.
//!
//! ```text
//! Unconfigured ──configure_output──► Configured ──first frame──► Active
//!                                        │                         │
//!                                        └──resolution failure──► Poisoned
//! ```
//!
//! `configure_output` runs once, when the host pipeline negotiates output
//! geometry. The engine's resolution binding happens lazily on the first
//! frame, because plane strides are only known once a real buffer arrives,
//! and never recurs: the engine cannot change resolution within a session.

use serde::{Deserialize, Serialize};

use crate::engine::{
    EngineLock, EngineParams, EngineStatus, ExecutionMode, PlaneDescriptor, UpscaleEngine,
    MAX_PLANES,
};
use crate::error::FilterError;
use crate::format::PixelFormat;
use crate::frame::{DeviceBinding, DeviceFrame, FrameAllocator};
use crate::options::FilterOptions;

// ============================================================================
// Negotiation types
// ============================================================================

/// Everything the host pipeline knows about the input link at negotiation
/// time.
#[derive(Debug, Clone, Copy)]
pub struct InputLink {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub device: DeviceBinding,
}

/// Negotiated output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputGeometry {
    pub width: u32,
    pub height: u32,
}

/// Output dimensions for a given input: `floor(input * ratio)` per axis,
/// reduced by one where odd if `evenoutput` is set.
pub fn compute_output_geometry(width: u32, height: u32, options: &FilterOptions) -> OutputGeometry {
    let mut out_w = (width as f32 * options.ratio) as u32;
    let mut out_h = (height as f32 * options.ratio) as u32;
    if options.evenoutput {
        out_w -= out_w % 2;
        out_h -= out_h % 2;
    }
    OutputGeometry {
        width: out_w,
        height: out_h,
    }
}

// ============================================================================
// Adapter
// ============================================================================

enum SessionState {
    Unconfigured,
    /// Engine bound and initialized; resolution not yet set.
    Configured,
    /// Resolution set, processing frames.
    Active,
    /// Resolution configuration failed; no frame can be processed.
    Poisoned(EngineStatus),
}

pub struct UpscaleAdapter {
    options: FilterOptions,
    engine: Box<dyn UpscaleEngine>,
    state: SessionState,
    format: Option<PixelFormat>,
    geometry: Option<OutputGeometry>,
    _lock: Option<EngineLock>,
}

impl UpscaleAdapter {
    pub fn new(options: FilterOptions, engine: Box<dyn UpscaleEngine>) -> Self {
        Self {
            options,
            engine,
            state: SessionState::Unconfigured,
            format: None,
            geometry: None,
            _lock: None,
        }
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn output_geometry(&self) -> Option<OutputGeometry> {
        self.geometry
    }

    /// One-time setup, invoked when the host pipeline negotiates the output
    /// link and before any frame flows. Binds and initializes the engine and
    /// returns the negotiated output dimensions. Any error here is fatal to
    /// filter construction.
    pub fn configure_output(&mut self, link: &InputLink) -> Result<OutputGeometry, FilterError> {
        if !link.format.supported_by_engine() {
            return Err(FilterError::UnsupportedFormat(link.format.name().into()));
        }

        let lock = EngineLock::acquire()?;

        self.engine
            .bind_context(link.device.context, link.device.device_id)?;
        self.engine.initialize(&EngineParams {
            model_path: self.options.filterfolder.clone(),
            ratio: self.options.ratio,
            bit_depth: self.options.bits,
            range: self.options.range,
            execution: ExecutionMode::OpenClExternal,
            passes: self.options.passes,
            pass_mode: self.options.mode,
        })?;

        // The model is trained for one bit depth; running it against the
        // wrong depth would produce wrong output, not merely worse output.
        let depth = link.format.bit_depth();
        if depth != self.options.bits {
            return Err(FilterError::FormatMismatch {
                expected: self.options.bits,
                actual: depth,
            });
        }

        let geometry = compute_output_geometry(link.width, link.height, &self.options);
        tracing::info!(
            "Upscale configured: {} {}x{} -> {}x{} (ratio {})",
            link.format.name(),
            link.width,
            link.height,
            geometry.width,
            geometry.height,
            self.options.ratio,
        );

        self.format = Some(link.format);
        self.geometry = Some(geometry);
        self._lock = Some(lock);
        self.state = SessionState::Configured;
        Ok(geometry)
    }

    /// Process one frame. Frames arrive in order, one at a time. The input
    /// frame is consumed; the returned output frame carries the input's
    /// props and is owned by the caller. Per-frame failures leave the
    /// session usable for the next frame; a resolution-configuration
    /// failure poisons the session.
    pub fn process_frame(
        &mut self,
        input: DeviceFrame,
        allocator: &dyn FrameAllocator,
    ) -> Result<DeviceFrame, FilterError> {
        let (format, geometry) = match self.state {
            SessionState::Unconfigured => return Err(FilterError::NotConfigured),
            SessionState::Poisoned(status) => return Err(FilterError::ResolutionConfig(status)),
            SessionState::Configured | SessionState::Active => {
                match (self.format, self.geometry) {
                    (Some(f), Some(g)) => (f, g),
                    _ => return Err(FilterError::NotConfigured),
                }
            }
        };

        tracing::debug!(
            "Filter input: {}, {}x{} ({})",
            input.format.name(),
            input.width,
            input.height,
            input.props.pts_us,
        );

        if !input.is_device_resident() {
            return Err(FilterError::MissingDeviceBuffer);
        }

        let mut output = allocator.allocate(geometry.width, geometry.height, format)?;

        let mut vdt_in = [PlaneDescriptor::zeroed(); MAX_PLANES];
        let mut vdt_out = [PlaneDescriptor::zeroed(); MAX_PLANES];
        for p in 0..format.plane_count() {
            let in_plane = input
                .planes
                .get(p)
                .ok_or(FilterError::MissingDeviceBuffer)?;
            if in_plane.mem.is_null() {
                return Err(FilterError::MissingDeviceBuffer);
            }
            let out_plane = output.planes.get(p).ok_or_else(|| {
                FilterError::OutOfMemory(format!("allocator returned no plane {p}"))
            })?;

            let (in_w, in_h) = format.plane_dimensions(p, input.width, input.height);
            let (out_w, out_h) = format.plane_dimensions(p, output.width, output.height);

            vdt_in[p] = PlaneDescriptor {
                data: in_plane.mem.0,
                width: in_w,
                height: in_h,
                step: in_plane.stride,
                bit_shift: format.bit_shift(p),
            };
            vdt_out[p] = PlaneDescriptor {
                data: out_plane.mem.0,
                width: out_w,
                height: out_h,
                step: out_plane.stride,
                bit_shift: format.bit_shift(p),
            };
        }

        if let SessionState::Configured = self.state {
            if let Err(err) = self.engine.configure_resolution(&vdt_in, &vdt_out) {
                let status = match &err {
                    FilterError::ResolutionConfig(status) => *status,
                    _ => EngineStatus(-1),
                };
                self.state = SessionState::Poisoned(status);
                return Err(err);
            }
            self.state = SessionState::Active;
            tracing::info!(
                "Engine resolution bound: {}x{} -> {}x{}",
                input.width,
                input.height,
                output.width,
                output.height,
            );
        }

        self.engine
            .process(&vdt_in, &vdt_out, self.options.blending)?;

        output.props = input.props.clone();
        drop(input);

        tracing::debug!(
            "Filter output: {}, {}x{} ({})",
            output.format.name(),
            output.width,
            output.height,
            output.props.pts_us,
        );

        Ok(output)
    }
}

impl Drop for UpscaleAdapter {
    fn drop(&mut self) {
        self.engine.deinitialize();
    }
}
