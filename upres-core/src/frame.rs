//! # Device Frames
//!
//! Frame and buffer handle types for pixel data living in accelerator
//! memory. The filter never touches pixel bytes itself; planes are opaque
//! device buffer handles passed straight through to the engine.

use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;

use crate::error::FilterError;
use crate::format::PixelFormat;

// ============================================================================
// Opaque device handles
// ============================================================================

/// Handle to one plane's device buffer (e.g. a cl_mem).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMem(pub *mut c_void);

unsafe impl Send for DeviceMem {}

impl DeviceMem {
    pub fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// Handle to the device context the frames live in (e.g. a cl_context).
/// Owned by the host pipeline's hardware layer; it outlives the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceContextHandle(pub *mut c_void);

unsafe impl Send for DeviceContextHandle {}

/// Handle to the device itself (e.g. a cl_device_id).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdHandle(pub *mut c_void);

unsafe impl Send for DeviceIdHandle {}

/// The context/device pair the host pipeline hands to the filter at
/// negotiation time.
#[derive(Debug, Clone, Copy)]
pub struct DeviceBinding {
    pub context: DeviceContextHandle,
    pub device_id: DeviceIdHandle,
}

// ============================================================================
// Frames
// ============================================================================

/// One plane of a device frame.
#[derive(Debug, Clone, Copy)]
pub struct DevicePlane {
    pub mem: DeviceMem,
    /// Row stride in bytes; may exceed width * bytes-per-sample.
    pub stride: u32,
}

/// Frame-level properties carried from input to output unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameProps {
    /// Presentation timestamp in microseconds.
    pub pts_us: i64,
    pub frame_num: u64,
    /// Opaque side data blobs (HDR metadata etc.), forwarded verbatim.
    pub side_data: HashMap<String, Vec<u8>>,
}

type ReleaseFn = Box<dyn FnMut(&mut DeviceFrame) + Send>;

/// An image buffer on the accelerator.
///
/// Input frames are borrowed from the host pipeline and released by the
/// filter once processed. Output frames come from a [`FrameAllocator`] and
/// own their planes until handed back downstream. Dropping a frame releases
/// its buffers through the hook its allocator installed.
pub struct DeviceFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub planes: Vec<DevicePlane>,
    /// Device context the planes belong to. `None` means the frame is not
    /// device-resident and must be rejected by the filter.
    pub device: Option<DeviceContextHandle>,
    pub props: FrameProps,
    release: Option<ReleaseFn>,
}

impl DeviceFrame {
    pub fn new(width: u32, height: u32, format: PixelFormat, planes: Vec<DevicePlane>) -> Self {
        Self {
            width,
            height,
            format,
            planes,
            device: None,
            props: FrameProps::default(),
            release: None,
        }
    }

    pub fn with_device(mut self, device: DeviceContextHandle) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_props(mut self, props: FrameProps) -> Self {
        self.props = props;
        self
    }

    /// Install the hook that returns this frame's buffers to their owner.
    /// Runs exactly once, when the frame is dropped.
    pub fn set_release(&mut self, release: impl FnMut(&mut DeviceFrame) + Send + 'static) {
        self.release = Some(Box::new(release));
    }

    pub fn is_device_resident(&self) -> bool {
        self.device.is_some()
    }
}

impl fmt::Debug for DeviceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("planes", &self.planes.len())
            .field("device", &self.device.is_some())
            .field("pts_us", &self.props.pts_us)
            .finish()
    }
}

impl Drop for DeviceFrame {
    fn drop(&mut self) {
        if let Some(mut release) = self.release.take() {
            release(self);
        }
    }
}

// ============================================================================
// Allocation seam
// ============================================================================

/// Host-pipeline collaborator that allocates output frames on the device.
///
/// The filter asks for one output frame per input frame, at the negotiated
/// output geometry. Allocation failure is a per-frame error; the filter does
/// not retry.
pub trait FrameAllocator {
    fn allocate(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<DeviceFrame, FilterError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_release_hook_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let mut frame = DeviceFrame::new(64, 64, PixelFormat::Nv12, Vec::new());
        frame.set_release(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(frame);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_frame_without_device_is_not_resident() {
        let frame = DeviceFrame::new(64, 64, PixelFormat::Yuv420p, Vec::new());
        assert!(!frame.is_device_resident());
        let ctx = DeviceContextHandle(0x10 as *mut _);
        let frame = frame.with_device(ctx);
        assert!(frame.is_device_resident());
    }
}
