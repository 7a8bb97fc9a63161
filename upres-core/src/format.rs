// PIXEL FORMATS - Negotiable frame layouts
//
// The host pipeline can offer a range of layouts at negotiation time; the
// engine itself accepts exactly three device-resident 4:2:0 ones:
// • YUV420P - 8-bit planar (Y, U, V)
// • NV12    - 8-bit semi-planar (Y, interleaved UV)
// • P010    - 10-bit semi-planar, samples in the high bits of 16-bit storage
//
// Anything else is rejected during negotiation, before a frame flows.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    // YUV planar
    Yuv420p,
    Yuv420p10,
    Yuv422p,
    Yuv444p,

    // YUV semi-planar
    Nv12,
    P010,

    // Packed RGB
    Rgb24,
    Bgra,
}

/// Input layouts the engine can consume.
pub const ACCEPTED_INPUT_FORMATS: &[PixelFormat] =
    &[PixelFormat::Yuv420p, PixelFormat::Nv12, PixelFormat::P010];

impl PixelFormat {
    /// Parse from the name used on the operator surface.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "yuv420p" => Some(Self::Yuv420p),
            "yuv420p10" | "yuv420p10le" => Some(Self::Yuv420p10),
            "yuv422p" => Some(Self::Yuv422p),
            "yuv444p" => Some(Self::Yuv444p),
            "nv12" => Some(Self::Nv12),
            "p010" | "p010le" => Some(Self::P010),
            "rgb24" => Some(Self::Rgb24),
            "bgra" => Some(Self::Bgra),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Yuv420p => "yuv420p",
            Self::Yuv420p10 => "yuv420p10",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Nv12 => "nv12",
            Self::P010 => "p010",
            Self::Rgb24 => "rgb24",
            Self::Bgra => "bgra",
        }
    }

    /// True for the layouts the engine accepts as input.
    pub fn supported_by_engine(&self) -> bool {
        ACCEPTED_INPUT_FORMATS.contains(self)
    }

    /// Component bit depth.
    pub fn bit_depth(&self) -> u32 {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Nv12 | Self::Rgb24 | Self::Bgra => 8,
            Self::Yuv420p10 | Self::P010 => 10,
        }
    }

    /// Number of planes carried by a frame in this layout.
    pub fn plane_count(&self) -> usize {
        match self {
            Self::Yuv420p | Self::Yuv420p10 | Self::Yuv422p | Self::Yuv444p => 3,
            Self::Nv12 | Self::P010 => 2,
            Self::Rgb24 | Self::Bgra => 1,
        }
    }

    /// log2 of the horizontal chroma subsampling factor.
    pub fn log2_chroma_w(&self) -> u32 {
        match self {
            Self::Yuv420p | Self::Yuv420p10 | Self::Yuv422p | Self::Nv12 | Self::P010 => 1,
            Self::Yuv444p | Self::Rgb24 | Self::Bgra => 0,
        }
    }

    /// log2 of the vertical chroma subsampling factor.
    pub fn log2_chroma_h(&self) -> u32 {
        match self {
            Self::Yuv420p | Self::Yuv420p10 | Self::Nv12 | Self::P010 => 1,
            Self::Yuv422p | Self::Yuv444p | Self::Rgb24 | Self::Bgra => 0,
        }
    }

    /// Bit shift of the sample value within its storage unit. P010 stores
    /// 10-bit samples in the high bits of 16-bit words; yuv420p10 keeps
    /// them in the low bits.
    pub fn bit_shift(&self, _plane: usize) -> u8 {
        match self {
            Self::P010 => 6,
            _ => 0,
        }
    }

    /// Bytes per sample in one plane's storage.
    pub fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::Yuv420p10 | Self::P010 => 2,
            Self::Rgb24 => 3,
            Self::Bgra => 4,
            _ => 1,
        }
    }

    /// Width/height of one plane for a frame of the given dimensions.
    /// Plane 0 is full resolution; chroma planes are subsampled. For the
    /// semi-planar formats the interleaved UV plane is counted in chroma
    /// sample pairs, so the same division applies.
    pub fn plane_dimensions(&self, plane: usize, width: u32, height: u32) -> (u32, u32) {
        if plane == 0 {
            (width, height)
        } else {
            let wsub = 1 << self.log2_chroma_w();
            let hsub = 1 << self.log2_chroma_h();
            (width / wsub, height / hsub)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names_round_trip() {
        for fmt in [
            PixelFormat::Yuv420p,
            PixelFormat::Yuv420p10,
            PixelFormat::Yuv422p,
            PixelFormat::Yuv444p,
            PixelFormat::Nv12,
            PixelFormat::P010,
            PixelFormat::Rgb24,
            PixelFormat::Bgra,
        ] {
            assert_eq!(PixelFormat::from_name(fmt.name()), Some(fmt));
        }
        assert_eq!(PixelFormat::from_name("P010LE"), Some(PixelFormat::P010));
        assert_eq!(PixelFormat::from_name("gray8"), None);
    }

    #[test]
    fn test_engine_accepts_exactly_three_layouts() {
        assert!(PixelFormat::Yuv420p.supported_by_engine());
        assert!(PixelFormat::Nv12.supported_by_engine());
        assert!(PixelFormat::P010.supported_by_engine());
        assert!(!PixelFormat::Yuv420p10.supported_by_engine());
        assert!(!PixelFormat::Yuv422p.supported_by_engine());
        assert!(!PixelFormat::Rgb24.supported_by_engine());
        assert!(!PixelFormat::Bgra.supported_by_engine());
    }

    #[test]
    fn test_bit_depth_and_shift() {
        assert_eq!(PixelFormat::Yuv420p.bit_depth(), 8);
        assert_eq!(PixelFormat::Nv12.bit_depth(), 8);
        assert_eq!(PixelFormat::P010.bit_depth(), 10);
        assert_eq!(PixelFormat::Nv12.bit_shift(0), 0);
        assert_eq!(PixelFormat::P010.bit_shift(0), 6);
        assert_eq!(PixelFormat::P010.bit_shift(1), 6);
        // 10-bit planar keeps samples in the low bits.
        assert_eq!(PixelFormat::Yuv420p10.bit_shift(0), 0);
    }

    #[test]
    fn test_plane_dimensions_420() {
        // Luma is full size, chroma is halved in both axes.
        assert_eq!(PixelFormat::Yuv420p.plane_dimensions(0, 1920, 1080), (1920, 1080));
        assert_eq!(PixelFormat::Yuv420p.plane_dimensions(1, 1920, 1080), (960, 540));
        assert_eq!(PixelFormat::Yuv420p.plane_dimensions(2, 1920, 1080), (960, 540));
        assert_eq!(PixelFormat::Nv12.plane_dimensions(1, 1920, 1080), (960, 540));
        // Odd dimensions truncate, matching the negotiated buffer layout.
        assert_eq!(PixelFormat::Nv12.plane_dimensions(1, 1921, 1081), (960, 540));
    }

    #[test]
    fn test_plane_count() {
        assert_eq!(PixelFormat::Yuv420p.plane_count(), 3);
        assert_eq!(PixelFormat::Nv12.plane_count(), 2);
        assert_eq!(PixelFormat::P010.plane_count(), 2);
        assert_eq!(PixelFormat::Bgra.plane_count(), 1);
    }
}
