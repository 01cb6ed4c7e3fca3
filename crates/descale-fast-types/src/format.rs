use std::fmt;

use serde::Serialize;

use crate::error::{FrameError, FrameResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorFamily {
    Gray,
    Yuv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampleType {
    Integer,
    Float,
}

/// Pixel layout of a frame. Samples are always held as `f32`, but in the
/// native range of the format: `0..=2^bits - 1` for integer formats and
/// `0.0..=1.0` for float luma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameFormat {
    pub family: ColorFamily,
    pub sample_type: SampleType,
    pub bits_per_sample: u8,
    pub subsampling_w: u8,
    pub subsampling_h: u8,
}

impl FrameFormat {
    pub const GRAY8: Self = Self::gray(SampleType::Integer, 8);
    pub const GRAY16: Self = Self::gray(SampleType::Integer, 16);
    pub const GRAYS: Self = Self::gray(SampleType::Float, 32);
    pub const YUV444P8: Self = Self::yuv(SampleType::Integer, 8, 0, 0);
    pub const YUV420P8: Self = Self::yuv(SampleType::Integer, 8, 1, 1);
    pub const YUV444PS: Self = Self::yuv(SampleType::Float, 32, 0, 0);

    const fn gray(sample_type: SampleType, bits_per_sample: u8) -> Self {
        Self {
            family: ColorFamily::Gray,
            sample_type,
            bits_per_sample,
            subsampling_w: 0,
            subsampling_h: 0,
        }
    }

    const fn yuv(
        sample_type: SampleType,
        bits_per_sample: u8,
        subsampling_w: u8,
        subsampling_h: u8,
    ) -> Self {
        Self {
            family: ColorFamily::Yuv,
            sample_type,
            bits_per_sample,
            subsampling_w,
            subsampling_h,
        }
    }

    pub fn validate(&self) -> FrameResult<()> {
        match self.sample_type {
            SampleType::Integer if !(8..=16).contains(&self.bits_per_sample) => {
                Err(FrameError::configuration(format!(
                    "integer formats support 8 to 16 bits, got {}",
                    self.bits_per_sample
                )))
            }
            SampleType::Float if self.bits_per_sample != 32 => Err(FrameError::configuration(
                format!(
                    "float formats must be 32 bit, got {}",
                    self.bits_per_sample
                ),
            )),
            _ if self.family == ColorFamily::Gray
                && (self.subsampling_w != 0 || self.subsampling_h != 0) =>
            {
                Err(FrameError::configuration("gray formats cannot be subsampled"))
            }
            _ if self.subsampling_w > 2 || self.subsampling_h > 2 => Err(
                FrameError::configuration("chroma subsampling is limited to a factor of 4"),
            ),
            _ => Ok(()),
        }
    }

    pub fn num_planes(&self) -> usize {
        match self.family {
            ColorFamily::Gray => 1,
            ColorFamily::Yuv => 3,
        }
    }

    pub fn is_float(&self) -> bool {
        self.sample_type == SampleType::Float
    }

    pub fn peak_value(&self) -> f32 {
        match self.sample_type {
            SampleType::Integer => ((1u32 << self.bits_per_sample) - 1) as f32,
            SampleType::Float => 1.0,
        }
    }

    /// Midpoint used as the binarization pivot for mask data.
    pub fn neutral_value(&self) -> f32 {
        match self.sample_type {
            SampleType::Integer => (1u32 << (self.bits_per_sample - 1)) as f32,
            SampleType::Float => 0.5,
        }
    }

    /// Zero point of a chroma plane.
    pub fn chroma_neutral(&self) -> f32 {
        match self.sample_type {
            SampleType::Integer => (1u32 << (self.bits_per_sample - 1)) as f32,
            SampleType::Float => 0.0,
        }
    }

    /// Single-plane format with the same sample type and depth.
    pub fn luma_only(&self) -> Self {
        Self::gray(self.sample_type, self.bits_per_sample)
    }

    pub fn with_depth(&self, sample_type: SampleType, bits_per_sample: u8) -> Self {
        Self {
            sample_type,
            bits_per_sample,
            ..*self
        }
    }

    pub fn plane_dimensions(&self, plane: usize, width: usize, height: usize) -> (usize, usize) {
        if plane == 0 {
            return (width, height);
        }
        let sw = 1usize << self.subsampling_w;
        let sh = 1usize << self.subsampling_h;
        (width.div_ceil(sw), height.div_ceil(sh))
    }

    /// Converts `value`, expressed at `from_bits` (32 meaning float), into the
    /// native range of this format.
    pub fn scale_value(&self, value: f32, from_bits: u8) -> f32 {
        let from_float = from_bits >= 32;
        match (from_float, self.sample_type) {
            (true, SampleType::Float) => value,
            (true, SampleType::Integer) => value * self.peak_value(),
            (false, SampleType::Float) => value / ((1u32 << from_bits) - 1) as f32,
            (false, SampleType::Integer) => {
                let target = i32::from(self.bits_per_sample);
                let shift = target - i32::from(from_bits);
                if shift >= 0 {
                    value * (1u32 << shift) as f32
                } else {
                    value / (1u32 << (-shift)) as f32
                }
            }
        }
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = match self.family {
            ColorFamily::Gray => "Gray",
            ColorFamily::Yuv => "YUV",
        };
        let sample = match self.sample_type {
            SampleType::Integer => "",
            SampleType::Float => "F",
        };
        write!(f, "{family}{}{sample}", self.bits_per_sample)?;
        if self.family == ColorFamily::Yuv {
            write!(f, " ss{}x{}", self.subsampling_w, self.subsampling_h)?;
        }
        Ok(())
    }
}
