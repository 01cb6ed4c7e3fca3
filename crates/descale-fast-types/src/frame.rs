use std::fmt;

use serde::Serialize;

use crate::error::{FrameError, FrameResult};
use crate::format::FrameFormat;
use crate::plane::Plane;

/// Transfer characteristics recorded on frames that went through a gamma
/// conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transfer {
    Linear,
    Bt709,
    Bt601,
    Bt2020_10,
    Bt2020_12,
    Smpte240m,
    Srgb,
}

impl Transfer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transfer::Linear => "linear",
            Transfer::Bt709 => "bt709",
            Transfer::Bt601 => "bt601",
            Transfer::Bt2020_10 => "bt2020-10",
            Transfer::Bt2020_12 => "bt2020-12",
            Transfer::Smpte240m => "smpte240m",
            Transfer::Srgb => "srgb",
        }
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-frame metadata attached by upstream stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameProps {
    pub descale_width: Option<u32>,
    pub descale_height: Option<u32>,
    /// Mean absolute reconstruction error, normalized to `[0, 1]`.
    pub statistic: Option<f64>,
    pub candidate_index: Option<usize>,
    pub kernel: Option<&'static str>,
    /// Set when the selector refused every candidate for this frame.
    pub rejected: bool,
    pub transfer: Option<Transfer>,
}

#[derive(Clone)]
pub struct Frame {
    format: FrameFormat,
    planes: Vec<Plane>,
    props: FrameProps,
    frame_index: Option<u64>,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("format", &self.format)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("planes", &self.planes.len())
            .field("frame_index", &self.frame_index)
            .field("props", &self.props)
            .finish()
    }
}

impl Frame {
    pub fn new(format: FrameFormat, planes: Vec<Plane>) -> FrameResult<Self> {
        format.validate()?;
        if planes.len() != format.num_planes() {
            return Err(FrameError::invalid_frame(format!(
                "{format} expects {} planes, got {}",
                format.num_planes(),
                planes.len()
            )));
        }
        let (width, height) = planes[0].dimensions();
        for (idx, plane) in planes.iter().enumerate().skip(1) {
            let expected = format.plane_dimensions(idx, width, height);
            if plane.dimensions() != expected {
                return Err(FrameError::invalid_frame(format!(
                    "plane {idx} is {}x{}, expected {}x{}",
                    plane.width(),
                    plane.height(),
                    expected.0,
                    expected.1
                )));
            }
        }
        Ok(Self {
            format,
            planes,
            props: FrameProps::default(),
            frame_index: None,
        })
    }

    /// Single-plane frame in the gray variant of the plane's depth.
    pub fn gray(format: FrameFormat, plane: Plane) -> FrameResult<Self> {
        Self::new(format.luma_only(), vec![plane])
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.planes[0].width() as u32
    }

    pub fn height(&self) -> u32 {
        self.planes[0].height() as u32
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    pub fn luma(&self) -> &Plane {
        &self.planes[0]
    }

    pub fn chroma(&self) -> &[Plane] {
        &self.planes[1..]
    }

    pub fn props(&self) -> &FrameProps {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut FrameProps {
        &mut self.props
    }

    pub fn with_props(mut self, props: FrameProps) -> Self {
        self.props = props;
        self
    }

    pub fn frame_index(&self) -> Option<u64> {
        self.frame_index
    }

    pub fn with_frame_index(mut self, index: Option<u64>) -> Self {
        self.frame_index = index;
        self
    }

    pub fn set_frame_index(&mut self, index: Option<u64>) {
        self.frame_index = index;
    }

    pub fn into_planes(self) -> Vec<Plane> {
        self.planes
    }
}
