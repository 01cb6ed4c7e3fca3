use std::sync::Arc;

use crate::error::{FrameError, FrameResult};
use crate::format::FrameFormat;
use crate::frame::Frame;

/// Static description of a clip. `None` dimensions mean the clip changes
/// resolution from frame to frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipInfo {
    pub format: FrameFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub num_frames: usize,
}

impl ClipInfo {
    pub fn new(format: FrameFormat, width: u32, height: u32, num_frames: usize) -> Self {
        Self {
            format,
            width: Some(width),
            height: Some(height),
            num_frames,
        }
    }

    pub fn variable(format: FrameFormat, num_frames: usize) -> Self {
        Self {
            format,
            width: None,
            height: None,
            num_frames,
        }
    }

    pub fn with_format(self, format: FrameFormat) -> Self {
        Self { format, ..self }
    }

    pub fn with_dimensions(self, width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..self
        }
    }

    /// Returns the fixed dimensions or a configuration error for variable clips.
    pub fn fixed_dimensions(&self) -> FrameResult<(u32, u32)> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Ok((width, height)),
            _ => Err(FrameError::configuration(
                "operation requires a clip with constant dimensions",
            )),
        }
    }

    pub fn check_index(&self, index: usize) -> FrameResult<()> {
        if index >= self.num_frames {
            return Err(FrameError::FrameOutOfRange {
                index,
                len: self.num_frames,
            });
        }
        Ok(())
    }
}

/// Pull-based frame sequence: a frame is produced only when requested.
///
/// Implementations must be safe to query concurrently for different indices
/// and must not keep mutable per-request state.
pub trait FrameSource: Send + Sync {
    fn info(&self) -> ClipInfo;

    fn frame(&self, index: usize) -> FrameResult<Frame>;

    fn num_frames(&self) -> usize {
        self.info().num_frames
    }
}

pub type SharedSource = Arc<dyn FrameSource>;

/// Clamps a shifted index into the clip, repeating the edge frames.
pub fn clamp_index(index: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let shifted = index as isize + offset;
    shifted.clamp(0, len as isize - 1) as usize
}

/// Clip backed by frames held in memory.
pub struct VecSource {
    info: ClipInfo,
    frames: Vec<Frame>,
}

impl VecSource {
    pub fn new(frames: Vec<Frame>) -> FrameResult<Self> {
        let first = frames
            .first()
            .ok_or_else(|| FrameError::configuration("a clip needs at least one frame"))?;
        let format = first.format();
        let mut width = Some(first.width());
        let mut height = Some(first.height());
        for frame in &frames {
            if frame.format() != format {
                return Err(FrameError::format_mismatch(
                    format.to_string(),
                    frame.format().to_string(),
                ));
            }
            if Some(frame.width()) != width || Some(frame.height()) != height {
                width = None;
                height = None;
            }
        }
        let info = ClipInfo {
            format,
            width,
            height,
            num_frames: frames.len(),
        };
        Ok(Self { info, frames })
    }

    pub fn shared(frames: Vec<Frame>) -> FrameResult<SharedSource> {
        Ok(Arc::new(Self::new(frames)?))
    }
}

impl FrameSource for VecSource {
    fn info(&self) -> ClipInfo {
        self.info
    }

    fn frame(&self, index: usize) -> FrameResult<Frame> {
        self.info.check_index(index)?;
        Ok(self.frames[index]
            .clone()
            .with_frame_index(Some(index as u64)))
    }
}

type MapFn = dyn Fn(usize, Frame) -> FrameResult<Frame> + Send + Sync;

/// Lazily applies a per-frame transform to a parent clip.
pub struct MapSource {
    parent: SharedSource,
    info: ClipInfo,
    map: Box<MapFn>,
}

impl MapSource {
    pub fn new(
        parent: SharedSource,
        info: ClipInfo,
        map: impl Fn(usize, Frame) -> FrameResult<Frame> + Send + Sync + 'static,
    ) -> Self {
        Self {
            parent,
            info,
            map: Box::new(map),
        }
    }

    pub fn shared(
        parent: SharedSource,
        info: ClipInfo,
        map: impl Fn(usize, Frame) -> FrameResult<Frame> + Send + Sync + 'static,
    ) -> SharedSource {
        Arc::new(Self::new(parent, info, map))
    }
}

impl FrameSource for MapSource {
    fn info(&self) -> ClipInfo {
        self.info
    }

    fn frame(&self, index: usize) -> FrameResult<Frame> {
        self.info.check_index(index)?;
        let frame = self.parent.frame(index)?;
        let mapped = (self.map)(index, frame)?;
        Ok(mapped.with_frame_index(Some(index as u64)))
    }
}
