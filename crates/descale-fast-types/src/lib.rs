//! Shared frame model for the descale-fast workspace.
//!
//! This crate centralizes the plane, frame and clip abstractions used by the
//! ops, kernel, mask and engine crates. Keep it free of any resampling or
//! filtering logic so every crate can depend on it without pulling rayon or
//! tokio.

mod cache;
mod error;
mod format;
mod frame;
mod plane;
mod source;

pub use cache::CachedSource;
pub use error::{FrameError, FrameResult};
pub use format::{ColorFamily, FrameFormat, SampleType};
pub use frame::{Frame, FrameProps, Transfer};
pub use plane::{Plane, mirror};
pub use source::{ClipInfo, FrameSource, MapSource, SharedSource, VecSource, clamp_index};
