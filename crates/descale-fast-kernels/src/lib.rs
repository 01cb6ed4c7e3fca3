//! Resampling capabilities consumed by the descale engine.
//!
//! A [`Kernel`] can both scale a plane and solve the least-squares inverse of
//! its own upscale. An [`Upscaler`] only scales. [`FilterKernel`] provides the
//! separable built-ins and implements both.

mod filter;
mod lsq;
mod resample;
mod weights;

use std::fmt;
use std::sync::Arc;

use descale_fast_types::{FrameError, FrameResult, Plane};

pub use filter::FilterKernel;

use lsq::descale_horizontal;
use resample::{resample_horizontal, resample_vertical, transpose};
use weights::WeightMatrix;

/// Subpixel offset `(x, y)` in source pixels.
pub type Shift = (f64, f64);

pub trait Kernel: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Estimates the `width x height` plane that this kernel would upscale to
    /// `plane`.
    fn descale(&self, plane: &Plane, width: usize, height: usize, shift: Shift)
    -> FrameResult<Plane>;

    fn scale(&self, plane: &Plane, width: usize, height: usize, shift: Shift)
    -> FrameResult<Plane>;
}

pub trait Upscaler: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn scale(&self, plane: &Plane, width: usize, height: usize) -> FrameResult<Plane>;
}

pub type SharedKernel = Arc<dyn Kernel>;
pub type SharedUpscaler = Arc<dyn Upscaler>;

fn check_target(width: usize, height: usize) -> FrameResult<()> {
    if width == 0 || height == 0 {
        return Err(FrameError::configuration(format!(
            "target dimensions must be non-zero, got {width}x{height}"
        )));
    }
    Ok(())
}

impl Kernel for FilterKernel {
    fn name(&self) -> &'static str {
        self.label()
    }

    fn descale(
        &self,
        plane: &Plane,
        width: usize,
        height: usize,
        shift: Shift,
    ) -> FrameResult<Plane> {
        check_target(width, height)?;
        let (src_width, src_height) = plane.dimensions();
        if width > src_width || height > src_height {
            return Err(FrameError::configuration(format!(
                "cannot descale {src_width}x{src_height} up to {width}x{height}"
            )));
        }
        let horizontal = descale_horizontal(plane, *self, width, shift.0)?;
        let vertical = descale_horizontal(&transpose(&horizontal)?, *self, height, shift.1)?;
        transpose(&vertical)
    }

    fn scale(
        &self,
        plane: &Plane,
        width: usize,
        height: usize,
        shift: Shift,
    ) -> FrameResult<Plane> {
        check_target(width, height)?;
        let (src_width, src_height) = plane.dimensions();
        if (width, height) == (src_width, src_height) && shift == (0.0, 0.0) {
            return Ok(plane.clone());
        }
        let horizontal = WeightMatrix::new(*self, src_width, width, shift.0)?;
        let vertical = WeightMatrix::new(*self, src_height, height, shift.1)?;
        resample_vertical(&resample_horizontal(plane, &horizontal)?, &vertical)
    }
}

impl Upscaler for FilterKernel {
    fn name(&self) -> &'static str {
        self.label()
    }

    fn scale(&self, plane: &Plane, width: usize, height: usize) -> FrameResult<Plane> {
        Kernel::scale(self, plane, width, height, (0.0, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descale_rejects_growing_targets() {
        let plane = Plane::filled(8, 8, 0.5).unwrap();
        let err = FilterKernel::CATROM.descale(&plane, 10, 6, (0.0, 0.0)).unwrap_err();
        assert!(matches!(err, FrameError::Configuration { .. }));
    }

    #[test]
    fn upscaler_and_kernel_share_weights() {
        let plane = Plane::from_fn(5, 4, |x, y| (x + 2 * y) as f32).unwrap();
        let kernel = FilterKernel::Spline36;
        let a = Kernel::scale(&kernel, &plane, 9, 7, (0.0, 0.0)).unwrap();
        let b = Upscaler::scale(&kernel, &plane, 9, 7).unwrap();
        assert_eq!(a, b);
    }
}
