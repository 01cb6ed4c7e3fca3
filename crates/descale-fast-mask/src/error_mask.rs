use std::sync::Arc;

use descale_fast_kernels::{FilterKernel, Upscaler};
use descale_fast_ops::{
    XxpandMode, abs_diff, binarize, box_blur, combine, expand, gauss_blur, hysteresis, limiter,
    max_planes, multiply, pointwise,
};
use descale_fast_types::{
    CachedSource, ClipInfo, Frame, FrameError, FrameFormat, FrameResult, FrameSource, Plane,
    SharedSource, clamp_index,
};

use crate::config::{BlurSpec, ErrorMaskParams};
use crate::detail::matching_luma;
use crate::temporal::stabilize;

const TV_LOW: f32 = 16.0;
const TV_HIGH: f32 = 235.0;

/// Weight map that amplifies the error of achromatic highlights and shadows.
fn chroma_bias(source: &Frame, bias: f32) -> FrameResult<Plane> {
    let format = source.format();
    let luma = source.luma();
    let neutral = format.chroma_neutral();

    let activity: Vec<Plane> = source
        .chroma()
        .iter()
        .map(|plane| pointwise(plane, move |v| (v - neutral).abs()))
        .collect::<FrameResult<_>>()?;
    let refs: Vec<&Plane> = activity.iter().collect();
    let activity = max_planes(&refs)?;
    let activity = Upscaler::scale(&FilterKernel::CATROM, &activity, luma.width(), luma.height())?;

    let tv_low = format.scale_value(TV_LOW, 8);
    let tv_high = format.scale_value(TV_HIGH, 8);
    let flat = if format.is_float() { 1e-5 } else { 0.5 };
    let weights = combine(luma, &activity, move |y, c| {
        if (y >= tv_high || y <= tv_low) && c.abs() < flat {
            bias
        } else {
            1.0
        }
    })?;
    expand(&weights, 2, XxpandMode::Rectangle)
}

/// Spatial part of the error mask, up to and including the second ellipse
/// expand. The result is binary at the source depth.
pub fn build_error_mask_base(
    source: &Frame,
    rescaled: &Frame,
    params: &ErrorMaskParams,
) -> FrameResult<Frame> {
    let format = source.format();
    let peak = format.peak_value();
    let reference = matching_luma(source, rescaled)?;
    let (exp_rect, exp_ellipse, exp_final) = params.expands();

    let mut error = abs_diff(source.luma(), &reference)?;

    if params.bw_bias() > 1.0 && !source.chroma().is_empty() {
        let weights = chroma_bias(source, params.bw_bias())?;
        error = multiply(&error, &weights)?;
    }

    error = expand(&error, exp_rect, XxpandMode::Rectangle)?;
    if exp_ellipse > 0 {
        error = expand(&error, exp_ellipse, XxpandMode::Ellipse)?;
    }

    let thresholds: Vec<f32> = params
        .thresholds()
        .iter()
        .map(|value| format.scale_value(value / 10.0, 32))
        .collect();
    let mut mask = binarize(&error, thresholds[0], 0.0, peak)?;
    for &threshold in &thresholds[1..] {
        let seeds = binarize(&error, threshold, 0.0, peak)?;
        mask = hysteresis(&seeds, &mask, peak)?;
    }

    if exp_final > 0 {
        mask = expand(&mask, exp_final, XxpandMode::Ellipse)?;
    }

    Ok(Frame::gray(format, mask)?.with_frame_index(source.frame_index()))
}

fn finish(base: &Frame, blur: BlurSpec) -> FrameResult<Frame> {
    let format = base.format();
    let blurred = match blur {
        BlurSpec::Box(radius) => box_blur(base.luma(), radius)?,
        BlurSpec::Gauss(sigma) => gauss_blur(base.luma(), sigma)?,
    };
    let clamped = limiter(&blurred, 0.0, format.peak_value())?;
    Ok(Frame::gray(format, clamped)?.with_frame_index(base.frame_index()))
}

/// Error mask of a single frame pair. Temporal stabilization needs the
/// neighbouring frames and is only applied by [`ErrorMaskNode`].
pub fn build_error_mask(
    source: &Frame,
    rescaled: &Frame,
    params: &ErrorMaskParams,
) -> FrameResult<Frame> {
    let base = build_error_mask_base(source, rescaled, params)?;
    finish(&base, params.blur())
}

struct BaseErrorNode {
    source: SharedSource,
    rescaled: SharedSource,
    params: ErrorMaskParams,
    info: ClipInfo,
}

impl FrameSource for BaseErrorNode {
    fn info(&self) -> ClipInfo {
        self.info
    }

    fn frame(&self, index: usize) -> FrameResult<Frame> {
        self.info.check_index(index)?;
        let source = self.source.frame(index)?;
        let rescaled = self.rescaled.frame(index)?;
        build_error_mask_base(&source, &rescaled, &self.params)
    }
}

/// Lazily computes the error mask of two clips, including temporal
/// stabilization when the radius calls for it.
pub struct ErrorMaskNode {
    base: SharedSource,
    params: ErrorMaskParams,
    info: ClipInfo,
}

impl ErrorMaskNode {
    pub fn new(
        source: SharedSource,
        rescaled: SharedSource,
        params: ErrorMaskParams,
    ) -> FrameResult<Self> {
        params.validate()?;
        let info = source.info();
        if rescaled.num_frames() != info.num_frames {
            return Err(FrameError::configuration(format!(
                "mask inputs differ in length: {} vs {}",
                info.num_frames,
                rescaled.num_frames()
            )));
        }
        let info = info.with_format(info.format.luma_only());
        let base: SharedSource = Arc::new(BaseErrorNode {
            source,
            rescaled,
            params: params.clone(),
            info,
        });
        let base: SharedSource = if params.is_temporal() {
            let window = 4 * params.temporal_radius() as usize + 2;
            Arc::new(CachedSource::new(base, window))
        } else {
            base
        };
        Ok(Self { base, params, info })
    }

    pub fn shared(
        source: SharedSource,
        rescaled: SharedSource,
        params: ErrorMaskParams,
    ) -> FrameResult<SharedSource> {
        Ok(Arc::new(Self::new(source, rescaled, params)?))
    }

    fn stabilized(&self, index: usize) -> FrameResult<Frame> {
        let radius = self.params.temporal_radius() as usize;
        let len = self.info.num_frames;
        let reach = 2 * radius as isize;
        let window = (-reach..=reach)
            .map(|offset| {
                self.base
                    .frame(clamp_index(index, offset, len))
                    .map(|frame| frame.luma().clone())
            })
            .collect::<FrameResult<Vec<_>>>()?;
        let format: FrameFormat = self.info.format;
        let plane = stabilize(&window, radius, format.neutral_value(), format.peak_value())?;
        Ok(Frame::gray(format, plane)?.with_frame_index(Some(index as u64)))
    }
}

impl FrameSource for ErrorMaskNode {
    fn info(&self) -> ClipInfo {
        self.info
    }

    fn frame(&self, index: usize) -> FrameResult<Frame> {
        self.info.check_index(index)?;
        let base = if self.params.is_temporal() {
            self.stabilized(index)?
        } else {
            self.base.frame(index)?
        };
        finish(&base, self.params.blur())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(plane: Plane) -> Frame {
        Frame::gray(FrameFormat::GRAYS, plane).unwrap()
    }

    fn yuv(luma: f32, chroma: f32) -> Frame {
        Frame::new(
            FrameFormat::YUV444PS,
            vec![
                Plane::filled(8, 8, luma).unwrap(),
                Plane::filled(8, 8, chroma).unwrap(),
                Plane::filled(8, 8, chroma).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn bias_amplifies_achromatic_extremes() {
        let params = ErrorMaskParams::new(vec![0.5], (0, 0, 0), BlurSpec::Box(0), 4.0, 1).unwrap();
        let rescaled = gray(Plane::filled(8, 8, 0.98).unwrap());

        // diff 0.02 is below 0.05 unless the bias multiplies it.
        let white = build_error_mask_base(&yuv(1.0, 0.0), &rescaled, &params).unwrap();
        assert!(white.luma().data().iter().all(|&v| v == 1.0));

        let tinted = build_error_mask_base(&yuv(1.0, 0.2), &rescaled, &params).unwrap();
        assert!(tinted.luma().data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn gray_sources_skip_the_bias() {
        let params = ErrorMaskParams::new(vec![0.5], (0, 0, 0), BlurSpec::Box(0), 4.0, 1).unwrap();
        let source = gray(Plane::filled(8, 8, 1.0).unwrap());
        let rescaled = gray(Plane::filled(8, 8, 0.98).unwrap());
        let mask = build_error_mask_base(&source, &rescaled, &params).unwrap();
        assert!(mask.luma().data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn output_stays_within_range() {
        let source = gray(Plane::from_fn(16, 16, |x, y| ((x + y) % 2) as f32).unwrap());
        let rescaled = gray(Plane::filled(16, 16, 0.5).unwrap());
        let mask = build_error_mask(&source, &rescaled, &ErrorMaskParams::default()).unwrap();
        assert!(mask.luma().data().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
