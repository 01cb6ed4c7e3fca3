use std::sync::Arc;

use descale_fast_ops::{
    Coordinates, abs_diff, binarize, convert_depth, inflate, limiter, maximum, minimum,
};
use descale_fast_types::{
    ClipInfo, Frame, FrameError, FrameResult, FrameSource, Plane, SharedSource,
};

use crate::config::DetailMaskParams;

/// Brings `rescaled` to the sample type and depth of `source` so both luma
/// planes can be compared directly.
pub(crate) fn matching_luma(source: &Frame, rescaled: &Frame) -> FrameResult<Plane> {
    let target = source.format();
    let luma = if rescaled.format().luma_only() == target.luma_only() {
        rescaled.luma().clone()
    } else {
        convert_depth(
            &Frame::gray(rescaled.format(), rescaled.luma().clone())?,
            target.sample_type,
            target.bits_per_sample,
        )?
        .luma()
        .clone()
    };
    source.luma().ensure_same_size(&luma)?;
    Ok(luma)
}

fn xxpand(plane: Plane, count: i32) -> FrameResult<Plane> {
    let mut current = plane;
    for _ in 0..count.unsigned_abs() {
        current = if count > 0 {
            maximum(&current, Coordinates::Rectangle)?
        } else {
            minimum(&current, Coordinates::Rectangle)?
        };
    }
    Ok(current)
}

/// Marks pixels whose rescale does not reproduce the source, i.e. detail that
/// never went through the assumed downscale.
pub fn build_detail_mask(
    source: &Frame,
    rescaled: &Frame,
    params: &DetailMaskParams,
) -> FrameResult<Frame> {
    let format = source.format().luma_only();
    let peak = format.peak_value();
    let reference = matching_luma(source, rescaled)?;

    let diff = abs_diff(source.luma(), &reference)?;
    let mut mask = binarize(&diff, params.threshold * peak, 0.0, peak)?;
    mask = xxpand(mask, params.expand.0)?;
    for _ in 0..params.inflate {
        mask = inflate(&mask)?;
    }
    mask = xxpand(mask, params.expand.1)?;
    let mask = limiter(&mask, 0.0, peak)?;

    Ok(Frame::gray(format, mask)?.with_frame_index(source.frame_index()))
}

/// Lazily computes the detail mask of two clips frame by frame.
pub struct DetailMaskNode {
    source: SharedSource,
    rescaled: SharedSource,
    params: DetailMaskParams,
    info: ClipInfo,
}

impl DetailMaskNode {
    pub fn new(
        source: SharedSource,
        rescaled: SharedSource,
        params: DetailMaskParams,
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
        Ok(Self {
            source,
            rescaled,
            params,
            info: info.with_format(info.format.luma_only()),
        })
    }

    pub fn shared(
        source: SharedSource,
        rescaled: SharedSource,
        params: DetailMaskParams,
    ) -> FrameResult<SharedSource> {
        Ok(Arc::new(Self::new(source, rescaled, params)?))
    }
}

impl FrameSource for DetailMaskNode {
    fn info(&self) -> ClipInfo {
        self.info
    }

    fn frame(&self, index: usize) -> FrameResult<Frame> {
        self.info.check_index(index)?;
        let source = self.source.frame(index)?;
        let rescaled = self.rescaled.frame(index)?;
        build_detail_mask(&source, &rescaled, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use descale_fast_types::FrameFormat;

    use super::*;

    fn gray(plane: Plane) -> Frame {
        Frame::gray(FrameFormat::GRAYS, plane).unwrap()
    }

    #[test]
    fn identical_inputs_produce_an_empty_mask() {
        let frame = gray(Plane::from_fn(12, 12, |x, y| ((x ^ y) & 1) as f32).unwrap());
        let mask = build_detail_mask(&frame, &frame, &DetailMaskParams::default()).unwrap();
        assert!(mask.luma().data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn single_defect_grows_and_softens() {
        let source = gray(Plane::filled(16, 16, 0.5).unwrap());
        let rescaled = gray(
            Plane::from_fn(16, 16, |x, y| if x == 8 && y == 8 { 0.0 } else { 0.5 }).unwrap(),
        );
        let params = DetailMaskParams {
            threshold: 0.05,
            inflate: 1,
            expand: (1, 0),
        };
        let mask = build_detail_mask(&source, &rescaled, &params).unwrap();
        let plane = mask.luma();
        assert_eq!(plane.get(8, 8), 1.0);
        assert_eq!(plane.get(7, 7), 1.0);
        assert!(plane.get(6, 8) > 0.0 && plane.get(6, 8) < 1.0);
        assert_eq!(plane.get(0, 0), 0.0);
    }

    #[test]
    fn negative_expand_erodes() {
        let source = gray(Plane::filled(8, 8, 0.5).unwrap());
        let rescaled = gray(
            Plane::from_fn(8, 8, |x, y| if x == 4 && y == 4 { 0.0 } else { 0.5 }).unwrap(),
        );
        let params = DetailMaskParams {
            threshold: 0.05,
            inflate: 0,
            expand: (-1, 0),
        };
        let mask = build_detail_mask(&source, &rescaled, &params).unwrap();
        assert!(mask.luma().data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn depths_are_reconciled() {
        let source = Frame::gray(FrameFormat::GRAY8, Plane::filled(4, 4, 255.0).unwrap()).unwrap();
        let rescaled = gray(Plane::filled(4, 4, 1.0).unwrap());
        let mask = build_detail_mask(&source, &rescaled, &DetailMaskParams::default()).unwrap();
        assert_eq!(mask.format(), FrameFormat::GRAY8);
        assert!(mask.luma().data().iter().all(|&v| v == 0.0));
    }
}
