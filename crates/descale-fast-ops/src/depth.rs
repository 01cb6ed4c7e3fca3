use descale_fast_types::{
    ColorFamily, Frame, FrameError, FrameFormat, FrameResult, Plane, SampleType,
};

use crate::arith::pointwise;

/// Re-expresses every plane in a new sample type and depth. Integer targets
/// are rounded and clamped; float chroma is centred on zero.
pub fn convert_depth(frame: &Frame, sample_type: SampleType, bits: u8) -> FrameResult<Frame> {
    let source = frame.format();
    let target = source.with_depth(sample_type, bits);
    target.validate()?;
    if source == target {
        return Ok(frame.clone());
    }

    let planes = frame
        .planes()
        .iter()
        .enumerate()
        .map(|(idx, plane)| {
            let chroma = idx > 0 && source.family == ColorFamily::Yuv;
            convert_plane(plane, source, target, chroma)
        })
        .collect::<FrameResult<Vec<_>>>()?;

    Ok(Frame::new(target, planes)?
        .with_props(frame.props().clone())
        .with_frame_index(frame.frame_index()))
}

fn convert_plane(
    plane: &Plane,
    source: FrameFormat,
    target: FrameFormat,
    chroma: bool,
) -> FrameResult<Plane> {
    let (src_offset, dst_offset) = if chroma {
        (source.chroma_neutral(), target.chroma_neutral())
    } else {
        (0.0, 0.0)
    };
    let ratio = target.peak_value() / source.peak_value();
    let peak = target.peak_value();
    let (min, max) = if target.is_float() {
        if chroma { (-0.5, 0.5) } else { (0.0, 1.0) }
    } else {
        (0.0, peak)
    };

    // Integer to integer keeps the bit-shift relation so 8-bit 235 lands on
    // 16-bit 60160.
    let int_shift = match (source.sample_type, target.sample_type) {
        (SampleType::Integer, SampleType::Integer) => {
            Some(target.scale_value(1.0, source.bits_per_sample))
        }
        _ => None,
    };

    pointwise(plane, move |v| {
        let scaled = match int_shift {
            Some(factor) => (v * factor).round(),
            None => {
                let out = (v - src_offset) * ratio + dst_offset;
                if target.is_float() { out } else { out.round() }
            }
        };
        if target.is_float() && !chroma {
            scaled
        } else {
            scaled.clamp(min, max)
        }
    })
}

/// Splits a frame into single-plane gray frames of the same depth.
pub fn split_planes(frame: &Frame) -> FrameResult<Vec<Frame>> {
    frame
        .planes()
        .iter()
        .map(|plane| {
            Frame::gray(frame.format(), plane.clone())
                .map(|f| f.with_frame_index(frame.frame_index()))
        })
        .collect()
}

/// Rebuilds a frame from a processed luma frame and the chroma of `source`.
///
/// Gray sources pass `luma` straight through. The result keeps the props of
/// `luma`.
pub fn join_planes(luma: &Frame, source: &Frame) -> FrameResult<Frame> {
    let format = source.format();
    if luma.format() != format.luma_only() {
        return Err(FrameError::format_mismatch(
            format.luma_only().to_string(),
            luma.format().to_string(),
        ));
    }
    if luma.luma().dimensions() != source.luma().dimensions() {
        return Err(FrameError::invalid_frame(format!(
            "luma is {}x{} but chroma belongs to {}x{}",
            luma.width(),
            luma.height(),
            source.width(),
            source.height()
        )));
    }
    if format.family == ColorFamily::Gray {
        return Ok(luma.clone());
    }
    let mut planes = Vec::with_capacity(format.num_planes());
    planes.push(luma.luma().clone());
    planes.extend(source.chroma().iter().cloned());
    Ok(Frame::new(format, planes)?
        .with_props(luma.props().clone())
        .with_frame_index(luma.frame_index()))
}
