use std::sync::Arc;

use descale_fast_kernels::{FilterKernel, SharedKernel, SharedUpscaler, Shift, Upscaler};
use descale_fast_mask::{MaskFn, MaskSource};
use descale_fast_ops::{convert_depth, join_planes, masked_merge, split_planes};
use descale_fast_types::{
    CachedSource, ClipInfo, ColorFamily, Frame, FrameError, FrameFormat, FrameResult, MapSource,
    Plane, SampleType, SharedSource,
};

use crate::candidate::{Candidate, CandidateGenerator, DescaleRequest};
use crate::selector::ScoreSelector;

/// Resampler used to bring masks and the source luma to the size of frames
/// that were not upscaled. Other descale tools use Spline144 here; Spline36
/// is the widest spline `FilterKernel` provides.
const FALLBACK_RESIZE: FilterKernel = FilterKernel::Spline36;

/// Everything a descale run needs. Defaults target 720p with Catrom and
/// upscale back with Spline36 under a detail mask.
#[derive(Debug, Clone)]
pub struct DescaleConfig {
    pub heights: Vec<u32>,
    pub widths: Option<Vec<u32>>,
    pub kernels: Vec<SharedKernel>,
    /// Without an upscaler the output keeps each frame's descaled size.
    pub upscaler: Option<SharedUpscaler>,
    /// Rejects descaling for frames whose best statistic exceeds it; `0.0`
    /// disables rejection.
    pub threshold: f64,
    pub shift: Shift,
    pub mask: MaskSource,
    /// Emit the mask clip instead of the merged result.
    pub show_mask: bool,
}

impl Default for DescaleConfig {
    fn default() -> Self {
        Self {
            heights: vec![720],
            widths: None,
            kernels: vec![Arc::new(FilterKernel::CATROM)],
            upscaler: Some(Arc::new(FilterKernel::Spline36)),
            threshold: 0.0,
            shift: (0.0, 0.0),
            mask: MaskSource::default(),
            show_mask: false,
        }
    }
}

impl DescaleConfig {
    fn request(&self) -> DescaleRequest {
        DescaleRequest {
            heights: self.heights.clone(),
            widths: self.widths.clone(),
            kernels: self.kernels.clone(),
            shift: self.shift,
        }
    }
}

pub struct DescaleOutput {
    pub clip: SharedSource,
    pub candidates: Arc<[Candidate]>,
    pub selector: Arc<ScoreSelector>,
}

impl std::fmt::Debug for DescaleOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescaleOutput")
            .field("info", &self.clip.info())
            .field("candidates", &self.candidates)
            .finish()
    }
}

fn first_plane(frame: &Frame) -> FrameResult<Frame> {
    split_planes(frame)?
        .into_iter()
        .next()
        .ok_or_else(|| FrameError::invalid_frame("frame has no planes"))
}

fn fit_plane(plane: &Plane, width: usize, height: usize) -> FrameResult<Plane> {
    if plane.dimensions() == (width, height) {
        return Ok(plane.clone());
    }
    Upscaler::scale(&FALLBACK_RESIZE, plane, width, height)
}

/// Builds the lazy output clip of a multi-candidate descale.
///
/// Every configuration problem is reported here, before any frame is
/// requested.
pub fn descale(source: SharedSource, config: &DescaleConfig) -> FrameResult<DescaleOutput> {
    let info = source.info();
    let (src_width, src_height) = info.fixed_dimensions()?;
    let format = info.format;
    format.validate()?;
    let mask_builder = config.mask.resolve()?;

    let float_format = format.with_depth(SampleType::Float, 32);
    let float_source = CachedSource::shared(MapSource::shared(
        source.clone(),
        info.with_format(float_format),
        |_, frame| convert_depth(&frame, SampleType::Float, 32),
    ));
    let luma = CachedSource::shared(MapSource::shared(
        float_source.clone(),
        info.with_format(FrameFormat::GRAYS),
        |_, frame| first_plane(&frame),
    ));

    let candidates: Arc<[Candidate]> =
        CandidateGenerator::generate(&luma, &config.request())?.into();
    let selector = Arc::new(ScoreSelector::new(
        luma.clone(),
        candidates.clone(),
        config.threshold,
    )?);
    let selected = CachedSource::shared(ScoreSelector::clip(&selector));
    let selected_info = selected.info();

    let resized_output = config.upscaler.is_none()
        && selected_info.width.zip(selected_info.height) != Some((src_width, src_height));
    if resized_output && format.family == ColorFamily::Yuv && !config.show_mask {
        return Err(FrameError::configuration(
            "descaling without an upscaler changes the luma size, which cannot be rejoined \
             with the chroma planes; configure an upscaler or enable show_mask",
        ));
    }

    log::info!(
        "descale {}x{} {}: {} candidate(s), upscaler {}, mask {}, threshold {}",
        src_width,
        src_height,
        format,
        candidates.len(),
        config.upscaler.as_ref().map_or("none", |u| u.name()),
        config.mask.label(),
        config.threshold
    );

    let upscaled = upscale_clip(&selected, config.upscaler.clone(), (src_width, src_height));

    let merged = match mask_builder {
        None => upscaled,
        Some(build) => {
            let mask = build_mask(&build, &float_source, &luma, &selected, &candidates)?;
            if config.show_mask {
                let mask_info = mask.info();
                let out_info = match upscaled.info().width.zip(upscaled.info().height) {
                    Some((w, h)) => mask_info.with_dimensions(w, h),
                    None => ClipInfo::variable(mask_info.format, mask_info.num_frames),
                };
                return Ok(DescaleOutput {
                    clip: show_mask_clip(mask, upscaled, out_info),
                    candidates,
                    selector,
                });
            }
            merge_clip(upscaled, luma.clone(), mask)
        }
    };

    let clip = restore_clip(merged, source, format);
    Ok(DescaleOutput {
        clip,
        candidates,
        selector,
    })
}

fn upscale_clip(
    selected: &SharedSource,
    upscaler: Option<SharedUpscaler>,
    (width, height): (u32, u32),
) -> SharedSource {
    let Some(upscaler) = upscaler else {
        return selected.clone();
    };
    let info = selected.info().with_dimensions(width, height);
    MapSource::shared(selected.clone(), info, move |_, frame| {
        if (frame.width(), frame.height()) == (width, height) {
            return Ok(frame);
        }
        let plane = upscaler.scale(frame.luma(), width as usize, height as usize)?;
        Ok(Frame::gray(frame.format(), plane)?.with_props(frame.props().clone()))
    })
}

/// Rescaled reference of the selected candidate, or the source luma for
/// rejected frames, then handed to the mask builder.
fn build_mask(
    build: &Arc<MaskFn>,
    float_source: &SharedSource,
    luma: &SharedSource,
    selected: &SharedSource,
    candidates: &Arc<[Candidate]>,
) -> FrameResult<SharedSource> {
    let candidates = candidates.clone();
    let fallback = luma.clone();
    let reference = MapSource::shared(selected.clone(), luma.info(), move |n, frame| {
        let props = frame.props();
        match props.candidate_index {
            Some(index) if !props.rejected => candidates
                .get(index)
                .ok_or_else(|| {
                    FrameError::invalid_frame(format!("frame {n} names unknown candidate {index}"))
                })?
                .rescaled()
                .frame(n),
            _ => fallback.frame(n),
        }
    });
    let mask = build(float_source, &reference)?;
    if mask.num_frames() != luma.num_frames() {
        return Err(FrameError::configuration(format!(
            "mask clip has {} frames, source has {}",
            mask.num_frames(),
            luma.num_frames()
        )));
    }
    Ok(CachedSource::shared(mask))
}

fn show_mask_clip(mask: SharedSource, upscaled: SharedSource, info: ClipInfo) -> SharedSource {
    MapSource::shared(upscaled, info, move |n, frame| {
        let mask = mask.frame(n)?;
        let plane = fit_plane(mask.luma(), frame.luma().width(), frame.luma().height())?;
        Ok(Frame::gray(mask.format(), plane)?.with_props(frame.props().clone()))
    })
}

fn merge_clip(upscaled: SharedSource, luma: SharedSource, mask: SharedSource) -> SharedSource {
    let info = upscaled.info();
    MapSource::shared(upscaled, info, move |n, frame| {
        let (width, height) = frame.luma().dimensions();
        let mask = mask.frame(n)?;
        let peak = mask.format().peak_value();
        let mask_plane = fit_plane(mask.luma(), width, height)?;
        let source = luma.frame(n)?;
        let source_plane = fit_plane(source.luma(), width, height)?;
        let plane = masked_merge(frame.luma(), &source_plane, &mask_plane, peak)?;
        Ok(Frame::gray(frame.format(), plane)?.with_props(frame.props().clone()))
    })
}

/// Converts the processed luma back to the source depth and rejoins the
/// untouched chroma.
fn restore_clip(merged: SharedSource, source: SharedSource, format: FrameFormat) -> SharedSource {
    let merged_info = merged.info();
    let info = if format.family == ColorFamily::Yuv {
        merged_info.with_format(format)
    } else {
        merged_info.with_format(format.luma_only())
    };
    MapSource::shared(merged, info, move |n, frame| {
        let luma = convert_depth(&frame, format.sample_type, format.bits_per_sample)?;
        if format.family == ColorFamily::Gray {
            return Ok(luma);
        }
        join_planes(&luma, &source.frame(n)?)
    })
}
