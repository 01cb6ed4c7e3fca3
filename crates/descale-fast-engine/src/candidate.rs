use std::fmt;

use descale_fast_kernels::{SharedKernel, Shift};
use descale_fast_ops::{abs_diff, plane_stats_average};
use descale_fast_types::{
    CachedSource, ClipInfo, Frame, FrameError, FrameFormat, FrameResult, MapSource, SharedSource,
};

/// What to try: every kernel against every target resolution.
#[derive(Debug, Clone)]
pub struct DescaleRequest {
    pub heights: Vec<u32>,
    /// Derived from the source aspect ratio when absent.
    pub widths: Option<Vec<u32>>,
    pub kernels: Vec<SharedKernel>,
    pub shift: Shift,
}

impl DescaleRequest {
    /// Pairs each height with its width.
    pub fn resolutions(
        &self,
        source_width: u32,
        source_height: u32,
    ) -> FrameResult<Vec<(u32, u32)>> {
        if self.heights.is_empty() {
            return Err(FrameError::configuration("at least one target height is required"));
        }
        let widths = match &self.widths {
            Some(widths) => widths.clone(),
            None => self
                .heights
                .iter()
                .map(|&h| {
                    (f64::from(h) * f64::from(source_width) / f64::from(source_height))
                        .round_ties_even() as u32
                })
                .collect(),
        };
        if widths.len() != self.heights.len() {
            return Err(FrameError::configuration(format!(
                "number of widths ({}) and heights ({}) differ",
                widths.len(),
                self.heights.len()
            )));
        }
        Ok(widths.into_iter().zip(self.heights.iter().copied()).collect())
    }
}

/// One (kernel, resolution) hypothesis and the lazily evaluated clips derived
/// from it.
#[derive(Clone)]
pub struct Candidate {
    index: usize,
    kernel: SharedKernel,
    width: u32,
    height: u32,
    descaled: SharedSource,
    rescaled: SharedSource,
    diff: SharedSource,
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("index", &self.index)
            .field("kernel", &self.kernel.name())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Candidate {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kernel(&self) -> &SharedKernel {
        &self.kernel
    }

    pub fn kernel_name(&self) -> &'static str {
        self.kernel.name()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frames at the candidate resolution.
    pub fn descaled(&self) -> &SharedSource {
        &self.descaled
    }

    /// Descaled frames scaled back to the source size with the same kernel.
    pub fn rescaled(&self) -> &SharedSource {
        &self.rescaled
    }

    /// Absolute difference frames carrying the per-frame statistic in their
    /// props.
    pub fn diff(&self) -> &SharedSource {
        &self.diff
    }
}

fn tag(mut frame: Frame, index: usize, kernel: &'static str, width: u32, height: u32) -> Frame {
    let props = frame.props_mut();
    props.candidate_index = Some(index);
    props.kernel = Some(kernel);
    props.descale_width = Some(width);
    props.descale_height = Some(height);
    frame
}

pub struct CandidateGenerator;

impl CandidateGenerator {
    /// Validates the request and builds the candidate clips, kernel-major.
    /// No frame is requested here.
    pub fn generate(
        source: &SharedSource,
        request: &DescaleRequest,
    ) -> FrameResult<Vec<Candidate>> {
        let info = source.info();
        let (src_width, src_height) = info.fixed_dimensions()?;
        if info.format != FrameFormat::GRAYS {
            return Err(FrameError::format_mismatch(
                FrameFormat::GRAYS.to_string(),
                info.format.to_string(),
            ));
        }
        if request.kernels.is_empty() {
            return Err(FrameError::configuration("at least one kernel is required"));
        }
        let resolutions = request.resolutions(src_width, src_height)?;
        let multi = request.kernels.len() * resolutions.len() > 1;

        for &(width, height) in &resolutions {
            if width == 0 || height == 0 {
                return Err(FrameError::configuration(format!(
                    "target resolution {width}x{height} has a zero dimension"
                )));
            }
            if width > src_width || height > src_height {
                return Err(FrameError::configuration(format!(
                    "target {width}x{height} exceeds the source {src_width}x{src_height}"
                )));
            }
            if multi && height >= src_height {
                return Err(FrameError::configuration(format!(
                    "target height {height} must be below the source height {src_height} \
                     when comparing several candidates"
                )));
            }
        }

        let mut candidates = Vec::with_capacity(request.kernels.len() * resolutions.len());
        for kernel in &request.kernels {
            for &(width, height) in &resolutions {
                let index = candidates.len();
                candidates.push(Self::build(
                    source,
                    info,
                    kernel.clone(),
                    index,
                    (width, height),
                    request.shift,
                ));
                log::debug!(
                    "candidate {index}: {} {width}x{height} shift {:?}",
                    kernel.name(),
                    request.shift
                );
            }
        }
        Ok(candidates)
    }

    fn build(
        source: &SharedSource,
        info: ClipInfo,
        kernel: SharedKernel,
        index: usize,
        (width, height): (u32, u32),
        shift: Shift,
    ) -> Candidate {
        let (src_width, src_height) = (info.width.unwrap_or(0), info.height.unwrap_or(0));
        let name = kernel.name();

        let descale_kernel = kernel.clone();
        let descaled = MapSource::shared(
            source.clone(),
            info.with_dimensions(width, height),
            move |_, frame| {
                let plane = descale_kernel.descale(
                    frame.luma(),
                    width as usize,
                    height as usize,
                    shift,
                )?;
                let out = Frame::gray(frame.format(), plane)?;
                Ok(tag(out, index, name, width, height))
            },
        );
        let descaled = CachedSource::shared(descaled);

        let rescale_kernel = kernel.clone();
        let rescaled = MapSource::shared(descaled.clone(), info, move |_, frame| {
            let plane = rescale_kernel.scale(
                frame.luma(),
                src_width as usize,
                src_height as usize,
                shift,
            )?;
            let out = Frame::gray(frame.format(), plane)?.with_props(frame.props().clone());
            Ok(out)
        });
        let rescaled = CachedSource::shared(rescaled);

        let diff_source = source.clone();
        let diff = MapSource::shared(rescaled.clone(), info, move |n, rescaled| {
            let original = diff_source.frame(n)?;
            let plane = abs_diff(original.luma(), rescaled.luma())?;
            let statistic = plane_stats_average(&plane, rescaled.format().peak_value());
            let mut out = Frame::gray(rescaled.format(), plane)?;
            let props = out.props_mut();
            props.statistic = Some(statistic);
            Ok(tag(out, index, name, width, height))
        });

        Candidate {
            index,
            kernel,
            width,
            height,
            descaled,
            rescaled,
            diff,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use descale_fast_kernels::FilterKernel;
    use descale_fast_types::{Plane, VecSource};

    use super::*;

    fn source(width: usize, height: usize) -> SharedSource {
        let plane = Plane::from_fn(width, height, |x, y| ((x + y) % 5) as f32 / 5.0).unwrap();
        VecSource::shared(vec![Frame::gray(FrameFormat::GRAYS, plane).unwrap()]).unwrap()
    }

    fn request(heights: Vec<u32>, kernels: Vec<FilterKernel>) -> DescaleRequest {
        DescaleRequest {
            heights,
            widths: None,
            kernels: kernels
                .into_iter()
                .map(|k| Arc::new(k) as SharedKernel)
                .collect(),
            shift: (0.0, 0.0),
        }
    }

    #[test]
    fn widths_follow_the_aspect_ratio() {
        let req = request(vec![720, 540], vec![FilterKernel::CATROM]);
        assert_eq!(
            req.resolutions(1920, 1080).unwrap(),
            vec![(1280, 720), (960, 540)]
        );
    }

    #[test]
    fn candidates_are_kernel_major() {
        let req = request(vec![8, 6], vec![FilterKernel::CATROM, FilterKernel::Bilinear]);
        let candidates = CandidateGenerator::generate(&source(16, 12), &req).unwrap();
        let order: Vec<_> = candidates
            .iter()
            .map(|c| (c.index(), c.kernel_name(), c.height()))
            .collect();
        assert_eq!(
            order,
            vec![
                (0, "catrom", 8),
                (1, "catrom", 6),
                (2, "bilinear", 8),
                (3, "bilinear", 6),
            ]
        );
    }

    #[test]
    fn invalid_requests_fail_before_any_frame() {
        let clip = source(16, 12);
        assert!(CandidateGenerator::generate(&clip, &request(vec![8], vec![])).is_err());
        let no_heights = request(vec![], vec![FilterKernel::CATROM]);
        assert!(CandidateGenerator::generate(&clip, &no_heights).is_err());
        let mut mismatched = request(vec![8, 6], vec![FilterKernel::CATROM]);
        mismatched.widths = Some(vec![10]);
        assert!(CandidateGenerator::generate(&clip, &mismatched).is_err());
        let too_tall = request(vec![12, 6], vec![FilterKernel::CATROM]);
        assert!(CandidateGenerator::generate(&clip, &too_tall).is_err());
        let single_full = request(vec![12], vec![FilterKernel::CATROM]);
        assert!(CandidateGenerator::generate(&clip, &single_full).is_ok());
    }

    #[test]
    fn diff_frames_carry_the_statistic() {
        let req = request(vec![8], vec![FilterKernel::CATROM]);
        let candidates = CandidateGenerator::generate(&source(16, 12), &req).unwrap();
        let diff = candidates[0].diff().frame(0).unwrap();
        let props = diff.props();
        assert_eq!(props.descale_height, Some(8));
        assert_eq!(props.candidate_index, Some(0));
        assert_eq!(props.kernel, Some("catrom"));
        let statistic = props.statistic.unwrap();
        assert!((0.0..=1.0).contains(&statistic));
        assert_eq!(candidates[0].descaled().info().height, Some(8));
    }
}
