use std::sync::Arc;

use descale_fast_types::{ClipInfo, Frame, FrameError, FrameResult, FrameSource, SharedSource};

use crate::candidate::Candidate;

const STATISTIC_FLOOR: f64 = 1e-12;

/// Ranks a candidate: the further its height sits below the source, and the
/// lower its error, the higher the score.
pub fn score(source_height: u32, descale_height: u32, statistic: f64) -> f64 {
    let height_log = (f64::from(source_height) - f64::from(descale_height)).log2();
    let inverse_error = (1.0 / statistic.max(STATISTIC_FLOOR)).round_ties_even();
    height_log * inverse_error.powf(0.2)
}

/// Statistic observed for one candidate at one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateStat {
    pub index: usize,
    pub kernel: &'static str,
    pub descale_height: u32,
    pub statistic: f64,
    pub score: f64,
}

/// Reads the statistic a candidate's diff frame carries. A diff without one
/// cannot be ranked.
fn candidate_stat(
    candidate: &Candidate,
    diff: &Frame,
    source_height: u32,
) -> FrameResult<CandidateStat> {
    let props = diff.props();
    let statistic = props.statistic.ok_or_else(|| {
        FrameError::invalid_frame(format!(
            "diff frame of candidate {} carries no statistic",
            candidate.index()
        ))
    })?;
    let descale_height = props.descale_height.unwrap_or(candidate.height());
    Ok(CandidateStat {
        index: props.candidate_index.unwrap_or(candidate.index()),
        kernel: candidate.kernel_name(),
        descale_height,
        statistic,
        score: score(source_height, descale_height, statistic),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Candidate(usize),
    /// The winner exceeded the rejection threshold; the source frame is used.
    Rejected,
}

/// Everything the selector saw and decided for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRecord {
    pub frame_index: usize,
    /// Empty in single-candidate mode, where no statistic is consulted.
    pub stats: Vec<CandidateStat>,
    pub winner: usize,
    pub selection: Selection,
}

/// Picks the highest score, first index on ties, then applies the optional
/// rejection threshold. `stats` must not be empty.
pub fn select_best(stats: &[CandidateStat], threshold: f64) -> Option<(usize, Selection)> {
    let mut best: Option<&CandidateStat> = None;
    for stat in stats {
        match best {
            Some(current) if stat.score <= current.score => {}
            _ => best = Some(stat),
        }
    }
    let best = best?;
    let selection = if threshold != 0.0 && best.statistic > threshold {
        Selection::Rejected
    } else {
        Selection::Candidate(best.index)
    };
    Some((best.index, selection))
}

/// Chooses, frame by frame, which candidate's descaled frame is emitted.
pub struct ScoreSelector {
    source: SharedSource,
    candidates: Arc<[Candidate]>,
    threshold: f64,
    source_height: u32,
}

impl ScoreSelector {
    pub fn new(
        source: SharedSource,
        candidates: Arc<[Candidate]>,
        threshold: f64,
    ) -> FrameResult<Self> {
        if candidates.is_empty() {
            return Err(FrameError::configuration("selector needs at least one candidate"));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(FrameError::configuration(format!(
                "rejection threshold must be a non-negative number, got {threshold}"
            )));
        }
        let (_, source_height) = source.info().fixed_dimensions()?;
        Ok(Self {
            source,
            candidates,
            threshold,
            source_height,
        })
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn is_multi(&self) -> bool {
        self.candidates.len() > 1
    }

    fn observe(&self, index: usize) -> FrameResult<Vec<CandidateStat>> {
        self.candidates
            .iter()
            .map(|candidate| {
                let diff = candidate.diff().frame(index)?;
                candidate_stat(candidate, &diff, self.source_height)
            })
            .collect()
    }

    /// Decision for frame `index`, computing candidate statistics only in
    /// multi-candidate mode.
    pub fn record(&self, index: usize) -> FrameResult<SelectionRecord> {
        if !self.is_multi() {
            return Ok(SelectionRecord {
                frame_index: index,
                stats: Vec::new(),
                winner: 0,
                selection: Selection::Candidate(0),
            });
        }
        let stats = self.observe(index)?;
        let (winner, selection) = select_best(&stats, self.threshold)
            .ok_or_else(|| FrameError::configuration("selector needs at least one candidate"))?;
        log::debug!("frame {index}: candidate {winner} wins ({selection:?})");
        Ok(SelectionRecord {
            frame_index: index,
            stats,
            winner,
            selection,
        })
    }

    /// Returns the frame to emit for `index` together with the decision.
    pub fn select_best(&self, index: usize) -> FrameResult<(Frame, SelectionRecord)> {
        let record = self.record(index)?;
        let statistic = record
            .stats
            .iter()
            .find(|stat| stat.index == record.winner)
            .map(|stat| stat.statistic);

        let frame = match record.selection {
            Selection::Candidate(winner) => {
                let mut frame = self.candidates[winner].descaled().frame(index)?;
                frame.props_mut().statistic = statistic;
                frame
            }
            Selection::Rejected => {
                log::warn!(
                    "frame {index}: best statistic {:.6} above threshold {}, keeping source",
                    statistic.unwrap_or_default(),
                    self.threshold
                );
                let mut frame = self.source.frame(index)?;
                let props = frame.props_mut();
                props.rejected = true;
                props.statistic = statistic;
                frame
            }
        };
        Ok((frame, record))
    }

    /// Clip view of the selection. Dimensions are fixed only when every
    /// possible output shares them.
    pub fn clip(selector: &Arc<Self>) -> SharedSource {
        let source_info = selector.source.info();
        let mut dims: Vec<(u32, u32)> = selector
            .candidates
            .iter()
            .map(|candidate| (candidate.width(), candidate.height()))
            .collect();
        if selector.is_multi() && selector.threshold != 0.0 {
            if let (Some(width), Some(height)) = (source_info.width, source_info.height) {
                dims.push((width, height));
            }
        }
        if !selector.is_multi() {
            dims.truncate(1);
        }
        dims.sort_unstable();
        dims.dedup();
        let info = match dims.as_slice() {
            [(width, height)] => source_info.with_dimensions(*width, *height),
            _ => ClipInfo::variable(source_info.format, source_info.num_frames),
        };
        Arc::new(SelectedClip {
            selector: selector.clone(),
            info,
        })
    }
}

struct SelectedClip {
    selector: Arc<ScoreSelector>,
    info: ClipInfo,
}

impl FrameSource for SelectedClip {
    fn info(&self) -> ClipInfo {
        self.info
    }

    fn frame(&self, index: usize) -> FrameResult<Frame> {
        self.info.check_index(index)?;
        let (frame, _) = self.selector.select_best(index)?;
        Ok(frame.with_frame_index(Some(index as u64)))
    }
}

#[cfg(test)]
mod tests {
    use descale_fast_kernels::{FilterKernel, SharedKernel};
    use descale_fast_types::{FrameFormat, FrameProps, Plane, VecSource};

    use super::*;
    use crate::candidate::{CandidateGenerator, DescaleRequest};

    fn stat(index: usize, descale_height: u32, statistic: f64) -> CandidateStat {
        CandidateStat {
            index,
            kernel: "catrom",
            descale_height,
            statistic,
            score: score(1080, descale_height, statistic),
        }
    }

    #[test]
    fn score_matches_reference_value() {
        let value = score(1080, 720, 0.01);
        let expected = 360f64.log2() * 100f64.powf(0.2);
        assert!((value - expected).abs() < 1e-12);
        assert!((value - 21.3).abs() < 0.05, "score {value}");
    }

    #[test]
    fn zero_statistic_is_floored() {
        assert!(score(1080, 720, 0.0).is_finite());
    }

    #[test]
    fn lower_error_wins_at_equal_heights() {
        let stats = [stat(0, 720, 0.02), stat(1, 720, 0.01)];
        assert_eq!(select_best(&stats, 0.0), Some((1, Selection::Candidate(1))));
    }

    #[test]
    fn ties_go_to_the_first_candidate() {
        let stats = [stat(0, 720, 0.01), stat(1, 720, 0.01)];
        assert_eq!(select_best(&stats, 0.0), Some((0, Selection::Candidate(0))));
    }

    #[test]
    fn threshold_rejects_a_poor_winner() {
        let stats = [stat(0, 720, 0.2), stat(1, 810, 0.3)];
        assert_eq!(select_best(&stats, 0.1), Some((0, Selection::Rejected)));
        assert_eq!(select_best(&stats, 0.0), Some((0, Selection::Candidate(0))));
        assert_eq!(select_best(&[], 0.0), None);
    }

    #[test]
    fn diff_without_statistic_is_an_error() {
        let plane = Plane::from_fn(8, 6, |x, y| ((x + y) % 3) as f32 / 3.0).unwrap();
        let frame = Frame::gray(FrameFormat::GRAYS, plane).unwrap();
        let source = VecSource::shared(vec![frame.clone()]).unwrap();
        let request = DescaleRequest {
            heights: vec![4],
            widths: None,
            kernels: vec![Arc::new(FilterKernel::CATROM) as SharedKernel],
            shift: (0.0, 0.0),
        };
        let candidates = CandidateGenerator::generate(&source, &request).unwrap();

        let err = candidate_stat(&candidates[0], &frame, 6).unwrap_err();
        assert!(matches!(err, FrameError::InvalidFrame { .. }));

        let measured = frame.with_props(FrameProps {
            statistic: Some(0.25),
            ..FrameProps::default()
        });
        let stat = candidate_stat(&candidates[0], &measured, 6).unwrap();
        assert_eq!(stat.statistic, 0.25);
        assert_eq!(stat.descale_height, 4);
    }
}
