use std::path::Path;

use descale_fast_engine::{CandidateStat, Selection, SelectionRecord};
use descale_fast_types::Frame;
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Serialize, Clone)]
pub struct CandidateJsonRecord {
    pub index: usize,
    pub kernel: &'static str,
    pub descale_height: u32,
    pub statistic: f64,
    pub score: f64,
}

impl From<&CandidateStat> for CandidateJsonRecord {
    fn from(stat: &CandidateStat) -> Self {
        Self {
            index: stat.index,
            kernel: stat.kernel,
            descale_height: stat.descale_height,
            statistic: stat.statistic,
            score: stat.score,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct FrameJsonRecord {
    pub frame_index: usize,
    pub input: String,
    pub output: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descale_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descale_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistic: Option<f64>,
    pub rejected: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<CandidateJsonRecord>,
}

impl FrameJsonRecord {
    pub fn new(record: &SelectionRecord, frame: &Frame, input: &Path, output: &Path) -> Self {
        let props = frame.props();
        let winner = match record.selection {
            Selection::Candidate(index) => Some(index),
            Selection::Rejected => None,
        };
        Self {
            frame_index: record.frame_index,
            input: input.display().to_string(),
            output: output.display().to_string(),
            width: frame.width(),
            height: frame.height(),
            winner,
            kernel: props.kernel,
            descale_width: props.descale_width,
            descale_height: props.descale_height,
            statistic: props.statistic,
            rejected: props.rejected,
            candidates: record.stats.iter().map(CandidateJsonRecord::from).collect(),
        }
    }
}

pub async fn write_report(path: &Path, records: &[FrameJsonRecord]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let encoded = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(path, encoded).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use descale_fast_types::{FrameFormat, FrameProps, Plane};

    use super::*;

    #[test]
    fn rejected_frames_have_no_winner() {
        let frame = Frame::gray(FrameFormat::GRAY8, Plane::filled(4, 2, 0.0).unwrap())
            .unwrap()
            .with_props(FrameProps {
                rejected: true,
                statistic: Some(0.2),
                ..FrameProps::default()
            });
        let record = SelectionRecord {
            frame_index: 3,
            stats: vec![CandidateStat {
                index: 0,
                kernel: "catrom",
                descale_height: 1,
                statistic: 0.2,
                score: 1.5,
            }],
            winner: 0,
            selection: Selection::Rejected,
        };
        let json = FrameJsonRecord::new(&record, &frame, Path::new("in.png"), Path::new("o.png"));
        let value = serde_json::to_value(&json).unwrap();
        assert_eq!(value["frame_index"], 3);
        assert_eq!(value["rejected"], true);
        assert!(value.get("winner").is_none());
        assert_eq!(value["candidates"][0]["kernel"], "catrom");
        assert_eq!(value["width"], 4);
    }
}
