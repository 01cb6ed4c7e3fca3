use std::path::{Path, PathBuf};

use descale_fast_engine::{descale, into_stream};
use descale_fast_types::VecSource;
use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};
use tokio::task::{self, JoinError};
use tokio_stream::StreamExt;

pub mod cli;
pub mod error;
pub mod io;
mod progress;
pub mod report;
pub mod settings;

pub use error::AppError;

use report::{FrameJsonRecord, write_report};
use settings::EffectiveSettings;

/// Logs to stderr at `level` unless `RUST_LOG` says otherwise.
pub fn setup_logging(level: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(level)?.log_to_stderr().start()
}

#[derive(Debug)]
pub struct RunSummary {
    pub frames: usize,
    pub rejected: usize,
    pub output_dir: PathBuf,
    pub report: Option<PathBuf>,
}

fn join_error(err: JoinError) -> AppError {
    AppError::Io(std::io::Error::other(format!("join error: {err}")))
}

fn output_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame_{index:05}.png"))
}

/// Loads the inputs as one clip, descales it and writes every output frame
/// as PNG, plus the selection report when one is configured.
pub async fn run(settings: &EffectiveSettings) -> Result<RunSummary, AppError> {
    let inputs = settings.inputs.clone();
    let frames = task::spawn_blocking(move || {
        inputs
            .iter()
            .map(|path| io::load_frame(path))
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(join_error)??;
    let source = VecSource::shared(frames)?;
    let output = descale(source, &settings.descale)?;

    tokio::fs::create_dir_all(&settings.output_dir).await?;
    let total = output.clip.num_frames();
    let progress = progress::frame_bar(total as u64);
    let mut stream = into_stream(output.clip.clone(), settings.channel_capacity);
    let mut records = Vec::new();
    let mut processed = 0usize;
    let mut rejected = 0usize;

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                progress.abandon_with_message(format!("failed after {processed} frames"));
                return Err(err.into());
            }
        };
        let index = frame.frame_index().map_or(processed, |i| i as usize);
        let path = output_path(&settings.output_dir, index);

        let encode_frame = frame.clone();
        let encoded = task::spawn_blocking(move || io::encode_png(&encode_frame))
            .await
            .map_err(join_error)??;
        tokio::fs::write(&path, encoded).await?;

        if frame.props().rejected {
            rejected += 1;
        }
        if settings.report.is_some() {
            let selector = output.selector.clone();
            let record = task::spawn_blocking(move || selector.record(index))
                .await
                .map_err(join_error)??;
            let input = settings.inputs.get(index).cloned().unwrap_or_default();
            records.push(FrameJsonRecord::new(&record, &frame, &input, &path));
        }

        processed += 1;
        progress.inc(1);
    }
    progress.finish_with_message(format!("{rejected} rejected"));

    if let Some(report) = &settings.report {
        write_report(report, &records).await?;
        log::info!("wrote selection report for {} frames", records.len());
    }

    Ok(RunSummary {
        frames: processed,
        rejected,
        output_dir: settings.output_dir.clone(),
        report: settings.report.clone(),
    })
}
