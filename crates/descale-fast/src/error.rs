use std::fmt;
use std::path::PathBuf;

use descale_fast_types::FrameError;

use crate::settings::ConfigError;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Frame(FrameError),
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    Encode(image::ImageError),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "{err}"),
            AppError::Frame(err) => write!(f, "{err}"),
            AppError::Image { path, source } => {
                write!(f, "failed to load image {}: {}", path.display(), source)
            }
            AppError::Encode(err) => write!(f, "encoding error: {err}"),
            AppError::Json(err) => write!(f, "JSON error: {err}"),
            AppError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Frame(err) => Some(err),
            AppError::Image { source, .. } => Some(source),
            AppError::Encode(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<FrameError> for AppError {
    fn from(value: FrameError) -> Self {
        AppError::Frame(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Json(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}
