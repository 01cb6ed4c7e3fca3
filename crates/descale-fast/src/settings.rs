use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use descale_fast_engine::DescaleConfig;
use descale_fast_kernels::{FilterKernel, SharedKernel, SharedUpscaler};
use descale_fast_mask::{BlurSpec, DetailMaskParams, ErrorMaskParams, MaskSource};
use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

use crate::cli::{CliArgs, CliSources, MaskKind};

const CONFIG_FILENAME: &str = "descale-fast.toml";
const DEFAULT_OUTPUT_DIR: &str = "descaled";
const DEFAULT_CHANNEL_CAPACITY: usize = 4;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    descale: Option<DescaleFileConfig>,
    detail_mask: Option<DetailMaskFileConfig>,
    error_mask: Option<ErrorMaskFileConfig>,
    output: Option<OutputFileConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DescaleFileConfig {
    heights: Option<Vec<u32>>,
    widths: Option<Vec<u32>>,
    kernels: Option<Vec<String>>,
    upscaler: Option<String>,
    threshold: Option<f64>,
    shift: Option<(f64, f64)>,
    mask: Option<String>,
    show_mask: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailMaskFileConfig {
    threshold: Option<f32>,
    inflate: Option<u32>,
    expand: Option<(i32, i32)>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorMaskFileConfig {
    thresholds: Option<Vec<f32>>,
    expands: Option<(u32, u32, u32)>,
    blur: Option<BlurValue>,
    bw_bias: Option<f32>,
    temporal_radius: Option<u32>,
}

/// `blur = 3` means a box radius, `blur = 1.5` a gaussian sigma.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BlurValue {
    Radius(u32),
    Sigma(f32),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OutputFileConfig {
    dir: Option<String>,
    report: Option<String>,
    channel_capacity: Option<usize>,
    log_level: Option<String>,
}

#[derive(Debug)]
pub struct EffectiveSettings {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub report: Option<PathBuf>,
    pub descale: DescaleConfig,
    pub channel_capacity: usize,
    pub log_level: String,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config file {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config file {}: {}", path.display(), source)
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
        }
    }
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path)
}

fn read_config(path: PathBuf) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok((config, Some(path)))
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = path.to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        return read_config(path);
    }

    for candidate in [project_config_path(), default_config_path()].into_iter().flatten() {
        if candidate.exists() {
            return read_config(candidate);
        }
    }
    Ok((FileConfig::default(), None))
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let config_dir = config_path
        .as_ref()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));
    let path = config_path.as_ref();

    let FileConfig {
        descale: file_descale,
        detail_mask: file_detail,
        error_mask: file_error,
        output: file_output,
    } = file;
    let file_descale = file_descale.unwrap_or_default();
    let file_output = file_output.unwrap_or_default();

    let heights = if cli.heights.is_empty() {
        file_descale.heights.unwrap_or_else(|| vec![720])
    } else {
        cli.heights.clone()
    };
    let widths = if cli.widths.is_empty() {
        file_descale.widths.filter(|widths| !widths.is_empty())
    } else {
        Some(cli.widths.clone())
    };
    if let Some(widths) = &widths {
        if widths.len() != heights.len() {
            return Err(ConfigError::InvalidValue {
                path: path.filter(|_| cli.widths.is_empty()).cloned(),
                field: "widths",
                value: format!("{} widths for {} heights", widths.len(), heights.len()),
            });
        }
    }

    let kernels = if cli.kernels.is_empty() {
        let names = file_descale
            .kernels
            .unwrap_or_else(|| vec!["catrom".to_string()]);
        parse_kernels(&names, path)?
    } else {
        parse_kernels(&cli.kernels, None)?
    };

    let upscaler = match normalize_string(cli.upscaler.clone()) {
        Some(value) => parse_upscaler(&value, None)?,
        None => match normalize_string(file_descale.upscaler) {
            Some(value) => parse_upscaler(&value, path)?,
            None => Some(Arc::new(FilterKernel::Spline36) as SharedUpscaler),
        },
    };

    let threshold = match (cli.threshold, file_descale.threshold) {
        (Some(value), _) => validate_threshold(value, None)?,
        (None, Some(value)) => validate_threshold(value, path)?,
        (None, None) => 0.0,
    };

    let (file_shift_x, file_shift_y) = file_descale.shift.unwrap_or((0.0, 0.0));
    let shift = (
        cli.shift_x.unwrap_or(file_shift_x),
        cli.shift_y.unwrap_or(file_shift_y),
    );

    let mut mask_kind = cli.mask;
    if !sources.mask_from_cli {
        if let Some(value) = normalize_string(file_descale.mask) {
            mask_kind = parse_mask_kind(&value, path)?;
        }
    }
    let mask = build_mask(mask_kind, file_detail, file_error, path)?;

    let mut show_mask = cli.show_mask;
    if !sources.show_mask_from_cli {
        if let Some(value) = file_descale.show_mask {
            show_mask = value;
        }
    }

    let output_dir = match cli.output_dir.clone() {
        Some(dir) => expand_pathbuf(dir),
        None => normalize_string(file_output.dir)
            .and_then(|dir| resolve_path_from_config(dir, config_dir.as_deref()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
    };
    let report = match cli.report.clone() {
        Some(report) => Some(expand_pathbuf(report)),
        None => normalize_string(file_output.report)
            .and_then(|report| resolve_path_from_config(report, config_dir.as_deref())),
    };

    let mut channel_capacity = DEFAULT_CHANNEL_CAPACITY;
    match (cli.channel_capacity, file_output.channel_capacity) {
        (Some(0), _) => {
            return Err(ConfigError::InvalidValue {
                path: None,
                field: "channel_capacity",
                value: "0".to_string(),
            });
        }
        (Some(value), _) => channel_capacity = value,
        (None, Some(0)) => {
            return Err(ConfigError::InvalidValue {
                path: config_path,
                field: "channel_capacity",
                value: "0".to_string(),
            });
        }
        (None, Some(value)) => channel_capacity = value,
        (None, None) => {}
    }

    let mut log_level = cli.log_level.clone();
    if !sources.log_level_from_cli {
        if let Some(value) = normalize_string(file_output.log_level) {
            log_level = value;
        }
    }

    Ok(EffectiveSettings {
        inputs: cli.inputs.iter().cloned().map(expand_pathbuf).collect(),
        output_dir,
        report,
        descale: DescaleConfig {
            heights,
            widths,
            kernels,
            upscaler,
            threshold,
            shift,
            mask,
            show_mask,
        },
        channel_capacity,
        log_level,
        config_path,
    })
}

fn build_mask(
    kind: MaskKind,
    detail: Option<DetailMaskFileConfig>,
    error: Option<ErrorMaskFileConfig>,
    path: Option<&PathBuf>,
) -> Result<MaskSource, ConfigError> {
    match kind {
        MaskKind::None => Ok(MaskSource::None),
        MaskKind::Detail => {
            let detail = detail.unwrap_or_default();
            let defaults = DetailMaskParams::default();
            let params = DetailMaskParams {
                threshold: detail.threshold.unwrap_or(defaults.threshold),
                inflate: detail.inflate.unwrap_or(defaults.inflate),
                expand: detail.expand.unwrap_or(defaults.expand),
            };
            params.validate().map_err(|_| ConfigError::InvalidValue {
                path: path.cloned(),
                field: "detail_mask.threshold",
                value: params.threshold.to_string(),
            })?;
            Ok(MaskSource::DefaultDetail(params))
        }
        MaskKind::Error => {
            let error = error.unwrap_or_default();
            let defaults = ErrorMaskParams::default();
            let blur = match error.blur {
                Some(value) => parse_blur(value, path)?,
                None => defaults.blur(),
            };
            let thresholds = error
                .thresholds
                .unwrap_or_else(|| defaults.thresholds().to_vec());
            let rendered = format!("{thresholds:?}");
            let params = ErrorMaskParams::new(
                thresholds,
                error.expands.unwrap_or(defaults.expands()),
                blur,
                error.bw_bias.unwrap_or(defaults.bw_bias()),
                error.temporal_radius.unwrap_or(defaults.temporal_radius()),
            )
            .map_err(|err| ConfigError::InvalidValue {
                path: path.cloned(),
                field: "error_mask",
                value: format!("{rendered} ({err})"),
            })?;
            Ok(MaskSource::DefaultError(params))
        }
    }
}

fn parse_blur(value: BlurValue, path: Option<&PathBuf>) -> Result<BlurSpec, ConfigError> {
    let invalid = |value: String| ConfigError::InvalidValue {
        path: path.cloned(),
        field: "error_mask.blur",
        value,
    };
    match value {
        BlurValue::Radius(radius) => Ok(BlurSpec::Box(radius)),
        BlurValue::Sigma(sigma) if sigma.is_finite() && sigma >= 0.0 => {
            Ok(BlurSpec::Gauss(sigma))
        }
        BlurValue::Sigma(sigma) => Err(invalid(sigma.to_string())),
        BlurValue::Text(text) => text.parse().map_err(|_| invalid(text)),
    }
}

fn parse_kernels(
    names: &[String],
    path: Option<&PathBuf>,
) -> Result<Vec<SharedKernel>, ConfigError> {
    if names.is_empty() {
        return Err(ConfigError::InvalidValue {
            path: path.cloned(),
            field: "kernels",
            value: "[]".to_string(),
        });
    }
    names
        .iter()
        .map(|name| {
            name.parse::<FilterKernel>()
                .map(|kernel| Arc::new(kernel) as SharedKernel)
                .map_err(|_| ConfigError::InvalidValue {
                    path: path.cloned(),
                    field: "kernel",
                    value: name.clone(),
                })
        })
        .collect()
}

fn parse_upscaler(
    value: &str,
    path: Option<&PathBuf>,
) -> Result<Option<SharedUpscaler>, ConfigError> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value
        .parse::<FilterKernel>()
        .map(|kernel| Some(Arc::new(kernel) as SharedUpscaler))
        .map_err(|_| ConfigError::InvalidValue {
            path: path.cloned(),
            field: "upscaler",
            value: value.to_string(),
        })
}

fn validate_threshold(value: f64, path: Option<&PathBuf>) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            path: path.cloned(),
            field: "threshold",
            value: value.to_string(),
        })
    }
}

fn parse_mask_kind(value: &str, path: Option<&PathBuf>) -> Result<MaskKind, ConfigError> {
    MaskKind::from_str(value, true).map_err(|_| ConfigError::InvalidValue {
        path: path.cloned(),
        field: "mask",
        value: value.to_string(),
    })
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "descale-fast", "descale-fast")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir().ok().map(|dir| dir.join(CONFIG_FILENAME))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn expand_pathbuf(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => expand_home_path(s),
        None => path,
    }
}

fn resolve_path_from_config(value: String, base: Option<&Path>) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_home_path(trimmed);
    match base {
        Some(base) if !expanded.is_absolute() => Some(base.join(expanded)),
        _ => Some(expanded),
    }
}

fn expand_home_path(value: &str) -> PathBuf {
    if value == "~" {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().to_path_buf();
        }
    } else if let Some(stripped) = value.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(stripped);
        }
    }
    PathBuf::from(value)
}
