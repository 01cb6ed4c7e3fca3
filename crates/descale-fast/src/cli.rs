use std::ffi::OsString;
use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum MaskKind {
    None,
    Detail,
    Error,
}

#[derive(Debug, Default)]
pub struct CliSources {
    pub mask_from_cli: bool,
    pub show_mask_from_cli: bool,
    pub log_level_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            mask_from_cli: value_from_cli(matches, "mask"),
            show_mask_from_cli: value_from_cli(matches, "show_mask"),
            log_level_from_cli: value_from_cli(matches, "log_level"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    match parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    }
}

pub fn parse_from<I, T>(args: I) -> Result<(CliArgs, CliSources), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = CliArgs::command().try_get_matches_from(args)?;
    let cli = CliArgs::from_arg_matches(&matches)?;
    let sources = CliSources::from_matches(&matches);
    Ok((cli, sources))
}

#[derive(Debug, Parser)]
#[command(
    name = "descale-fast",
    about = "Find the native resolution of upscaled frames and descale them",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Directory receiving one PNG per output frame
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write a JSON report of every per-frame selection
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Candidate descale height (repeatable)
    #[arg(long = "height", id = "heights", value_name = "PX")]
    pub heights: Vec<u32>,

    /// Candidate descale width, paired with --height by position (repeatable)
    #[arg(long = "width", id = "widths", value_name = "PX")]
    pub widths: Vec<u32>,

    /// Candidate kernel such as catrom, bilinear, lanczos3 (repeatable)
    #[arg(short = 'k', long = "kernel", id = "kernels", value_name = "NAME")]
    pub kernels: Vec<String>,

    /// Kernel used to upscale the descaled frames back, or "none"
    #[arg(long = "upscaler", value_name = "NAME")]
    pub upscaler: Option<String>,

    /// Keep the source frame when the best error exceeds this value (0 disables)
    #[arg(long = "threshold")]
    pub threshold: Option<f64>,

    /// Horizontal subpixel shift applied while descaling
    #[arg(long = "shift-x", allow_hyphen_values = true)]
    pub shift_x: Option<f64>,

    /// Vertical subpixel shift applied while descaling
    #[arg(long = "shift-y", allow_hyphen_values = true)]
    pub shift_y: Option<f64>,

    /// Mask protecting regions the descale cannot reproduce
    #[arg(long = "mask", id = "mask", value_enum, default_value_t = MaskKind::Detail)]
    pub mask: MaskKind,

    /// Write the mask instead of the descaled result
    #[arg(long = "show-mask", id = "show_mask")]
    pub show_mask: bool,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long = "log-level", id = "log_level", default_value = "info")]
    pub log_level: String,

    /// Frame queue capacity between the pipeline and the writer
    #[arg(
        long = "channel-capacity",
        id = "channel_capacity",
        value_parser = clap::value_parser!(usize)
    )]
    pub channel_capacity: Option<usize>,

    /// Input images, processed in order as one clip
    #[arg(required = true, value_name = "INPUTS")]
    pub inputs: Vec<PathBuf>,
}
