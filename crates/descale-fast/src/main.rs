use std::process::ExitCode;

use descale_fast::cli::parse_cli;
use descale_fast::settings::resolve_settings;
use descale_fast::{run, setup_logging};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let (cli, sources) = parse_cli();
    let settings = match resolve_settings(&cli, &sources) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("descale-fast: {err}");
            return ExitCode::FAILURE;
        }
    };

    let _logger = match setup_logging(&settings.log_level) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            None
        }
    };
    if let Some(path) = &settings.config_path {
        log::info!("loaded settings from {}", path.display());
    }

    match run(&settings).await {
        Ok(summary) => {
            println!(
                "wrote {} frame(s) to {}",
                summary.frames,
                summary.output_dir.display()
            );
            if summary.rejected > 0 {
                println!("{} frame(s) kept at source resolution", summary.rejected);
            }
            if let Some(report) = summary.report {
                println!("selection report written to {}", report.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("descale-fast: {err}");
            ExitCode::FAILURE
        }
    }
}
