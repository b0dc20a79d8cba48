use std::process::ExitCode;

use memory_relay::commands::{self, Command, USAGE};
use memory_relay::errors::AppError;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let invocation = match commands::parse_args(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(AppError::Validation { message, .. }) => {
            eprintln!("{}\n\n{}", message, USAGE);
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    // Logging comes up before the config loads so its warnings are kept.
    // RUST_LOG wins over the configured level.
    let level_from_env = std::env::var_os("RUST_LOG").is_some();
    if level_from_env {
        env_logger::Builder::from_default_env().init();
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Trace)
            .init();
        log::set_max_level(log::LevelFilter::Info);
    }

    let config = invocation.load_config()?;

    if !level_from_env {
        log::set_max_level(config.log_level_filter());
    }

    log::info!("Starting Memory Relay (endpoint: {})", config.endpoint_url);

    let summary = match invocation.command {
        Command::Upload(request) => {
            commands::upload_files(&config, request, invocation.json).await?
        }
        Command::Voice(request) => {
            commands::send_voice_recording(&config, request, invocation.json).await?
        }
        Command::ShowConfig => {
            commands::show_config(&config)?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    if summary.submitted == 0 && summary.rejected == 0 {
        log::warn!("Nothing was sent");
        return Ok(ExitCode::FAILURE);
    }

    if summary.all_succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
