use clap::Parser;
use hr_core::core::services::config_service::ConfigService;
use hr_core::error::AppError;
use hr_core::storage::config::Config;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::dispatcher::Dispatcher;
use cli::main_types::Cli;

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "hr_cli=debug,hr_core=debug"
    } else {
        "hr_cli=info,hr_core=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Diagnostics go to stderr so table and JSON output stay clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// One-line failure summary prefixed with the severity marker.
fn failure_line(error: &AppError) -> String {
    format!("{} Error: {}", error.severity().emoji(), error.display_friendly())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config_dir.as_deref().map(Config::file_in);
    let config_service = match ConfigService::load(config_path) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("{} Error loading config: {}", err.severity().emoji(), err.display_friendly());
            std::process::exit(1);
        }
    };

    if let Some(config_dir) = &cli.config_dir {
        log::debug!("Using config directory: {}", config_dir.display());
    }

    let mut dispatcher = Dispatcher::new(config_service, cli.verbose, cli.token);

    if let Err(e) = dispatcher.dispatch(cli.command).await {
        log::debug!("Command failed: {:?}", e);
        if !dispatcher.already_reported() {
            eprintln!("{}", failure_line(&e));
        }
        if let Some(hint) = e.troubleshooting_hint() {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hr_core::error::{AuthError, UtilsError};

    #[test]
    fn test_failure_line_carries_severity_marker() {
        let denied = AppError::Auth(AuthError::NotSignedIn);
        assert!(failure_line(&denied).starts_with("❌ Error: "));

        let invalid = AppError::Utils(UtilsError::Validation {
            message: "Code and name are required".to_string(),
        });
        assert_eq!(failure_line(&invalid), "ℹ️ Error: Code and name are required");
    }
}
