use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use stampede::cli::{self, Cli, Commands};
use stampede::config::LoggingConfig;
use stampede::{AppConfig, StampedeError};

const DEFAULT_BASE_URL: &str = "http://client-api.dlbas.me/";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let mut config = match AppConfig::load_from(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "no usable config in '{}' ({}); falling back to built-in defaults",
                args.config, e
            );
            AppConfig::default_config(DEFAULT_BASE_URL, args.dry_run)
        }
    };

    if args.dry_run {
        config.dry_run.enabled = true;
    }
    if let Some(url) = &args.url {
        config.api.base_url = url.clone();
    }
    if let Commands::Run { days, participants } = &args.command {
        if let Some(days) = days {
            config.emulation.days = *days;
        }
        if let Some(participants) = participants {
            config.emulation.participants = *participants;
        }
    }

    init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        return Err(StampedeError::Validation(errors.join("; ")).into());
    }
    if config.dry_run.enabled {
        warn!("dry run enabled: no requests will leave the process");
    }

    match &args.command {
        Commands::Seed { new_instrument } => cli::seed(&config, *new_instrument).await?,
        Commands::Auth => cli::auth(&config).await?,
        Commands::Run { .. } => cli::run(&config).await?,
        Commands::Report { file } => cli::report(&config, file.as_deref())?,
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},stampede=debug", logging.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
