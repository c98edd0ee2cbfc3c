use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::Bank;
use crate::emulation::{spawn_participants, Emulation};
use crate::error::{Result, StampedeError};
use crate::exchange::RestExchangeClient;
use crate::model::floor_4dp;
use crate::report::WealthReport;
use crate::tokens::TokenCache;

#[derive(Parser)]
#[command(name = "stampede")]
#[command(version = "0.1.0")]
#[command(about = "Synthetic market-participant swarm for exercising a trading REST API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory
    #[arg(short, long, default_value = "config")]
    pub config: String,

    /// Dry run mode (no requests leave the process)
    #[arg(long)]
    pub dry_run: bool,

    /// Override the exchange base URL
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create accounts, authenticate, and push starting balances
    Seed {
        /// Create a fresh instrument instead of using the configured one
        #[arg(long)]
        new_instrument: bool,
    },
    /// Authenticate every account and rewrite the token cache
    Auth,
    /// Run the emulation loop
    Run {
        /// Override the number of simulated days
        #[arg(long)]
        days: Option<u32>,
        /// Override the number of participants
        #[arg(long)]
        participants: Option<u32>,
    },
    /// Pretty-print an existing wealth report
    Report {
        /// Report file; defaults to the configured path
        #[arg(long)]
        file: Option<String>,
    },
}

/// Instrument to trade: the configured id wins, then the id minted by a
/// previous `seed` and persisted in the token cache
fn resolve_instrument(config: &AppConfig, cache: Option<&TokenCache>) -> Result<u64> {
    config
        .api
        .instrument_id
        .or_else(|| cache.and_then(|cache| cache.instrument_id()))
        .ok_or_else(|| {
            StampedeError::Validation(
                "no instrument configured: set api.instrument_id or run `seed` first".to_string(),
            )
        })
}

fn build_emulation(
    config: &AppConfig,
    instrument_id: u64,
) -> Result<Emulation<RestExchangeClient>> {
    let client = RestExchangeClient::new(
        &config.api.base_url,
        config.api.timeout_secs,
        config.dry_run.enabled,
    )?;

    let mut rng = match config.emulation.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let participants = spawn_participants(&mut rng, &config.api, &config.emulation);
    let bank = Bank::new(
        config.api.bank_email.clone(),
        config.api.password.clone(),
        floor_4dp(config.emulation.bank_assets),
    );

    Ok(Emulation::new(
        client,
        bank,
        participants,
        instrument_id,
        &config.emulation,
    ))
}

/// Create accounts, authenticate, optionally mint an instrument, and push
/// the drawn starting balances
pub async fn seed(config: &AppConfig, new_instrument: bool) -> Result<()> {
    let mut emulation = build_emulation(config, config.api.instrument_id.unwrap_or_default())?;

    emulation.create_accounts().await?;
    emulation.authenticate().await?;

    let mut cache = TokenCache::default();
    if new_instrument || config.api.instrument_id.is_none() {
        let name = format!("emulation #{}", Utc::now());
        let instrument_id = emulation.create_instrument(&name).await?;
        emulation.set_instrument(instrument_id);
        cache.set_instrument(instrument_id);
        info!(instrument_id, "created instrument");
    } else if let Some(instrument_id) = config.api.instrument_id {
        cache.set_instrument(instrument_id);
    }

    // Persist the instrument next to the tokens so a later `run` trades
    // the same instrument the balances below are pushed to
    emulation.export_tokens(&mut cache);
    cache.save(&config.paths.tokens_file)?;
    info!(path = %config.paths.tokens_file, "token cache written");

    emulation.push_initial_balances().await?;
    info!("starting balances pushed");
    Ok(())
}

/// Refresh every account's token and rewrite the cache
pub async fn auth(config: &AppConfig) -> Result<()> {
    // Keep the seeded instrument id when rewriting the cache
    let mut cache = TokenCache::load(&config.paths.tokens_file).unwrap_or_default();
    let instrument_id = resolve_instrument(config, Some(&cache)).unwrap_or_default();

    let mut emulation = build_emulation(config, instrument_id)?;
    emulation.authenticate().await?;

    emulation.export_tokens(&mut cache);
    cache.save(&config.paths.tokens_file)?;
    info!(path = %config.paths.tokens_file, "token cache written");
    Ok(())
}

/// Run the day loop and write the wealth report
pub async fn run(config: &AppConfig) -> Result<()> {
    let cache = match TokenCache::load(&config.paths.tokens_file) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(path = %config.paths.tokens_file, error = %e, "token cache unavailable");
            None
        }
    };

    let instrument_id = resolve_instrument(config, cache.as_ref())?;
    let mut emulation = build_emulation(config, instrument_id)?;

    let adopted = cache
        .as_ref()
        .map(|cache| emulation.adopt_tokens(cache))
        .unwrap_or(false);
    if !adopted {
        emulation.authenticate().await?;
    }

    // Reset every account to its drawn starting state before the loop,
    // so repeated runs start from the same wealth
    emulation.push_initial_balances().await?;

    let report = emulation.run().await?;
    report.save(&config.paths.report_file)?;
    info!(path = %config.paths.report_file, "wealth report written");

    println!("{}", report.summary_table());
    Ok(())
}

/// Render a previously written wealth report
pub fn report(config: &AppConfig, file: Option<&str>) -> Result<()> {
    let path = file.unwrap_or(&config.paths.report_file);
    let report = WealthReport::load(path)?;

    info!(
        run_id = %report.run_id,
        days = report.days,
        accounts = report.accounts.len(),
        "loaded wealth report"
    );
    println!("{}", report.summary_table());
    Ok(())
}
