use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::model::SizingModel;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub emulation: EmulationConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dry_run: DryRunConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// REST endpoint of the exchange under test, e.g. "http://client-api.dlbas.me/"
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Instrument to trade; when absent, `seed` creates a fresh one
    #[serde(default)]
    pub instrument_id: Option<u64>,
    /// Shared password for all synthetic accounts
    #[serde(default = "default_password")]
    pub password: String,
    /// Mail domain for generated participant addresses
    #[serde(default = "default_email_domain")]
    pub email_domain: String,
    /// Local-part prefix for generated participant addresses
    #[serde(default = "default_email_prefix")]
    pub email_prefix: String,
    /// Account used as the liquidity provider
    #[serde(default = "default_bank_email")]
    pub bank_email: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_password() -> String {
    "abc123PPHUILA".to_string()
}

fn default_email_domain() -> String {
    "mail.ru".to_string()
}

fn default_email_prefix() -> String {
    "1bot".to_string()
}

fn default_bank_email() -> String {
    "bank1@mail.ru".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmulationConfig {
    /// Number of simulated trading days
    pub days: u32,
    /// Number of synthetic participants
    pub participants: u32,
    /// Annualized return the daily schedule decays from (e.g. 0.15)
    pub year_return: f64,
    /// Mean starting fiat per participant; actual draw is uniform in [0.6, 1.4] of this
    pub mean_money: f64,
    /// Instrument inventory the bank starts with
    pub bank_assets: f64,
    /// Mean annualized target return participants aim for
    pub mean_target_return: f64,
    /// `expires_in` sent with every order, in days
    #[serde(default = "default_order_ttl_days")]
    pub order_ttl_days: u32,
    /// Base probability of a buy before the return-gap bias
    #[serde(default = "default_buy_p")]
    pub buy_p: f64,
    /// Base probability of a sell before the return-gap bias
    #[serde(default = "default_sell_p")]
    pub sell_p: f64,
    /// Probability of sitting a day out
    #[serde(default = "default_skip_p")]
    pub skip_p: f64,
    /// Smallest fraction of wealth committed to a single order
    #[serde(default = "default_min_proportion")]
    pub min_proportion: f64,
    /// Largest fraction of wealth committed to a single order
    #[serde(default = "default_max_proportion")]
    pub max_proportion: f64,
    /// RNG seed; absent means seed from entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

impl EmulationConfig {
    /// Sizing parameters every spawned participant starts from
    pub fn sizing_model(&self) -> SizingModel {
        SizingModel {
            buy_p: self.buy_p,
            sell_p: self.sell_p,
            skip_p: self.skip_p,
            min_proportion: self.min_proportion,
            max_proportion: self.max_proportion,
        }
    }
}

fn default_order_ttl_days() -> u32 {
    4
}

fn default_buy_p() -> f64 {
    0.2
}

fn default_sell_p() -> f64 {
    0.2
}

fn default_skip_p() -> f64 {
    0.2
}

fn default_min_proportion() -> f64 {
    0.1
}

fn default_max_proportion() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// JSON token cache reused across runs
    #[serde(default = "default_tokens_file")]
    pub tokens_file: String,
    /// Wealth-history dump written after a run
    #[serde(default = "default_report_file")]
    pub report_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tokens_file: default_tokens_file(),
            report_file: default_report_file(),
        }
    }
}

fn default_tokens_file() -> String {
    "tokens.json".to_string()
}

fn default_report_file() -> String {
    "wealth_report.json".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DryRunConfig {
    /// Enable dry run mode (no requests leave the process)
    #[serde(default)]
    pub enabled: bool,
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("api.timeout_secs", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("dry_run.enabled", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("STAMPEDE_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (STAMPEDE_API__BASE_URL, etc.)
            .add_source(
                Environment::with_prefix("STAMPEDE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Create a default configuration for CLI usage
    pub fn default_config(base_url: &str, dry_run: bool) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.to_string(),
                timeout_secs: 30,
                instrument_id: Some(17),
                password: default_password(),
                email_domain: default_email_domain(),
                email_prefix: default_email_prefix(),
                bank_email: default_bank_email(),
            },
            emulation: EmulationConfig {
                days: 50,
                participants: 3,
                year_return: 0.15,
                mean_money: 100.0,
                bank_assets: 800.0,
                mean_target_return: 0.15,
                order_ttl_days: 4,
                buy_p: default_buy_p(),
                sell_p: default_sell_p(),
                skip_p: default_skip_p(),
                min_proportion: default_min_proportion(),
                max_proportion: default_max_proportion(),
                seed: None,
            },
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
            dry_run: DryRunConfig { enabled: dry_run },
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.api.base_url.trim().is_empty() {
            errors.push("api.base_url must not be empty".to_string());
        }

        if self.emulation.days == 0 {
            errors.push("emulation.days must be positive".to_string());
        }

        if self.emulation.participants == 0 {
            errors.push("emulation.participants must be positive".to_string());
        }

        if self.emulation.mean_money <= 0.0 {
            errors.push("emulation.mean_money must be positive".to_string());
        }

        if self.emulation.bank_assets < 0.0 {
            errors.push("emulation.bank_assets must be non-negative".to_string());
        }

        if self.emulation.mean_target_return <= 0.0 {
            errors.push("emulation.mean_target_return must be positive".to_string());
        }

        if !(0.0..=1.0).contains(&self.emulation.year_return.abs()) {
            errors.push("emulation.year_return must be within [-1, 1]".to_string());
        }

        for (name, value) in [
            ("buy_p", self.emulation.buy_p),
            ("sell_p", self.emulation.sell_p),
            ("skip_p", self.emulation.skip_p),
            ("min_proportion", self.emulation.min_proportion),
            ("max_proportion", self.emulation.max_proportion),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!("emulation.{name} must be within [0, 1]"));
            }
        }

        if self.emulation.buy_p + self.emulation.sell_p + self.emulation.skip_p > 1.0 {
            errors.push("emulation.buy_p + sell_p + skip_p must not exceed 1".to_string());
        }

        if self.emulation.min_proportion > self.emulation.max_proportion {
            errors.push("emulation.min_proportion must not exceed max_proportion".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
