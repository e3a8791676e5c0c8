//! Configuration management for Moonwatch
//!
//! Loads from TOML/YAML files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub surveillance: SurveillanceConfig,
    pub exchange: ExchangeConfig,
    pub notifier: NotifierConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::builder_with_defaults()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (MOONWATCH__SECTION__KEY)
            .add_source(environment())
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Builder preloaded with every default, without file or env sources
    pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            .set_default("bot.tag", env!("CARGO_PKG_VERSION"))?
            .set_default("bot.debug", false)?
            .set_default("bot.log_json", false)?
            // Surveillance defaults
            .set_default("surveillance.mooning", 4.0)?
            .set_default("surveillance.free_fall", -10.0)?
            .set_default("surveillance.over_bought", 70)?
            .set_default("surveillance.over_sold", 30)?
            .set_default("surveillance.vol_threshold", 0.0)?
            .set_default("surveillance.update_interval_secs", 300)?
            .set_default("surveillance.rsi_time_frame", 14)?
            .set_default("surveillance.rsi_tick_interval", "fifteenMin")?
            .set_default("surveillance.rsi_history_limit", 500)?
            .set_default("surveillance.rsi_mode", "full")?
            .set_default("surveillance.quote_asset", "BTC")?
            .set_default("surveillance.update_channel", "updates")?
            // Exchange defaults
            .set_default("exchange.venue", "binance")?
            .set_default("exchange.max_attempts", 3)?
            .set_default("exchange.request_timeout_ms", 10_000)?
            .set_default("exchange.backoff_base_ms", 250)?
            .set_default("exchange.backoff_max_ms", 5_000)?
            .set_default("exchange.jitter_ratio", 0.2)?
            .set_default("exchange.on_rejection", "fatal")?
            // Notifier defaults
            .set_default("notifier.kind", "log")?
            .set_default("notifier.cycle_header", true)?;

        Ok(builder)
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "bot={} venue={} quote={} mooning={} free_fall={} rsi={}..{} period={} interval={}s",
            self.bot.tag,
            self.exchange.venue,
            self.surveillance.quote_asset,
            self.surveillance.mooning,
            self.surveillance.free_fall,
            self.surveillance.over_sold,
            self.surveillance.over_bought,
            self.surveillance.rsi_time_frame,
            self.surveillance.update_interval_secs
        )
    }

    /// Reject inconsistent thresholds before the engine starts
    pub fn validate(&self) -> Result<()> {
        let s = &self.surveillance;

        if s.free_fall >= s.mooning {
            bail!(
                "surveillance.free_fall ({}) must be below surveillance.mooning ({})",
                s.free_fall,
                s.mooning
            );
        }
        if s.over_bought > 100 || s.over_sold >= s.over_bought {
            bail!(
                "RSI thresholds must satisfy over_sold < over_bought <= 100 (got {} / {})",
                s.over_sold,
                s.over_bought
            );
        }
        if s.rsi_time_frame == 0 {
            bail!("surveillance.rsi_time_frame must be at least 1");
        }
        if s.rsi_history_limit <= s.rsi_time_frame {
            bail!(
                "surveillance.rsi_history_limit ({}) must exceed rsi_time_frame ({})",
                s.rsi_history_limit,
                s.rsi_time_frame
            );
        }
        if self.exchange.max_attempts == 0 {
            bail!("exchange.max_attempts must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.exchange.jitter_ratio) {
            bail!("exchange.jitter_ratio must be within [0, 1]");
        }
        if self.notifier.kind == NotifierKind::Webhook
            && self
                .notifier
                .webhook_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            bail!("notifier.webhook_url is required when notifier.kind = \"webhook\"");
        }

        Ok(())
    }
}

/// `MOONWATCH__SURVEILLANCE__MOONING=5`: the separator also follows the prefix
fn environment() -> Environment {
    Environment::with_prefix("MOONWATCH").separator("__")
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
