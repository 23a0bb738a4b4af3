//! Configuration management
//!
//! Loads and validates the JSON configuration file. Configuration errors are
//! fatal at startup; nothing downstream re-validates.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::Symbol;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub trading: TradingConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
}

impl Config {
    /// Load configuration from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter the engine depends on; any violation is fatal
    pub fn validate(&self) -> Result<()> {
        self.session_timezone()?;
        let start = self.window_start()?;
        let end = self.window_end()?;
        if start >= end {
            anyhow::bail!(
                "trading_window start {} must be before end {}",
                self.strategy.trading_window.start,
                self.strategy.trading_window.end
            );
        }
        if self.strategy.opening_range_minutes == 0 {
            anyhow::bail!("opening_range_minutes must be positive");
        }
        if self.strategy.exit_rules.risk_reward_ratio <= 0.0 {
            anyhow::bail!("risk_reward_ratio must be positive");
        }
        if self.strategy.entry_rules.volume_multiplier <= 0.0 {
            anyhow::bail!("volume_multiplier must be positive");
        }
        if self.trading.point_value <= 0.0 {
            anyhow::bail!("point_value must be positive");
        }
        if self.trading.initial_balance <= 0.0 {
            anyhow::bail!("initial_balance must be positive");
        }
        if self.risk.max_position_size == 0 {
            anyhow::bail!("max_position_size must be at least 1");
        }
        if self.risk.max_daily_trades == 0 {
            anyhow::bail!("max_daily_trades must be at least 1");
        }
        if self.risk.max_daily_loss <= 0.0 {
            anyhow::bail!("max_daily_loss must be positive");
        }
        if self.risk.risk_percent <= 0.0 || self.risk.risk_percent >= 1.0 {
            anyhow::bail!("risk_percent must be in (0, 1)");
        }
        Ok(())
    }

    pub fn symbol(&self) -> Symbol {
        Symbol::new(self.trading.symbol.clone())
    }

    pub fn session_timezone(&self) -> Result<Tz> {
        self.trading
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("unknown timezone '{}': {}", self.trading.timezone, e))
    }

    pub fn window_start(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.strategy.trading_window.start)
    }

    pub fn window_end(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.strategy.trading_window.end)
    }
}

fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| anyhow::anyhow!("bad HH:MM time '{}': {}", s, e))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            trading: TradingConfig::default(),
            strategy: StrategyConfig::default(),
            risk: RiskConfig::default(),
            filters: FiltersConfig::default(),
        }
    }
}

/// Instrument and account parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub symbol: String,
    /// Currency value of one point of price movement per contract
    pub point_value: f64,
    pub initial_balance: f64,
    /// Exchange timezone for session wall-clock times (IANA name)
    pub timezone: String,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            symbol: "ES".to_string(),
            point_value: 50.0, // ES futures: $50 per point
            initial_balance: 100_000.0,
            timezone: "America/New_York".to_string(),
        }
    }
}

/// Opening range breakout parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub opening_range_minutes: u32,
    pub trading_window: WindowConfig,
    pub entry_rules: EntryRules,
    pub exit_rules: ExitRules,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            opening_range_minutes: 5,
            trading_window: WindowConfig::default(),
            entry_rules: EntryRules::default(),
            exit_rules: ExitRules::default(),
        }
    }
}

/// Session wall-clock window, HH:MM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    pub start: String,
    pub end: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            start: "09:30".to_string(),
            end: "15:45".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRules {
    pub volume_confirmation: bool,
    pub volume_multiplier: f64,
    #[serde(default = "default_volume_lookback")]
    pub volume_lookback: usize,
    pub min_breakout_points: f64,
}

fn default_volume_lookback() -> usize {
    20
}

impl Default for EntryRules {
    fn default() -> Self {
        EntryRules {
            volume_confirmation: true,
            volume_multiplier: 1.5,
            volume_lookback: 20,
            min_breakout_points: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRules {
    pub risk_reward_ratio: f64,
}

impl Default for ExitRules {
    fn default() -> Self {
        ExitRules {
            risk_reward_ratio: 2.0,
        }
    }
}

/// Risk limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_position_size: u32,
    /// Maximum tolerated daily loss in account currency
    pub max_daily_loss: f64,
    pub max_daily_trades: u32,
    /// Fraction of account balance risked per trade
    pub risk_percent: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_position_size: 3,
            max_daily_loss: 500.0,
            max_daily_trades: 3,
            risk_percent: 0.02,
        }
    }
}

/// Calendar filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    pub avoid_news_days: bool,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        FiltersConfig {
            avoid_news_days: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn inverted_window_is_fatal() {
        let mut config = Config::default();
        config.strategy.trading_window.start = "16:00".to_string();
        config.strategy.trading_window.end = "09:30".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_timezone_is_fatal() {
        let mut config = Config::default();
        config.trading.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_opening_range_is_fatal() {
        let mut config = Config::default();
        config.strategy.opening_range_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_minimal_json() {
        let json = r#"{
            "trading": {
                "symbol": "ES",
                "point_value": 50.0,
                "initial_balance": 100000.0,
                "timezone": "America/New_York"
            },
            "strategy": {
                "opening_range_minutes": 5,
                "trading_window": { "start": "09:30", "end": "15:45" },
                "entry_rules": {
                    "volume_confirmation": true,
                    "volume_multiplier": 1.5,
                    "min_breakout_points": 0.25
                },
                "exit_rules": { "risk_reward_ratio": 2.0 }
            },
            "risk": {
                "max_position_size": 3,
                "max_daily_loss": 500.0,
                "max_daily_trades": 3,
                "risk_percent": 0.02
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy.entry_rules.volume_lookback, 20);
        assert!(config.filters.avoid_news_days);
    }
}
