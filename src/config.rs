use std::path::Path;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::indicator::rsi::DEFAULT_WINDOW;
use crate::market::yahoo::YAHOO_BASE_URL;
use crate::model::{Currency, HistoryPeriod, PortfolioEntry};
use crate::notifier::telegram::TELEGRAM_BASE_URL;

pub const TOKEN_ENV: &str = "TELEGRAM_TOKEN";
pub const CHAT_ID_ENV: &str = "CHAT_ID";

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_history_period() -> String {
    "3mo".into()
}

fn default_rsi_window() -> usize {
    DEFAULT_WINDOW
}

fn default_send_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_telegram_base_url() -> String {
    TELEGRAM_BASE_URL.into()
}

fn default_market_base_url() -> String {
    YAHOO_BASE_URL.into()
}

fn default_requests_per_second() -> u32 {
    2
}

fn default_portfolio() -> Vec<PortfolioConfig> {
    [
        ("USD/KRW 💵", "KRW=X"),
        ("TQQQ 🇺🇸", "TQQQ"),
        ("SGOV 🇺🇸", "SGOV"),
        ("Samsung Elec. Pref 🇰🇷", "005935.KS"),
        ("Kakao 🇰🇷", "035720.KS"),
    ]
    .into_iter()
    .map(|(name, symbol)| PortfolioConfig {
        name: name.into(),
        symbol: symbol.into(),
        currency: None,
    })
    .collect()
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default = "default_portfolio")]
    pub portfolio: Vec<PortfolioConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_history_period")]
    pub history_period: String,
    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,
    /// Pause between per-entry messages, to stay under the chat rate limit.
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,
    /// Usually supplied through `TELEGRAM_TOKEN` instead.
    pub token: Option<String>,
    /// Usually supplied through `CHAT_ID` instead.
    pub chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_market_base_url")]
    pub base_url: String,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioConfig {
    pub name: String,
    pub symbol: String,
    /// Overrides the currency inferred from the symbol suffix.
    pub currency: Option<Currency>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            telegram: TelegramConfig::default(),
            market: MarketConfig::default(),
            portfolio: default_portfolio(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            history_period: default_history_period(),
            rsi_window: default_rsi_window(),
            send_interval_ms: default_send_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            base_url: default_telegram_base_url(),
            token: None,
            chat_id: None,
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_base_url(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

impl AppConfig {
    /// Overlay credentials from the environment. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty(TOKEN_ENV) {
            self.telegram.token = Some(token);
        }
        if let Some(chat_id) = non_empty(CHAT_ID_ENV) {
            self.telegram.chat_id = Some(chat_id);
        }
    }

    pub fn history_period(&self) -> Result<HistoryPeriod, Report<ConfigError>> {
        HistoryPeriod::from_str(&self.general.history_period).ok_or_else(|| {
            Report::new(ConfigError::Validation {
                field: format!(
                    "general.history_period: unknown period \"{}\"",
                    self.general.history_period
                ),
            })
        })
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.general.send_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.general.request_timeout_secs)
    }

    /// Portfolio entries in configuration order.
    pub fn entries(&self) -> Vec<PortfolioEntry> {
        self.portfolio
            .iter()
            .map(|p| PortfolioEntry {
                name: p.name.clone(),
                symbol: p.symbol.clone(),
                currency: p.currency.unwrap_or_else(|| Currency::infer(&p.symbol)),
            })
            .collect()
    }

    /// Telegram token and chat id, if both are present.
    pub fn telegram_credentials(&self) -> Option<(&str, &str)> {
        let token = self.telegram.token.as_deref().filter(|t| !t.is_empty())?;
        let chat_id = self.telegram.chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token, chat_id))
    }
}

/// Load an `AppConfig` from a TOML file at `path`, or the built-in defaults when
/// no path is given. Environment overlay and validation are separate steps.
pub fn load(path: Option<&Path>) -> Result<AppConfig, Report<ConfigError>> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })
}

/// Check the config before any entry is processed. Credentials are only
/// required when messages go to Telegram.
pub fn validate(config: &AppConfig, require_credentials: bool) -> Result<(), Report<ConfigError>> {
    config.history_period()?;
    validate_general(config)?;
    validate_portfolio(config)?;
    if require_credentials {
        validate_credentials(config)?;
    }
    Ok(())
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.general.rsi_window == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "general.rsi_window must be >= 1".into(),
        }));
    }
    if config.market.requests_per_second == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "market.requests_per_second must be >= 1".into(),
        }));
    }
    if !matches!(config.general.log_format.as_str(), "text" | "json") {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "general.log_format \"{}\" is not one of \"text\", \"json\"",
                config.general.log_format
            ),
        }));
    }
    Ok(())
}

fn validate_portfolio(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.portfolio.is_empty() {
        return Err(Report::new(ConfigError::Validation {
            field: "portfolio: at least one entry is required".into(),
        }));
    }

    let mut seen = std::collections::HashSet::new();
    for entry in &config.portfolio {
        if entry.symbol.trim().is_empty() {
            return Err(Report::new(ConfigError::Validation {
                field: format!("portfolio[\"{}\"].symbol is empty", entry.name),
            }));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(Report::new(ConfigError::Validation {
                field: format!("portfolio: duplicate name \"{}\"", entry.name),
            }));
        }
    }
    Ok(())
}

fn validate_credentials(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.telegram_credentials().is_none() {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "telegram.token and telegram.chat_id are required (set {TOKEN_ENV} and {CHAT_ID_ENV})"
            ),
        }));
    }
    Ok(())
}
