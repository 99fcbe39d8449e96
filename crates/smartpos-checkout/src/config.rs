//! # Checkout Configuration
//!
//! Settings for the checkout engine: the active tax and the commit policy.
//!
//! ## Configuration Priority
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Sources                                │
//! │                                                                         │
//! │  Priority (highest to lowest):                                         │
//! │  ─────────────────────────────                                         │
//! │  1. Environment variables (SMARTPOS_TAX_RATE, SMARTPOS_MAX_RETRIES)    │
//! │  2. Config file (checkout.toml)                                        │
//! │  3. Built-in defaults                                                  │
//! │                                                                         │
//! │  Config File Location:                                                 │
//! │  ─────────────────────                                                 │
//! │  • Linux:   ~/.config/smartpos/checkout.toml                           │
//! │  • macOS:   ~/Library/Application Support/com.smartpos.pos/            │
//! │  • Windows: %APPDATA%\smartpos\pos\config\                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Config File
//! ```toml
//! [tax]
//! name = "PB1"
//! rate_bps = 1000
//!
//! [checkout]
//! payment_tolerance_minor = 0
//! max_retries = 3
//! initial_backoff_ms = 20
//! max_backoff_ms = 200
//! commit_timeout_ms = 10000
//! event_capacity = 64
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use smartpos_core::{ActiveTax, Money, TaxRate};

/// Upper bound for `checkout.max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 20;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure to produce a usable [`CheckoutConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file exists but could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are out of range.
    #[error("Invalid checkout configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Tax Settings
// =============================================================================

/// The single active tax applied to every checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Label printed on receipts and frozen on the order.
    #[serde(default = "default_tax_name")]
    pub name: String,

    /// Rate in basis points (1000 = 10%).
    #[serde(default = "default_tax_rate_bps")]
    pub rate_bps: u32,
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            name: default_tax_name(),
            rate_bps: default_tax_rate_bps(),
        }
    }
}

// =============================================================================
// Checkout Settings
// =============================================================================

/// Commit policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// How far short of the grand total a payment may be, in minor units.
    /// Zero means exact integer comparison.
    #[serde(default)]
    pub payment_tolerance_minor: i64,

    /// Extra attempts after the first for a checkout that loses the
    /// queue-number race. `3` means up to four transactions; `0` disables retry.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay (milliseconds) after a lost race.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Upper bound for one transaction attempt (milliseconds).
    #[serde(default = "default_commit_timeout")]
    pub commit_timeout_ms: u64,

    /// Buffered post-commit events per subscriber.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            payment_tolerance_minor: 0,
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            commit_timeout_ms: default_commit_timeout(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_tax_name() -> String {
    "PB1".to_string()
}

fn default_tax_rate_bps() -> u32 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    20
}

fn default_max_backoff() -> u64 {
    200
}

fn default_commit_timeout() -> u64 {
    10_000
}

fn default_event_capacity() -> usize {
    64
}

// =============================================================================
// Main Config
// =============================================================================

/// Complete checkout engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub tax: TaxSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,
}

impl CheckoutConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (checkout.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tax.name.trim().is_empty() {
            return Err(ConfigError::Invalid("tax.name must not be empty".into()));
        }

        if self.tax.rate_bps > 10_000 {
            return Err(ConfigError::Invalid(format!(
                "tax.rate_bps must be at most 10000, got {}",
                self.tax.rate_bps
            )));
        }

        if self.checkout.payment_tolerance_minor < 0 {
            return Err(ConfigError::Invalid(
                "checkout.payment_tolerance_minor must not be negative".into(),
            ));
        }

        if self.checkout.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "checkout.max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                self.checkout.max_retries
            )));
        }

        if self.checkout.initial_backoff_ms > self.checkout.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "checkout.initial_backoff_ms must not exceed max_backoff_ms".into(),
            ));
        }

        if self.checkout.commit_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "checkout.commit_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.checkout.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "checkout.event_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // Tax rate as a percent string, e.g. "10" or "11.5%"
        if let Ok(rate) = std::env::var("SMARTPOS_TAX_RATE") {
            match TaxRate::parse_percent(&rate) {
                Some(parsed) => {
                    debug!(rate = %rate, "Overriding tax rate from environment");
                    self.tax.rate_bps = parsed.bps();
                }
                None => warn!(rate = %rate, "Unparseable SMARTPOS_TAX_RATE"),
            }
        }

        if let Ok(name) = std::env::var("SMARTPOS_TAX_NAME") {
            self.tax.name = name;
        }

        if let Ok(tolerance) = std::env::var("SMARTPOS_PAYMENT_TOLERANCE") {
            if let Ok(t) = tolerance.parse::<i64>() {
                debug!(tolerance = t, "Overriding payment tolerance from environment");
                self.checkout.payment_tolerance_minor = t;
            }
        }

        if let Ok(retries) = std::env::var("SMARTPOS_MAX_RETRIES") {
            if let Ok(r) = retries.parse::<u32>() {
                self.checkout.max_retries = r;
            }
        }

        if let Ok(timeout) = std::env::var("SMARTPOS_COMMIT_TIMEOUT_MS") {
            if let Ok(t) = timeout.parse::<u64>() {
                self.checkout.commit_timeout_ms = t;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "smartpos", "pos")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The tax that will be applied and snapshotted on each order.
    pub fn active_tax(&self) -> ActiveTax {
        ActiveTax::new(self.tax.name.clone(), TaxRate::from_bps(self.tax.rate_bps))
    }

    pub fn payment_tolerance(&self) -> Money {
        Money::from_minor(self.checkout.payment_tolerance_minor)
    }

    /// Transactions a single checkout may run: the first plus `max_retries`.
    pub fn max_attempts(&self) -> u32 {
        self.checkout.max_retries.saturating_add(1)
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.checkout.commit_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.checkout.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.checkout.max_backoff_ms)
    }

    /// Sets the active tax.
    pub fn with_tax(mut self, name: impl Into<String>, rate: TaxRate) -> Self {
        self.tax.name = name.into();
        self.tax.rate_bps = rate.bps();
        self
    }

    /// Sets the payment tolerance in minor units.
    pub fn with_payment_tolerance(mut self, minor: i64) -> Self {
        self.checkout.payment_tolerance_minor = minor;
        self
    }

    /// Sets how many times a contended checkout is retried.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.checkout.max_retries = retries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CheckoutConfig::default();
        assert_eq!(config.tax.rate_bps, 1000);
        assert_eq!(config.checkout.payment_tolerance_minor, 0);
        assert_eq!(config.checkout.max_retries, 3);
        assert_eq!(config.max_attempts(), 4);
        assert!(config.validate().is_ok());

        let tax = config.active_tax();
        assert_eq!(tax.name, "PB1");
        assert_eq!(tax.rate, TaxRate::from_bps(1000));
    }

    #[test]
    fn test_config_validation() {
        let mut config = CheckoutConfig::default();

        config.tax.rate_bps = 10_001;
        assert!(config.validate().is_err());
        config.tax.rate_bps = 1100;

        config.checkout.payment_tolerance_minor = -1;
        assert!(config.validate().is_err());
        config.checkout.payment_tolerance_minor = 1;

        config.checkout.max_retries = MAX_RETRIES_LIMIT + 1;
        assert!(config.validate().is_err());
        config.checkout.max_retries = 0;
        assert!(config.validate().is_ok());
        config.checkout.max_retries = 5;

        config.checkout.initial_backoff_ms = 500;
        assert!(config.validate().is_err());
        config.checkout.initial_backoff_ms = 10;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_sections_use_defaults() {
        let config: CheckoutConfig = toml::from_str(
            r#"
            [tax]
            rate_bps = 1100

            [checkout]
            payment_tolerance_minor = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.tax.name, "PB1");
        assert_eq!(config.tax.rate_bps, 1100);
        assert_eq!(config.checkout.payment_tolerance_minor, 1);
        assert_eq!(config.checkout.max_retries, 3);
        assert_eq!(config.checkout.event_capacity, 64);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkout.toml");
        std::fs::write(
            &path,
            "[tax]\nname = \"PPN\"\nrate_bps = 1100\n\n[checkout]\nmax_retries = 5\n",
        )
        .unwrap();

        let config = CheckoutConfig::load(Some(path)).unwrap();
        assert_eq!(config.tax.name, "PPN");
        assert_eq!(config.checkout.max_retries, 5);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkout.toml");
        std::fs::write(&path, "[checkout]\nmax_retries = \"many\"\n").unwrap();

        assert!(matches!(
            CheckoutConfig::load(Some(path.clone())),
            Err(ConfigError::Parse(_))
        ));

        let fallback = CheckoutConfig::load_or_default(Some(path));
        assert_eq!(fallback.checkout.max_retries, 3);
    }

    #[test]
    fn test_builders() {
        let config = CheckoutConfig::default()
            .with_tax("PPN", TaxRate::from_bps(1100))
            .with_payment_tolerance(1)
            .with_max_retries(7);

        assert_eq!(config.active_tax().name, "PPN");
        assert_eq!(config.payment_tolerance(), Money::from_minor(1));
        assert_eq!(config.checkout.max_retries, 7);
        assert_eq!(config.max_attempts(), 8);
        assert_eq!(config.commit_timeout(), Duration::from_secs(10));
    }
}
