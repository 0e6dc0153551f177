//! Scanner Configuration
//!
//! All knobs for a scan: provider settings, universe shaping, search bounds
//! and reporting. Loadable from the environment (.env supported) or a TOML
//! file, with validation before any work starts.

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::market::DEFAULT_API_URL;

/// Main configuration for cyclescan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Provider Settings ==========
    /// CoinGecko API base URL
    pub api_url: String,

    /// Optional CoinGecko API key (the public tier works without one)
    pub api_key: Option<String>,

    /// Exchange whose tickers seed the market-rate edges
    pub exchange: String,

    // ========== Universe Settings ==========
    /// How many top-market-cap coins make up the universe
    pub universe_limit: usize,

    /// Reference/stable assets; a ticker touching one of these is admitted
    /// when the other side belongs to the universe
    pub stablecoins: Vec<String>,

    // ========== Search Bounds ==========
    /// Maximum distinct coins in a route (3-4 recommended; the search is
    /// exponential in this bound)
    pub max_path_length: usize,

    /// How many ranked opportunities to report
    pub top_n: usize,

    // ========== Reporting ==========
    /// Append profitable routes to the scan log
    pub scan_log: bool,

    /// Path of the scan log (JSON lines)
    pub scan_log_path: String,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            api_url: env::var("COINGECKO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key: env::var("COINGECKO_API_KEY").ok(),
            exchange: env::var("EXCHANGE").unwrap_or_else(|_| "binance".to_string()),

            universe_limit: env::var("UNIVERSE_LIMIT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            stablecoins: env::var("STABLECOINS")
                .map(|s| s.split(',').map(|c| c.trim().to_lowercase()).collect())
                .unwrap_or_else(|_| Self::default_stablecoins()),

            max_path_length: env::var("MAX_PATH_LENGTH")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            top_n: env::var("TOP_N")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),

            scan_log: env::var("SCAN_LOG")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            scan_log_path: env::var("SCAN_LOG_PATH")
                .unwrap_or_else(|_| "./logs/opportunities.log".to_string()),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reference assets the stable-rate admission rule is built around.
    fn default_stablecoins() -> Vec<String> {
        vec![
            "usdt".to_string(),
            "usdc".to_string(),
            "busd".to_string(),
            "dai".to_string(),
        ]
    }

    /// Validate configuration before scanning
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(eyre::eyre!("COINGECKO_API_URL must not be empty"));
        }
        if self.exchange.is_empty() {
            return Err(eyre::eyre!("EXCHANGE must not be empty"));
        }
        if self.universe_limit == 0 || self.universe_limit > 250 {
            return Err(eyre::eyre!(
                "UNIVERSE_LIMIT must be 1-250 (CoinGecko page cap), got {}",
                self.universe_limit
            ));
        }
        if self.max_path_length < 3 {
            return Err(eyre::eyre!(
                "MAX_PATH_LENGTH < 3 cannot close a cycle (got {})",
                self.max_path_length
            ));
        }
        if self.max_path_length > 6 {
            return Err(eyre::eyre!(
                "MAX_PATH_LENGTH > 6 makes the search cost explode on a dense universe"
            ));
        }
        if self.top_n == 0 {
            return Err(eyre::eyre!("TOP_N must be at least 1"));
        }
        if self.stablecoins.is_empty() {
            return Err(eyre::eyre!(
                "STABLECOINS must list at least one reference asset"
            ));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║                 CYCLESCAN - CONFIGURATION                  ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Exchange:          {:^40}║", self.exchange);
        println!(
            "║ Universe:          {:^40}║",
            format!("top {} by market cap", self.universe_limit)
        );
        println!("║ Reference assets:  {:^40}║", self.stablecoins.join(", "));
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ SEARCH BOUNDS                                              ║");
        println!("║ • Max route coins: {:^40}║", self.max_path_length);
        println!("║ • Report top:      {:^40}║", self.top_n);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!(
            "║ • API key:         {:^40}║",
            if self.api_key.is_some() {
                "✓ Configured"
            } else {
                "✗ Public tier"
            }
        );
        println!(
            "║ • Scan log:        {:^40}║",
            if self.scan_log { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            exchange: "binance".to_string(),
            universe_limit: 100,
            stablecoins: Self::default_stablecoins(),
            max_path_length: 4,
            top_n: 3,
            scan_log: true,
            scan_log_path: "./logs/opportunities.log".to_string(),
        }
    }
}

// ============================================
// OPPORTUNITY LOGGER
// ============================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::io::Write;

/// One profitable route found during a scan, appended as a JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityLog {
    pub timestamp: DateTime<Utc>,
    pub base_coin: String,
    pub exchange: String,
    pub path: Vec<String>,
    pub profit_percentage: Decimal,
}

impl OpportunityLog {
    /// Append this log to a file
    pub fn append_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let json = serde_json::to_string(self)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

// ============================================
// TESTS
// ============================================
