//! cyclescan - Arbitrage Cycle Scanner
//!
//! Run with: cargo run -- bitcoin

use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod engine;
mod market;
mod scanner;

use chrono::Utc;
use config::{Config, OpportunityLog};
use market::CoinGeckoClient;
use scanner::ArbitrageScanner;

/// Find profitable multi-hop conversion cycles starting from a base coin.
#[derive(Debug, Parser)]
#[command(name = "cyclescan", version, about)]
struct Cli {
    /// CoinGecko id of the coin every cycle must start and end at
    #[arg(default_value = "bitcoin")]
    base_coin: String,

    /// Maximum distinct coins in a route (the closing hop comes on top)
    #[arg(long)]
    max_path_length: Option<usize>,

    /// How many ranked opportunities to report
    #[arg(long)]
    top: Option<usize>,

    /// Universe size (top coins by market cap, 1-250)
    #[arg(long)]
    universe: Option<usize>,

    /// Exchange whose tickers seed the market-rate edges
    #[arg(long)]
    exchange: Option<String>,

    /// Load configuration from a TOML file instead of the environment
    #[arg(long)]
    config: Option<PathBuf>,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🔄 CYCLESCAN - Arbitrage Cycle Scanner").cyan().bold()
    );
    println!(
        "{}",
        style("    Market rates + USD cross-rates | Bounded cycle search").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cyclescan=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    print_banner();

    // Load configuration, CLI flags winning over file/env values
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(max_path_length) = cli.max_path_length {
        config.max_path_length = max_path_length;
    }
    if let Some(top) = cli.top {
        config.top_n = top;
    }
    if let Some(universe) = cli.universe {
        config.universe_limit = universe;
    }
    if let Some(exchange) = cli.exchange {
        config.exchange = exchange;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }

    config.print_summary();
    println!();

    let client = CoinGeckoClient::new(config.api_url.clone(), config.api_key.clone())?;
    let scanner = ArbitrageScanner::new(client, config.clone());

    println!(
        "{}",
        style(format!(
            "Scanning {} routes from '{}' (max {} coins per route)...",
            config.exchange, cli.base_coin, config.max_path_length
        ))
        .blue()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Fetching snapshot and walking the rate graph...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let start = Instant::now();
    let result = scanner
        .find_opportunities(&cli.base_coin, config.max_path_length)
        .await;
    spinner.finish_and_clear();

    let opportunities = result?;
    let scan_time = start.elapsed();

    println!(
        "{} Scan finished in {:?}",
        style("✓").green(),
        scan_time
    );
    println!();

    if opportunities.is_empty() {
        println!(
            "{}",
            style("No arbitrage found in this snapshot.").yellow()
        );
        println!("An empty result is normal: consistent prices leave no profitable loop.");
        println!("Try a different base coin, a larger universe, or a longer route bound.");
    } else {
        println!(
            "{}",
            style(format!(
                "Top {} opportunities from '{}':",
                opportunities.len(),
                cli.base_coin.to_lowercase()
            ))
            .green()
            .bold()
        );
        println!();

        for (i, opp) in opportunities.iter().enumerate() {
            println!(
                "  {}. {} {}",
                i + 1,
                style(format!("+{}%", opp.profit_percentage.round_dp(4))).green(),
                style(opp.route()).cyan()
            );
            println!("     {} hops", opp.hop_count());
        }

        if config.scan_log {
            for opp in &opportunities {
                let entry = OpportunityLog {
                    timestamp: Utc::now(),
                    base_coin: cli.base_coin.to_lowercase(),
                    exchange: config.exchange.clone(),
                    path: opp.path.clone(),
                    profit_percentage: opp.profit_percentage,
                };
                entry.append_to_file(&config.scan_log_path)?;
            }
            println!();
            println!(
                "{} Opportunities logged to: {}",
                style("📝").cyan(),
                config.scan_log_path
            );
        }
    }

    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );
    println!("Summary:");
    println!("  • Base coin: {}", cli.base_coin.to_lowercase());
    println!("  • Exchange: {}", config.exchange);
    println!("  • Universe: top {} by market cap", config.universe_limit);
    println!("  • Opportunities reported: {}", opportunities.len());
    println!();

    Ok(())
}
