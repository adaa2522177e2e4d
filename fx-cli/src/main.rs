//! FX CLI
//!
//! Command-line interface for the exchange-rate API.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use fx_client::FxClient;
use fx_types::CurrencyCode;

#[derive(Parser)]
#[command(name = "fx")]
#[command(author, version, about = "Exchange-rate API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the exchange-rate API
    #[arg(long, env = "FX_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Bearer secret for the batch job endpoint
    #[arg(long, env = "CRON_SECRET", hide_env_values = true)]
    cron_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rate operations
    Rates {
        #[command(subcommand)]
        action: RateCommands,
    },
    /// Convert an amount between currencies
    Convert {
        /// Amount in the source currency, up to two decimals
        amount: Decimal,
        #[arg(value_parser = parse_currency)]
        from: CurrencyCode,
        #[arg(value_parser = parse_currency)]
        to: CurrencyCode,
    },
    /// Run the batch refresh job now
    Refresh,
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum RateCommands {
    /// List every cached rate
    List,
    /// Resolve the rate for a pair
    Get {
        #[arg(value_parser = parse_currency)]
        from: CurrencyCode,
        #[arg(value_parser = parse_currency)]
        to: CurrencyCode,
    },
    /// Set an operator override rate (its inverse is stored too)
    Set {
        #[arg(value_parser = parse_currency)]
        from: CurrencyCode,
        #[arg(value_parser = parse_currency)]
        to: CurrencyCode,
        rate: Decimal,
    },
}

fn parse_currency(s: &str) -> Result<CurrencyCode, String> {
    CurrencyCode::new(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = FxClient::new(&cli.api_url);
    if let Some(secret) = cli.cron_secret {
        client = client.with_cron_secret(secret);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Rates { action } => match action {
            RateCommands::List => {
                let rates = client.list_rates().await?;
                println!("{}", serde_json::to_string_pretty(&rates)?);
            }
            RateCommands::Get { from, to } => {
                let rate = client.get_rate(&from, &to).await?;
                println!("{}", serde_json::to_string_pretty(&rate)?);
            }
            RateCommands::Set { from, to, rate } => {
                let entry = client.set_manual_rate(from, to, rate).await?;
                println!("{}", serde_json::to_string_pretty(&entry)?);
            }
        },

        Commands::Convert { amount, from, to } => {
            let result = client.convert(amount, from, to).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Refresh => {
            let summary = client.refresh().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from(["fx", "convert", "100.50", "eur", "UAH"]).unwrap();
        match cli.command {
            Commands::Convert { amount, from, to } => {
                assert_eq!(amount.to_string(), "100.50");
                assert_eq!(from.as_str(), "EUR");
                assert_eq!(to.as_str(), "UAH");
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_currency() {
        assert!(Cli::try_parse_from(["fx", "rates", "get", "USD", "DOLLAR"]).is_err());
    }

    #[test]
    fn test_parse_rates_set() {
        let cli = Cli::try_parse_from(["fx", "rates", "set", "USD", "UAH", "41.25"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Rates {
                action: RateCommands::Set { .. }
            }
        ));
    }
}
