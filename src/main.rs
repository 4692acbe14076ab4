use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

mod config;
mod extract;
mod fetch;
mod models;
mod publish;
mod sheets;

use config::Config;
use fetch::PageFetcher;

/// Extract Alibaba seller metadata and publish product data to Google Sheets
#[derive(Parser)]
#[command(name = "seller-scout", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a product page and print the seller record as JSON
    Seller {
        /// Full product page URL
        url: String,
    },
    /// Upload a CSV file (header + rows) to Google Sheets
    Upload {
        /// Path to the CSV file
        csv: PathBuf,
        /// Sheet (tab) name to write into
        #[arg(long, default_value = "Products")]
        sheet: String,
        /// Path to the TOML config file
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print instructions for contacting sellers
    ContactHelp,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Seller { url } => {
            let fetcher = PageFetcher::new();
            let record = extract::scrape_seller(&fetcher, &url).await;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Upload { csv, sheet, config } => {
            let config = Config::load(&config)?;
            let url = publish::upload_csv(&csv, &sheet, &config).await?;
            info!("Upload complete");
            println!("{url}");
        }
        Command::ContactHelp => {
            println!("{}", extract::contact_instructions());
        }
    }

    Ok(())
}
