// Main function for the options chain exporter.
mod nasdaq {
    // Calls against the NASDAQ quote API.
    pub mod api_caller;
    // Response structures for the NASDAQ API.
    pub mod response;
    #[cfg(test)]
    pub mod fixtures;
}
// HTTP client module.
mod http {
    // HTTP client implementation.
    pub mod client;
}
// Data models and errors.
mod model;
// Vendor rows to records.
mod normalize;
// Option chain scraping and the record generator.
mod option;
// Data storage module.
mod store {
    /// Batched CSV/JSON output.
    pub mod batch_writer;
    /// On-disk response cache.
    pub mod cache;
}
// Runtime configuration.
mod config;
// module storing defaults
mod constants;
// Ticker list files.
mod symbols;

use std::{path::PathBuf, process::ExitCode};

use clap::{ArgGroup, Parser};
use dotenv::dotenv;

use crate::{
    config::ScraperConfig,
    model::{ExpiryClass, OptionChainSide, SaveFormat, ScrapeError},
    option::{ChainRequest, ChainSummary, OptionScraper},
    store::batch_writer::BatchWriter,
};

// Command-line argument parser.
#[derive(Parser, Debug)]
#[command(about = "Export NASDAQ option chains to CSV or JSON", long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["ticker", "symbols_file"])))]
struct Args {
    /// Stock ticker, e.g. AMD
    #[arg(short, long)]
    ticker: Option<String>,

    /// File with one ticker per line
    #[arg(long)]
    symbols_file: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = constants::OUTPUT_DIR)]
    output: PathBuf,

    /// Records per output file
    #[arg(short, long, default_value_t = constants::BATCH_SIZE)]
    batch_size: usize,

    #[arg(short, long, value_enum, default_value_t = SaveFormat::Csv)]
    save_format: SaveFormat,

    #[arg(short, long, value_enum, default_value_t = OptionChainSide::Both)]
    contract_side: OptionChainSide,

    #[arg(short = 'x', long, value_enum, default_value_t = ExpiryClass::All)]
    expiry_class: ExpiryClass,

    /// Only this expiration (YYYY-MM-DD or MM/DD/YYYY)
    #[arg(short, long)]
    expiry: Option<String>,

    /// Response cache directory [env: OPTIONS_CACHE_DIR]
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Print the listed expirations and exit
    #[arg(long, conflicts_with = "quote")]
    list_expirations: bool,

    /// Print the last sale price and exit
    #[arg(long)]
    quote: bool,
}

// Main function entry point.
fn main() -> ExitCode {
    dotenv().ok();

    env_logger::init();

    let args = Args::parse();

    match run(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> model::Result<()> {
    let mut config = ScraperConfig::from_env()?;
    if let Some(cache_dir) = &args.cache_dir {
        config.cache_dir = cache_dir.clone();
    }
    let scraper = OptionScraper::new(&config)?;

    let tickers = match (&args.ticker, &args.symbols_file) {
        (Some(ticker), _) => vec![ticker.trim().to_uppercase()],
        (None, Some(path)) => symbols::read_symbols_from_file(path)?,
        (None, None) => {
            return Err(ScrapeError::ConfigError(
                "either --ticker or --symbols-file is required".into(),
            ));
        }
    };

    for ticker in &tickers {
        if args.quote {
            let price = scraper.last_sale_price(ticker)?;
            println!("{} {:.2}", ticker, price);
            continue;
        }
        if args.list_expirations {
            for expiry in scraper.expiration_dates(ticker)? {
                println!("{}", expiry);
            }
            continue;
        }
        export(&scraper, &args, ticker)?;
    }
    Ok(())
}

fn export(scraper: &OptionScraper, args: &Args, ticker: &str) -> model::Result<()> {
    let request = ChainRequest {
        expiry: args.expiry.clone(),
        side: args.contract_side,
        expiry_class: args.expiry_class,
        ..ChainRequest::new(ticker)
    };
    let writer = BatchWriter::new(args.output.clone(), args.batch_size, args.save_format, ticker)?;

    let mut summary = ChainSummary::default();
    let records = scraper.records(&request)?.inspect(|record| {
        if let Ok(record) = record {
            summary.add(record);
        }
    });
    let files = writer.write_all(records)?;

    match summary.put_call_ratio() {
        Some(ratio) => log::info!(
            "{}: {} calls / {} puts, volume {}/{}, call OI {}, put OI {}, put/call OI ratio {:.2}",
            ticker,
            summary.calls,
            summary.puts,
            summary.call_volume,
            summary.put_volume,
            summary.call_open_interest,
            summary.put_open_interest,
            ratio
        ),
        None => log::info!("{}: {} calls / {} puts", ticker, summary.calls, summary.puts),
    }
    log::info!("Successfully exported {} to {} file(s)", ticker, files.len());
    Ok(())
}
