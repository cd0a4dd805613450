use anyhow::{Context, Result, bail};
use clap::Parser;
use collate_orders::{InputScanner, OrderBook, OrderBookConfig, interval_or_default};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{Level, event};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "collate-orders")]
#[command(about = "Collates order fragments from JSON files into per-order CSV files")]
struct Cli {
    /// Directory searched for new *.json files
    input_dir: PathBuf,

    /// Directory receiving one CSV file per order
    output_dir: PathBuf,

    /// Input scan period, also used as the flush period; 0 selects 10 000 ms
    #[arg(long, default_value_t = 30_000)]
    interval_ms: u64,

    /// JSON configuration file; overrides the output directory and flush period
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => OrderBookConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => OrderBookConfig::new(&cli.output_dir).flush_interval_ms(cli.interval_ms),
    };

    if !config.output_dir.is_dir() {
        bail!(
            "Can not locate output file directory: '{}'",
            config.output_dir.display()
        );
    }

    let book = OrderBook::start(config).context("starting order book")?;
    let mut scanner = InputScanner::new(&cli.input_dir);

    let scan_period = interval_or_default(cli.interval_ms);

    let outcome = tokio::select! {
        res = scan_loop(&book, &mut scanner, scan_period) => res,
        res = tokio::signal::ctrl_c() => res.context("waiting for Ctrl-C"),
    };

    println!("Quitting program. Just waiting for output files thread to stop");
    book.cancel_writing();
    while !book.is_finished() {
        print!(".");
        std::io::stdout().flush().ok();
        sleep(Duration::from_millis(500)).await;
    }
    println!();
    book.shutdown().await?;

    outcome
}

/// Feed every new input file into the book until the scanner fails.
async fn scan_loop(book: &OrderBook, scanner: &mut InputScanner, period: Duration) -> Result<()> {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if !book.config().output_dir.is_dir() {
            bail!(
                "Can not locate output file directory: '{}'",
                book.config().output_dir.display()
            );
        }
        let batches = scanner.read_new_batches().with_context(|| {
            format!(
                "Can not locate input file directory: '{}'",
                scanner.input_dir().display()
            )
        })?;

        for batch in batches {
            let total = batch.elements.len();
            let merged = batch
                .elements
                .into_iter()
                .map(|element| book.ingest_json(element))
                .filter(|outcome| outcome.is_merged())
                .count();
            event!(
                Level::INFO,
                path = %batch.path.display(),
                total,
                merged,
                "input file ingested"
            );
        }
    }
}
