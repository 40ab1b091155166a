mod config;
mod crawler;
mod error;
mod export;
mod extract;
mod models;
mod schema;
mod stages;
mod store;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::config::{FetcherKind, Overrides, Settings};
use crate::stages::{
    DistrictStage, FailurePolicy, Stage, StageContext, StageReport, TahsilStage, VillageStage,
};
use crate::store::DataDir;

#[derive(Parser)]
#[command(
    name = "census_scraper",
    about = "Crawl district, tahsil and village listings into JSON"
)]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOpts {
    /// Root URL of the source site [env: SCRAPPING_BASE_URL]
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Listing page for the district stage, defaults to the base URL [env: SCRAPPING_SEED_URL]
    #[arg(long, global = true)]
    seed_url: Option<String>,
    /// Directory holding the JSON files [env: SCRAPPING_DATA_PATH]
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Pause after every page fetch, in seconds [env: SCRAPPING_DELAY_SECS]
    #[arg(long, global = true)]
    delay_secs: Option<u64>,
    /// How pages are fetched [env: SCRAPPING_FETCHER]
    #[arg(long, global = true, value_enum)]
    fetcher: Option<FetcherKind>,
}

impl GlobalOpts {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            seed_url: self.seed_url.clone(),
            data_dir: self.data_dir.clone(),
            delay_secs: self.delay_secs,
            fetcher: self.fetcher,
        }
    }
}

#[derive(Args)]
struct CrawlArgs {
    /// What to do when a page cannot be fetched
    #[arg(long, value_enum, default_value_t = FailurePolicy::Abort)]
    on_error: FailurePolicy,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the district listing into districts.json
    Districts(CrawlArgs),
    /// Scrape every district page into tahsil.json
    Tahsils(CrawlArgs),
    /// Scrape every tahsil page into villages.json
    Villages(CrawlArgs),
    /// Districts, tahsils and villages in one go
    Run(CrawlArgs),
    /// Join villages with their districts into villages.csv
    Export,
    /// Show record counts of the data files
    Stats,
}

#[derive(Clone, Copy)]
enum StageKind {
    Districts,
    Tahsils,
    Villages,
}

impl StageKind {
    fn name(self) -> &'static str {
        match self {
            StageKind::Districts => DistrictStage::NAME,
            StageKind::Tahsils => TahsilStage::NAME,
            StageKind::Villages => VillageStage::NAME,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(&cli.opts.overrides()).context("Failed to load settings")?;
    let data = DataDir::new(settings.data_path());

    let result = match cli.command {
        Commands::Districts(args) => crawl(&settings, &data, args.on_error, &[StageKind::Districts]).await,
        Commands::Tahsils(args) => crawl(&settings, &data, args.on_error, &[StageKind::Tahsils]).await,
        Commands::Villages(args) => crawl(&settings, &data, args.on_error, &[StageKind::Villages]).await,
        Commands::Run(args) => {
            crawl(
                &settings,
                &data,
                args.on_error,
                &[StageKind::Districts, StageKind::Tahsils, StageKind::Villages],
            )
            .await
        }
        Commands::Export => {
            let rows = export::export_villages_csv(&data).context("CSV export failed")?;
            println!(
                "Exported {} villages to {}",
                rows,
                data.path(store::VILLAGES_CSV_FILE).display()
            );
            Ok(())
        }
        Commands::Stats => {
            println!("Data directory: {}", data.root().display());
            for s in store::file_stats(&data) {
                let records = s
                    .records
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "missing".into());
                let modified = s
                    .modified
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{:<14} {:>8}   {}", s.file, records, modified);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Validate settings, build the fetcher once, then run each stage in order.
/// The first stage that fails stops the rest.
async fn crawl(
    settings: &Settings,
    data: &DataDir,
    policy: FailurePolicy,
    which: &[StageKind],
) -> anyhow::Result<()> {
    let base_url = settings.base_url()?;
    let seed_url = settings.seed_url()?;
    let fetcher = crawler::build_fetcher(settings.fetcher)?;

    let ctx = StageContext {
        fetcher: fetcher.as_ref(),
        base_url,
        seed_url,
        data: data.clone(),
        delay: settings.delay(),
        policy,
    };

    for &kind in which {
        let report = match kind {
            StageKind::Districts => stages::run::<DistrictStage>(&ctx).await,
            StageKind::Tahsils => stages::run::<TahsilStage>(&ctx).await,
            StageKind::Villages => stages::run::<VillageStage>(&ctx).await,
        }
        .with_context(|| format!("{} stage aborted", kind.name()))?;
        print_report(kind, &report);
    }

    Ok(())
}

fn print_report(kind: StageKind, report: &StageReport) {
    if report.records == 0 {
        println!("{}: no data extracted from {} pages.", kind.name(), report.parents);
    } else {
        println!(
            "{}: {} records from {} pages ({} failed).",
            kind.name(),
            report.records,
            report.parents,
            report.failures
        );
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
