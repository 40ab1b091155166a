pub mod district;
pub mod tahsil;
pub mod village;

use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BaseUrl;
use crate::crawler::{fetch_and_extract, PageFetcher};
use crate::error::Result;
use crate::extract::{self, CompiledSchema};
use crate::schema::ExtractionSchema;
use crate::store::{self, DataDir};

pub use district::DistrictStage;
pub use tahsil::TahsilStage;
pub use village::VillageStage;

/// What to do when one page of a stage cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Stop the stage and write nothing
    #[default]
    Abort,
    /// Log the page, keep going, write a failure report next to the output
    Skip,
}

/// One level of the hierarchy: where its pages come from, how rows are read
/// off them and how the parent's name is stamped on each record.
pub trait Stage {
    /// Upstream record whose page lists this stage's rows.
    type Parent;
    /// Row as extracted from the page.
    type Row: DeserializeOwned;
    /// Record written to the output file.
    type Output: Serialize;

    const NAME: &'static str;
    const OUTPUT_FILE: &'static str;

    fn schema() -> ExtractionSchema;
    fn load_parents(ctx: &StageContext<'_>) -> Result<Vec<Self::Parent>>;
    fn page_url(base: &BaseUrl, parent: &Self::Parent) -> String;
    fn parent_name(parent: &Self::Parent) -> &str;
    /// Stamp the parent onto a row. `None` drops the row, e.g. a listing
    /// entry without a link the next stage could follow.
    fn adopt(parent: &Self::Parent, row: Self::Row) -> Option<Self::Output>;
}

/// Everything a stage needs, resolved once at the process boundary.
pub struct StageContext<'a> {
    pub fetcher: &'a dyn PageFetcher,
    pub base_url: BaseUrl,
    pub seed_url: String,
    pub data: DataDir,
    pub delay: Duration,
    pub policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedPage {
    pub url: String,
    pub parent_name: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

pub struct Collected<T> {
    pub records: Vec<T>,
    pub failures: Vec<FailedPage>,
}

/// Counts returned after a stage has persisted its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub parents: usize,
    pub records: usize,
    pub failures: usize,
}

pub fn failures_file(stage: &str) -> String {
    format!("{}_failures.json", stage)
}

/// Load, crawl every parent, then persist. Under `Abort` nothing is written
/// unless every page succeeded.
pub async fn run<S: Stage>(ctx: &StageContext<'_>) -> Result<StageReport> {
    // a report from an earlier run never describes this one
    let failures_path = ctx.data.path(&failures_file(S::NAME));
    if failures_path.exists() {
        std::fs::remove_file(&failures_path)?;
    }

    let parents = S::load_parents(ctx)?;
    if parents.is_empty() {
        warn!("{}: upstream is empty, writing an empty array", S::NAME);
    }
    info!("{}: crawling {} pages", S::NAME, parents.len());

    let collected = collect::<S>(ctx, &parents).await?;

    store::save_records(&ctx.data.path(S::OUTPUT_FILE), &collected.records)?;

    if !collected.failures.is_empty() {
        warn!(
            "{}: {} pages failed, see {}",
            S::NAME,
            collected.failures.len(),
            failures_path.display()
        );
        store::save_records(&failures_path, &collected.failures)?;
    }

    Ok(StageReport {
        parents: parents.len(),
        records: collected.records.len(),
        failures: collected.failures.len(),
    })
}

/// Fetch each parent's page in order, pausing `ctx.delay` after every fetch.
pub async fn collect<S: Stage>(
    ctx: &StageContext<'_>,
    parents: &[S::Parent],
) -> Result<Collected<S::Output>> {
    let schema = CompiledSchema::compile(&S::schema())?;
    let pb = progress_bar(parents.len());

    let mut records = Vec::new();
    let mut failures = Vec::new();

    for parent in parents {
        let url = S::page_url(&ctx.base_url, parent);
        match fetch_and_extract(ctx.fetcher, &url, &schema).await {
            Ok(rows) => {
                for row in rows {
                    let row: S::Row = extract::into_row(row)?;
                    match S::adopt(parent, row) {
                        Some(record) => records.push(record),
                        None => debug!("{}: dropping row without a link on {}", S::NAME, url),
                    }
                }
            }
            Err(e) => match ctx.policy {
                FailurePolicy::Abort => {
                    pb.abandon();
                    return Err(e);
                }
                FailurePolicy::Skip => {
                    warn!("{}: skipping {}: {}", S::NAME, url, e);
                    failures.push(FailedPage {
                        url,
                        parent_name: S::parent_name(parent).to_string(),
                        error: e.to_string(),
                        failed_at: Utc::now(),
                    });
                }
            },
        }
        pb.inc(1);
        tokio::time::sleep(ctx.delay).await;
    }

    pb.finish_and_clear();
    Ok(Collected { records, failures })
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} (eta {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb
}
