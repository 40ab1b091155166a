use crate::config::BaseUrl;
use crate::error::Result;
use crate::models::{District, DistrictRow};
use crate::schema::{self, ExtractionSchema};
use crate::store::DISTRICTS_FILE;

use super::{Stage, StageContext};

/// The single listing page the crawl starts from.
#[derive(Debug, Clone)]
pub struct Seed {
    pub url: String,
}

/// Seed listing page → `districts.json`.
pub struct DistrictStage;

impl Stage for DistrictStage {
    type Parent = Seed;
    type Row = DistrictRow;
    type Output = District;

    const NAME: &'static str = "districts";
    const OUTPUT_FILE: &'static str = DISTRICTS_FILE;

    fn schema() -> ExtractionSchema {
        schema::districts()
    }

    fn load_parents(ctx: &StageContext<'_>) -> Result<Vec<Seed>> {
        Ok(vec![Seed {
            url: ctx.seed_url.clone(),
        }])
    }

    fn page_url(base: &BaseUrl, seed: &Seed) -> String {
        base.join(&seed.url)
    }

    fn parent_name(seed: &Seed) -> &str {
        &seed.url
    }

    fn adopt(_seed: &Seed, row: DistrictRow) -> Option<District> {
        if row.district_url.trim().is_empty() {
            return None;
        }
        Some(row.into())
    }
}
