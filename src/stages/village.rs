use crate::config::BaseUrl;
use crate::error::Result;
use crate::models::{Tahsil, Village, VillageRow};
use crate::schema::{self, ExtractionSchema};
use crate::store::{load_records, TAHSILS_FILE, VILLAGES_FILE};

use super::{Stage, StageContext};

/// `tahsil.json` → one page per tahsil → `villages.json`.
pub struct VillageStage;

impl Stage for VillageStage {
    type Parent = Tahsil;
    type Row = VillageRow;
    type Output = Village;

    const NAME: &'static str = "villages";
    const OUTPUT_FILE: &'static str = VILLAGES_FILE;

    fn schema() -> ExtractionSchema {
        schema::villages()
    }

    fn load_parents(ctx: &StageContext<'_>) -> Result<Vec<Tahsil>> {
        load_records(&ctx.data.path(TAHSILS_FILE))
    }

    fn page_url(base: &BaseUrl, tahsil: &Tahsil) -> String {
        base.join(&tahsil.tahsil_url)
    }

    fn parent_name(tahsil: &Tahsil) -> &str {
        &tahsil.tahsil_name
    }

    fn adopt(tahsil: &Tahsil, row: VillageRow) -> Option<Village> {
        Some(Village::from_row(row, tahsil))
    }
}
