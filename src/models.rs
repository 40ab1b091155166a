use serde::{Deserialize, Serialize};

/// A district row as extracted; cells missing from the page come back empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DistrictRow {
    #[serde(default)]
    pub district_name: String,
    #[serde(default)]
    pub district_url: String,
    #[serde(default)]
    pub census_code: String,
    #[serde(default)]
    pub number_of_villages: String,
}

/// One row of the district listing page. Every key is required when read
/// back from `districts.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub district_name: String,
    pub district_url: String,
    pub census_code: String,
    pub number_of_villages: String,
}

impl From<DistrictRow> for District {
    fn from(row: DistrictRow) -> Self {
        Self {
            district_name: row.district_name,
            district_url: row.district_url,
            census_code: row.census_code,
            number_of_villages: row.number_of_villages,
        }
    }
}

/// A tahsil row as extracted, before the district name is stamped on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TahsilRow {
    #[serde(default)]
    pub tahsil_name: String,
    #[serde(default)]
    pub tahsil_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tahsil {
    pub tahsil_name: String,
    pub tahsil_url: String,
    /// Name of the district page this tahsil was listed on.
    pub district_name: String,
}

impl Tahsil {
    pub fn from_row(row: TahsilRow, district: &District) -> Self {
        Self {
            tahsil_name: row.tahsil_name,
            tahsil_url: row.tahsil_url,
            district_name: district.district_name.clone(),
        }
    }
}

/// A village row as extracted, before the tahsil name is stamped on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VillageRow {
    #[serde(default)]
    pub village_name: String,
    #[serde(default)]
    pub village_url: String,
    #[serde(default)]
    pub village_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Village {
    pub village_name: String,
    pub village_url: String,
    pub village_code: String,
    /// Name of the tahsil page this village was listed on.
    pub tahsil_name: String,
}

impl Village {
    pub fn from_row(row: VillageRow, tahsil: &Tahsil) -> Self {
        Self {
            village_name: row.village_name,
            village_url: row.village_url,
            village_code: row.village_code,
            tahsil_name: tahsil.tahsil_name.clone(),
        }
    }
}
