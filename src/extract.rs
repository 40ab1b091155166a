use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{CrawlError, Result};
use crate::schema::{ExtractionSchema, FieldKind};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// One table row: field name to extracted string.
pub type Record = Map<String, Value>;

/// A schema with every selector parsed, ready to run against documents.
pub struct CompiledSchema {
    base: Selector,
    fields: Vec<(String, Selector, FieldKind)>,
}

impl CompiledSchema {
    pub fn compile(schema: &ExtractionSchema) -> Result<Self> {
        let base = parse_selector(&schema.base_selector)?;
        let fields = schema
            .fields
            .iter()
            .map(|f| Ok((f.name.clone(), parse_selector(&f.selector)?, f.kind.clone())))
            .collect::<Result<Vec<_>>>()?;
        debug!("Compiled '{}' with {} fields", schema.name, fields.len());
        Ok(Self { base, fields })
    }

    pub fn extract(&self, html: &str) -> Vec<Record> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();

        for row in document.select(&self.base) {
            let record = self.extract_row(row);
            if record.is_empty() {
                debug!("Dropping row with no matching fields");
                continue;
            }
            records.push(record);
        }

        records
    }

    fn extract_row(&self, row: ElementRef<'_>) -> Record {
        let mut record = Record::new();
        for (name, selector, kind) in &self.fields {
            let Some(el) = row.select(selector).next() else {
                continue;
            };
            let value = match kind {
                FieldKind::Text => Some(clean_text(&el.text().collect::<String>())),
                FieldKind::Attribute(attr) => el.value().attr(attr).map(str::to_string),
            };
            if let Some(value) = value {
                record.insert(name.clone(), Value::String(value));
            }
        }
        record
    }
}

/// Convert an extracted record into its typed row.
pub fn into_row<T: DeserializeOwned>(record: Record) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| CrawlError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn clean_text(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistrictRow, TahsilRow, VillageRow};
    use crate::schema::{self, FieldSpec};

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn extract(html: &str, schema: &ExtractionSchema) -> Result<Vec<Record>> {
        Ok(CompiledSchema::compile(schema)?.extract(html))
    }

    #[test]
    fn districts_fixture_skips_header() {
        let records = extract(&fixture("districts"), &schema::districts()).unwrap();
        assert_eq!(records.len(), 3);

        let first: DistrictRow = into_row(records[0].clone()).unwrap();
        assert_eq!(first.district_name, "Ahmednagar");
        assert_eq!(first.district_url, "/maharashtra/ahmednagar");
        assert_eq!(first.census_code, "522");
        assert_eq!(first.number_of_villages, "1,581");
    }

    #[test]
    fn text_whitespace_is_collapsed() {
        let records = extract(&fixture("districts"), &schema::districts()).unwrap();
        let last: DistrictRow = into_row(records[2].clone()).unwrap();
        assert_eq!(last.district_name, "Pune City");
    }

    #[test]
    fn tahsils_fixture() {
        let records = extract(&fixture("tahsils"), &schema::tahsils()).unwrap();
        let rows: Vec<TahsilRow> = records.into_iter().map(|r| into_row(r).unwrap()).collect();
        let names: Vec<&str> = rows.iter().map(|r| r.tahsil_name.as_str()).collect();
        assert_eq!(names, ["Akole", "Sangamner", "Kopargaon"]);
        assert_eq!(rows[1].tahsil_url, "/maharashtra/ahmednagar/sangamner");
    }

    #[test]
    fn villages_fixture_drops_rows_without_cells() {
        let records = extract(&fixture("villages"), &schema::villages()).unwrap();
        // the spacer row carries no link and no code cell
        assert_eq!(records.len(), 2);
        let row: VillageRow = into_row(records[0].clone()).unwrap();
        assert_eq!(row.village_name, "Ambad");
        assert_eq!(row.village_code, "556001");
    }

    #[test]
    fn missing_attribute_leaves_field_out() {
        let html = r#"<table>
            <tr><th>#</th><th>Name</th></tr>
            <tr><td>1</td><td><a>No link</a></td></tr>
        </table>"#;
        let records = extract(html, &schema::tahsils()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("tahsil_name"), Some(&Value::from("No link")));
        assert!(records[0].get("tahsil_url").is_none());
    }

    #[test]
    fn no_table_yields_nothing() {
        let records = extract("<p>maintenance</p>", &schema::villages()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn invalid_selector_is_reported() {
        let bad = ExtractionSchema::new("bad", vec![FieldSpec::text("x", "td:::")]);
        let err = CompiledSchema::compile(&bad).err().unwrap();
        assert!(matches!(err, CrawlError::Selector { ref selector, .. } if selector == "td:::"));
    }
}
