//! Declarative field schemas for the three listing tables.
//!
//! Each listing page is a plain `<table>` whose first row is the header, so
//! every schema uses the same row selector and only the cell selectors differ.

/// Every row except the header.
pub const ROW_SELECTOR: &str = "table tr:nth-child(n+2)";

const NAME_LINK: &str = "td:nth-child(2) a";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Collapsed text content of the matched element
    Text,
    /// Value of the named attribute on the matched element
    Attribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub selector: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn text(name: &str, selector: &str) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            kind: FieldKind::Text,
        }
    }

    pub fn attribute(name: &str, selector: &str, attribute: &str) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            kind: FieldKind::Attribute(attribute.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSchema {
    pub name: String,
    pub base_selector: String,
    pub fields: Vec<FieldSpec>,
}

impl ExtractionSchema {
    pub fn new(name: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.to_string(),
            base_selector: ROW_SELECTOR.to_string(),
            fields,
        }
    }
}

pub fn districts() -> ExtractionSchema {
    ExtractionSchema::new(
        "Extract District data",
        vec![
            FieldSpec::text("district_name", NAME_LINK),
            FieldSpec::attribute("district_url", NAME_LINK, "href"),
            FieldSpec::text("census_code", "td:nth-child(3)"),
            FieldSpec::text("number_of_villages", "td:nth-child(4)"),
        ],
    )
}

pub fn tahsils() -> ExtractionSchema {
    ExtractionSchema::new(
        "Extract Tahsil data",
        vec![
            FieldSpec::text("tahsil_name", NAME_LINK),
            FieldSpec::attribute("tahsil_url", NAME_LINK, "href"),
        ],
    )
}

pub fn villages() -> ExtractionSchema {
    ExtractionSchema::new(
        "Extract Village data",
        vec![
            FieldSpec::text("village_name", NAME_LINK),
            FieldSpec::attribute("village_url", NAME_LINK, "href"),
            FieldSpec::text("village_code", "td:nth-child(3)"),
        ],
    )
}
