//! Catalog Index: the normalized, read-only vehicle/dealer table and the
//! manufacturer → models lookup used by entity resolution.
//!
//! Both are built once and never mutated. A refresh builds a new [`Catalog`]
//! and swaps the shared handle (see [`crate::state::AppState::reload_catalog`]).

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use crate::error::DataLoadError;
use crate::models::{CatalogRecord, Dealer};

/// Logical column → accepted header spellings (first match wins).
const COLUMNS: &[(&str, &[&str])] = &[
    ("manufacturer", &["zl_manufacturer", "manufacturer"]),
    ("model", &["zl_model", "model"]),
    ("price", &["price"]),
    ("origin", &["origin"]),
    ("year", &["year"]),
    ("fuel", &["fuel"]),
    ("region", &["region"]),
    ("gearbox", &["gearbox"]),
    ("lower_bound", &["lower_bound"]),
    ("upper_bound", &["upper_bound"]),
    ("city", &["zl_city", "city"]),
    ("contact", &["updated_contact", "contact"]),
    ("seller", &["zl_seller", "seller"]),
    ("mileage", &["mileage km", "mileage"]),
];

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
    index: ManufacturerIndex,
}

/// Normalized manufacturer name → set of model names seen under it.
#[derive(Debug, Clone, Default)]
pub struct ManufacturerIndex {
    models: BTreeMap<String, BTreeSet<String>>,
}

impl ManufacturerIndex {
    fn build(records: &[CatalogRecord]) -> Self {
        let mut models: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for r in records {
            if r.manufacturer.is_empty() {
                continue;
            }
            let entry = models.entry(r.manufacturer.clone()).or_default();
            if !r.model.is_empty() {
                entry.insert(r.model.clone());
            }
        }
        Self { models }
    }

    pub fn manufacturers(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Models registered under `manufacturer`, or `None` if it is unknown.
    pub fn models(&self, manufacturer: &str) -> Option<impl Iterator<Item = &str>> {
        self.models
            .get(manufacturer)
            .map(|set| set.iter().map(String::as_str))
    }

    pub fn contains(&self, manufacturer: &str) -> bool {
        self.models.contains_key(manufacturer)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Catalog {
    /// Load and normalize the catalog CSV at `path`.
    pub fn load(path: &Path) -> Result<Self, DataLoadError> {
        let file = std::fs::File::open(path)?;
        let catalog = Self::from_reader(file)?;
        tracing::info!(
            "Loaded {} records ({} manufacturers) from {}",
            catalog.records.len(),
            catalog.index.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataLoadError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut positions = [0usize; COLUMNS.len()];
        for (slot, (name, aliases)) in positions.iter_mut().zip(COLUMNS) {
            *slot = aliases
                .iter()
                .find_map(|alias| headers.iter().position(|h| h.eq_ignore_ascii_case(alias)))
                .ok_or_else(|| DataLoadError::MissingColumn(name.to_string()))?;
        }

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row?;
            let cell = |col: usize| row.get(positions[col]).unwrap_or("");
            records.push(CatalogRecord {
                manufacturer: cell(0).to_string(),
                model: cell(1).to_string(),
                price: parse_amount(cell(2)),
                origin: cell(3).to_string(),
                year: cell(4).trim().to_string(),
                fuel: cell(5).trim().to_string(),
                gearbox: cell(7).trim().to_string(),
                lower_bound: parse_amount(cell(8)),
                upper_bound: parse_amount(cell(9)),
                mileage: cell(13).trim().to_string(),
                dealer: Dealer {
                    region: cell(6).to_string(),
                    city: cell(10).to_string(),
                    contact: cell(11).trim().to_string(),
                    seller: cell(12).to_string(),
                },
            });
        }

        Ok(Self::from_records(records))
    }

    /// Build a catalog from already-parsed rows, applying the same normalization as a load.
    pub fn from_records(records: Vec<CatalogRecord>) -> Self {
        let records: Vec<CatalogRecord> = records.into_iter().map(normalize).collect();
        let index = ManufacturerIndex::build(&records);
        Self { records, index }
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn index(&self) -> &ManufacturerIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn normalize(mut r: CatalogRecord) -> CatalogRecord {
    r.manufacturer = r.manufacturer.trim().to_lowercase();
    r.model = r.model.trim().to_lowercase();
    r.origin = r.origin.trim().to_lowercase();
    r.dealer.city = r.dealer.city.trim().to_lowercase();
    r.dealer.region = r.dealer.region.trim().to_lowercase();
    r.dealer.seller = title_case(r.dealer.seller.trim());
    r
}

/// Tolerant numeric parse: anything unparseable becomes an absent value.
fn parse_amount(cell: &str) -> Option<f64> {
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
