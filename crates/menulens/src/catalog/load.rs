use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::catalog::{CatalogEntry, CatalogIndex};
use crate::ingest::input::decode_bytes;
use crate::money::{AmountError, CURRENCY_SCALE, parse_decimal, round_currency};
use crate::policy::MatchPolicy;
use crate::{LensError, LensResult};

const NAME_HEADERS: [&str; 3] = ["Name", "name", "Item Name"];
const PRICE_HEADERS: [&str; 3] = ["Price", "price", "Menu Price"];
const CATEGORY_HEADERS: [&str; 2] = ["Category", "category"];
const ALCOHOL_HEADERS: [&str; 3] = ["Is Alcohol", "is_alcohol", "Alcohol"];

/// Reads a menu price list and freezes it into a [`CatalogIndex`].
pub fn load_catalog(path: &Path, policy: MatchPolicy) -> LensResult<CatalogIndex> {
    let entries = read_catalog_entries(path)?;
    let index = CatalogIndex::build(entries, policy);
    let stats = index.stats();
    info!(
        path = %path.display(),
        rows = stats.rows_read,
        indexed = stats.indexed,
        placeholders = stats.unpriced_placeholders,
        duplicates = stats.duplicate_names,
        "Loaded menu catalog"
    );
    Ok(index)
}

pub fn read_catalog_entries(path: &Path) -> LensResult<Vec<CatalogEntry>> {
    let bytes = fs::read(path)
        .map_err(|error| LensError::catalog_unreadable(path, &error.to_string()))?;
    let (content, _) = decode_bytes(&bytes);
    parse_catalog(path, &content)
}

pub(crate) fn parse_catalog(path: &Path, content: &str) -> LensResult<Vec<CatalogEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| LensError::catalog_unreadable(path, &error.to_string()))?
        .iter()
        .map(|value| value.trim().to_string())
        .collect::<Vec<String>>();

    let index_by_name = headers
        .iter()
        .enumerate()
        .map(|(index, name)| (name.clone(), index))
        .collect::<HashMap<String, usize>>();

    let (Some(name_index), Some(price_index)) = (
        column_for(&index_by_name, &NAME_HEADERS),
        column_for(&index_by_name, &PRICE_HEADERS),
    ) else {
        return Err(LensError::catalog_schema_mismatch(path, headers));
    };
    let category_index = column_for(&index_by_name, &CATEGORY_HEADERS);
    let alcohol_index = column_for(&index_by_name, &ALCOHOL_HEADERS);

    let mut entries = Vec::new();
    for (row_index, result_row) in reader.records().enumerate() {
        let record = match result_row {
            Ok(record) => record,
            Err(error) => {
                warn!(
                    path = %path.display(),
                    row = row_index + 1,
                    error = %error,
                    "Skipping malformed catalog row"
                );
                // keeps later positions (and therefore item ids) stable
                entries.push(CatalogEntry::default());
                continue;
            }
        };

        let cell = |index: Option<usize>| {
            index
                .and_then(|value| record.get(value))
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let name = cell(Some(name_index)).unwrap_or_default().to_string();
        let price = cell(Some(price_index)).and_then(|value| menu_price(path, &name, value));
        entries.push(CatalogEntry {
            name,
            price,
            category: cell(category_index).map(ToString::to_string),
            is_alcohol: cell(alcohol_index).and_then(parse_flag),
        });
    }

    Ok(entries)
}

// Sub-paise prices are rounded to the paisa; non-numeric ones leave the row
// unpriced.
fn menu_price(path: &Path, name: &str, raw: &str) -> Option<Decimal> {
    match parse_decimal(raw) {
        Ok(value) if value.scale() > CURRENCY_SCALE => {
            let rounded = round_currency(value);
            warn!(
                path = %path.display(),
                item = %name,
                raw_price = %raw,
                rounded = %rounded,
                "Rounded catalog price with more than two decimal places"
            );
            Some(rounded)
        }
        Ok(value) => Some(value),
        Err(AmountError::Blank) => None,
        Err(AmountError::NotNumeric | AmountError::TooPrecise) => {
            warn!(
                path = %path.display(),
                item = %name,
                raw_price = %raw,
                "Catalog price is not a number; treating the row as unpriced"
            );
            None
        }
    }
}

fn column_for(index_by_name: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| index_by_name.get(*alias).copied())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}
