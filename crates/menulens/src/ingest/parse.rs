use std::collections::HashMap;
use std::path::Path;

use crate::contracts::types::RowIssue;
use crate::{LensError, LensResult};

// How far into a file the header row may appear after preamble lines.
const MAX_PREAMBLE_LINES: usize = 10;

const ORDER_ID_HEADERS: [&str; 4] = ["Order No.", "order_id", "Order No", "Order ID"];
const ITEMS_HEADERS: [&str; 2] = ["Items", "items"];
const TOTAL_HEADERS: [&str; 3] = ["My Amount (₹)", "order_total", "Total"];
const TOTAL_HEADER_PREFIX: &str = "My Amount";
const CREATED_HEADERS: [&str; 3] = ["Created", "order_datetime", "Created At"];
const ORDER_TYPE_HEADERS: [&str; 2] = ["Order Type", "order_type"];
const SUB_ORDER_TYPE_HEADERS: [&str; 2] = ["Sub Order Type", "sub_order_type"];
const PAYMENT_TYPE_HEADERS: [&str; 2] = ["Payment Type", "payment_type"];
const STATUS_HEADERS: [&str; 2] = ["Status", "status"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRow {
    pub row: i64,
    pub order_id: Option<String>,
    pub items: Option<String>,
    pub total: Option<String>,
    pub created: Option<String>,
    pub order_type: Option<String>,
    pub sub_order_type: Option<String>,
    pub payment_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub headers: Vec<String>,
    pub preamble_lines: usize,
    pub rows: Vec<ParsedRow>,
    pub issues: Vec<RowIssue>,
}

impl ParsedSource {
    /// Data records seen, including malformed ones.
    pub fn rows_read(&self) -> usize {
        self.rows.len()
            + self
                .issues
                .iter()
                .filter(|issue| issue.code == "malformed_record")
                .count()
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    order_id: usize,
    items: usize,
    total: usize,
    created: usize,
    order_type: Option<usize>,
    sub_order_type: Option<usize>,
    payment_type: Option<usize>,
    status: Option<usize>,
}

/// Splits a POS export into raw rows keyed by canonical field.
///
/// Leading lines before the header (the export's `Table ...` banner) are
/// skipped. A file whose header lacks a required column is rejected as a
/// whole; malformed records only become row issues.
pub fn parse_source(path: &Path, content: &str) -> LensResult<ParsedSource> {
    if content.trim().is_empty() {
        return Err(LensError::source_empty(path));
    }

    let (preamble_lines, body) = split_preamble(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| LensError::source_unreadable(path, &error.to_string()))?
        .iter()
        .map(|value| value.trim().to_string())
        .collect::<Vec<String>>();

    let Some(columns) = resolve_columns(&headers) else {
        return Err(LensError::source_schema_mismatch(
            path,
            required_headers(),
            headers,
        ));
    };

    let mut rows = Vec::new();
    let mut issues = Vec::new();
    for (row_index, result_row) in reader.records().enumerate() {
        let row = (row_index as i64) + 1;
        let record = match result_row {
            Ok(record) => record,
            Err(error) => {
                issues.push(RowIssue {
                    row,
                    field: "record".to_string(),
                    code: "malformed_record".to_string(),
                    description: format!("CSV record could not be read: {error}"),
                });
                continue;
            }
        };

        let value = |index: Option<usize>| {
            index
                .and_then(|value| record.get(value))
                .map(ToString::to_string)
        };

        rows.push(ParsedRow {
            row,
            order_id: value(Some(columns.order_id)),
            items: value(Some(columns.items)),
            total: value(Some(columns.total)),
            created: value(Some(columns.created)),
            order_type: value(columns.order_type),
            sub_order_type: value(columns.sub_order_type),
            payment_type: value(columns.payment_type),
            status: value(columns.status),
        });
    }

    Ok(ParsedSource {
        headers,
        preamble_lines,
        rows,
        issues,
    })
}

pub fn required_headers() -> Vec<String> {
    [
        ORDER_ID_HEADERS[0],
        ITEMS_HEADERS[0],
        TOTAL_HEADERS[0],
        CREATED_HEADERS[0],
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn split_preamble(content: &str) -> (usize, &str) {
    let mut offset = 0;
    for (line_index, line) in content.split_inclusive('\n').enumerate() {
        if line_index >= MAX_PREAMBLE_LINES {
            break;
        }
        if looks_like_header(line) {
            return (line_index, &content[offset..]);
        }
        offset += line.len();
    }

    // No recognizable header: hand back the first non-blank line so the
    // schema error reports what the file actually starts with.
    let mut offset = 0;
    for (line_index, line) in content.split_inclusive('\n').enumerate() {
        if !line.trim().is_empty() {
            return (line_index, &content[offset..]);
        }
        offset += line.len();
    }
    (0, content)
}

fn looks_like_header(line: &str) -> bool {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let Some(Ok(record)) = reader.records().next() else {
        return false;
    };
    let cells = record
        .iter()
        .map(|value| value.trim().to_string())
        .collect::<Vec<String>>();
    let index_by_name = index_by_name(&cells);
    column_for(&index_by_name, &ORDER_ID_HEADERS).is_some()
        && column_for(&index_by_name, &ITEMS_HEADERS).is_some()
}

fn resolve_columns(headers: &[String]) -> Option<ColumnMap> {
    let index_by_name = index_by_name(headers);
    let total = column_for(&index_by_name, &TOTAL_HEADERS).or_else(|| {
        headers
            .iter()
            .position(|header| header.starts_with(TOTAL_HEADER_PREFIX))
    });

    Some(ColumnMap {
        order_id: column_for(&index_by_name, &ORDER_ID_HEADERS)?,
        items: column_for(&index_by_name, &ITEMS_HEADERS)?,
        total: total?,
        created: column_for(&index_by_name, &CREATED_HEADERS)?,
        order_type: column_for(&index_by_name, &ORDER_TYPE_HEADERS),
        sub_order_type: column_for(&index_by_name, &SUB_ORDER_TYPE_HEADERS),
        payment_type: column_for(&index_by_name, &PAYMENT_TYPE_HEADERS),
        status: column_for(&index_by_name, &STATUS_HEADERS),
    })
}

fn index_by_name(headers: &[String]) -> HashMap<&str, usize> {
    let mut index_by_name = HashMap::new();
    for (index, name) in headers.iter().enumerate() {
        index_by_name.entry(name.as_str()).or_insert(index);
    }
    index_by_name
}

fn column_for(index_by_name: &HashMap<&str, usize>, aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| index_by_name.get(alias).copied())
}
