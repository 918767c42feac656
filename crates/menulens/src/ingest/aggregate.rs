use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::contracts::types::{RowIssue, SourceReport};
use crate::ingest::Order;
use crate::ingest::input::{read_source, source_labels};
use crate::ingest::parse::parse_source;
use crate::ingest::validate::validate_rows;
use crate::{LensError, LensResult};

#[derive(Debug, Clone, Default)]
pub struct AggregatedSources {
    /// Orders from every source, in input order then row order.
    pub orders: Vec<Order>,
    pub reports: Vec<SourceReport>,
}

/// Reads every export independently and concatenates the surviving orders.
///
/// All reads finish before this returns, so allocation never touches I/O.
pub fn aggregate_sources(paths: &[PathBuf]) -> LensResult<AggregatedSources> {
    if paths.is_empty() {
        return Err(LensError::no_sources());
    }

    let mut seen_paths: HashSet<PathBuf> = HashSet::new();
    for path in paths {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        if !seen_paths.insert(key) {
            return Err(LensError::duplicate_source(path));
        }
    }

    let mut aggregated = AggregatedSources::default();
    let mut first_seen: HashMap<String, (String, i64)> = HashMap::new();
    for (path, label) in paths.iter().zip(source_labels(paths)) {
        let (orders, report) = ingest_source(path, label, &mut first_seen)?;
        aggregated.orders.extend(orders);
        aggregated.reports.push(report);
    }

    info!(
        sources = aggregated.reports.len(),
        orders = aggregated.orders.len(),
        "Aggregated transaction sources"
    );
    Ok(aggregated)
}

fn ingest_source(
    path: &Path,
    label: String,
    first_seen: &mut HashMap<String, (String, i64)>,
) -> LensResult<(Vec<Order>, SourceReport)> {
    let mut source = read_source(path)?;
    source.source_file = label;
    let parsed = parse_source(path, &source.content)?;
    let rows_read = parsed.rows_read();
    let mut issues = parsed.issues;
    let mut rows_skipped = issues.len();

    let validated = validate_rows(&source.source_file, parsed.rows);
    rows_skipped += validated.rows_skipped;
    issues.extend(validated.issues);

    let mut orders = Vec::with_capacity(validated.orders.len());
    for order in validated.orders {
        if let Some((kept_file, kept_row)) = first_seen.get(&order.order_id) {
            warn!(
                order_id = %order.order_id,
                kept_file = %kept_file,
                kept_row = *kept_row,
                skipped_row = order.source_row,
                "Skipping order with colliding id"
            );
            issues.push(RowIssue {
                row: order.source_row,
                field: "order_id".to_string(),
                code: "duplicate_order_id".to_string(),
                description: format!(
                    "Order id `{}` was already read from {kept_file} row {kept_row}.",
                    order.order_id
                ),
            });
            rows_skipped += 1;
            continue;
        }
        first_seen.insert(
            order.order_id.clone(),
            (order.source_file.clone(), order.source_row),
        );
        orders.push(order);
    }

    issues.sort_by_key(|issue| issue.row);
    for issue in &issues {
        debug!(
            source = %source.source_file,
            row = issue.row,
            code = %issue.code,
            "Skipped transaction row"
        );
    }
    info!(
        source = %source.source_file,
        encoding = source.encoding.as_str(),
        rows_read,
        rows_parsed = orders.len(),
        rows_skipped,
        "Parsed transaction source"
    );

    let report = SourceReport {
        source_file: source.source_file,
        path: path.display().to_string(),
        encoding: source.encoding.as_str().to_string(),
        rows_read,
        rows_parsed: orders.len(),
        rows_skipped,
        issues,
    };
    Ok((orders, report))
}
