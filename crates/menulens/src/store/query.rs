use std::path::Path;
use std::str::FromStr;

use rusqlite::{OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::allocation::AllocationMethod;
use crate::catalog::CatalogItemId;
use crate::catalog::matcher::Confidence;
use crate::contracts::types::AllocatedItemRecord;
use crate::store::Store;
use crate::store::sqlite_failure;
use crate::{LensError, LensResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRun {
    pub run_id: String,
    pub created_at: String,
    pub policy_version: String,
    pub orders_count: i64,
    pub items_count: i64,
    pub total_revenue: Decimal,
}

/// Raw column values of one `order_items` row joined with its order.
struct ItemColumns {
    order_id: String,
    source_file: String,
    order_datetime: String,
    line_number: i64,
    raw_name: String,
    normalized_name: String,
    quantity: u32,
    catalog_item_id: Option<i64>,
    candidate_item_id: Option<i64>,
    catalog_name: Option<String>,
    menu_price: Option<String>,
    allocated_price: String,
    confidence: String,
    match_score: Option<f64>,
    allocation_method: String,
    reconciliation_adjustment: String,
}

/// Stored runs, newest first.
pub fn list_runs(store: &Store) -> LensResult<Vec<StoredRun>> {
    let db_path = store.db_path();
    let mut statement = store
        .connection
        .prepare(
            "SELECT run_id, created_at, policy_version, orders_count, items_count, total_revenue
             FROM analysis_runs
             ORDER BY created_at DESC, run_id DESC",
        )
        .map_err(|error| sqlite_failure(db_path, &error))?;

    let rows = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })
        .map_err(|error| sqlite_failure(db_path, &error))?;

    let mut runs = Vec::new();
    for row in rows {
        let (run_id, created_at, policy_version, orders_count, items_count, total_revenue) =
            row.map_err(|error| sqlite_failure(db_path, &error))?;
        runs.push(StoredRun {
            run_id,
            created_at,
            policy_version,
            orders_count,
            items_count,
            total_revenue: parse_decimal(db_path, &total_revenue)?,
        });
    }
    Ok(runs)
}

/// Reads back the item-level revenue dataset of one run in input order.
pub fn load_items(store: &Store, run_id: &str) -> LensResult<Vec<AllocatedItemRecord>> {
    let db_path = store.db_path();
    ensure_run_exists(store, run_id)?;

    let mut statement = store
        .connection
        .prepare(
            "SELECT
                i.order_id,
                o.source_file,
                o.order_datetime,
                i.line_number,
                i.raw_name,
                i.normalized_name,
                i.quantity,
                i.catalog_item_id,
                i.candidate_item_id,
                i.catalog_name,
                i.menu_price,
                i.allocated_price,
                i.confidence,
                i.match_score,
                i.allocation_method,
                i.reconciliation_adjustment
             FROM order_items i
             JOIN orders o ON o.run_id = i.run_id AND o.order_id = i.order_id
             WHERE i.run_id = ?1
             ORDER BY o.rowid, i.line_number",
        )
        .map_err(|error| sqlite_failure(db_path, &error))?;

    let rows = statement
        .query_map([run_id], read_item_columns)
        .map_err(|error| sqlite_failure(db_path, &error))?;

    let mut records = Vec::new();
    for row in rows {
        let columns = row.map_err(|error| sqlite_failure(db_path, &error))?;
        records.push(to_record(db_path, columns)?);
    }
    Ok(records)
}

/// The serialized run summary stored alongside a run.
pub fn load_summary(store: &Store, run_id: &str) -> LensResult<serde_json::Value> {
    let db_path = store.db_path();
    let summary_json = store
        .connection
        .query_row(
            "SELECT summary_json FROM analysis_runs WHERE run_id = ?1 LIMIT 1",
            [run_id],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| sqlite_failure(db_path, &error))?
        .ok_or_else(|| LensError::run_not_found(run_id))?;

    serde_json::from_str(&summary_json).map_err(|_| LensError::store_corrupt(db_path))
}

fn ensure_run_exists(store: &Store, run_id: &str) -> LensResult<()> {
    let db_path = store.db_path();
    let exists = store
        .connection
        .query_row(
            "SELECT 1 FROM analysis_runs WHERE run_id = ?1 LIMIT 1",
            [run_id],
            |_row| Ok(true),
        )
        .optional()
        .map_err(|error| sqlite_failure(db_path, &error))?
        .unwrap_or(false);

    if exists {
        return Ok(());
    }
    Err(LensError::run_not_found(run_id))
}

fn read_item_columns(row: &Row<'_>) -> rusqlite::Result<ItemColumns> {
    Ok(ItemColumns {
        order_id: row.get(0)?,
        source_file: row.get(1)?,
        order_datetime: row.get(2)?,
        line_number: row.get(3)?,
        raw_name: row.get(4)?,
        normalized_name: row.get(5)?,
        quantity: row.get(6)?,
        catalog_item_id: row.get(7)?,
        candidate_item_id: row.get(8)?,
        catalog_name: row.get(9)?,
        menu_price: row.get(10)?,
        allocated_price: row.get(11)?,
        confidence: row.get(12)?,
        match_score: row.get(13)?,
        allocation_method: row.get(14)?,
        reconciliation_adjustment: row.get(15)?,
    })
}

fn to_record(db_path: &Path, columns: ItemColumns) -> LensResult<AllocatedItemRecord> {
    let confidence =
        Confidence::parse(&columns.confidence).ok_or_else(|| LensError::store_corrupt(db_path))?;
    let allocation_method = AllocationMethod::parse(&columns.allocation_method)
        .ok_or_else(|| LensError::store_corrupt(db_path))?;
    let menu_price = columns
        .menu_price
        .as_deref()
        .map(|value| parse_decimal(db_path, value))
        .transpose()?;

    Ok(AllocatedItemRecord {
        order_id: columns.order_id,
        source_file: columns.source_file,
        order_datetime: columns.order_datetime,
        line_number: to_index(db_path, columns.line_number)?,
        raw_name: columns.raw_name,
        normalized_name: columns.normalized_name,
        quantity: columns.quantity,
        catalog_item_id: to_item_id(db_path, columns.catalog_item_id)?,
        candidate_item_id: to_item_id(db_path, columns.candidate_item_id)?,
        catalog_name: columns.catalog_name,
        menu_price,
        allocated_price: parse_decimal(db_path, &columns.allocated_price)?,
        confidence,
        match_score: columns.match_score,
        allocation_method,
        reconciliation_adjustment: parse_decimal(db_path, &columns.reconciliation_adjustment)?,
    })
}

fn parse_decimal(db_path: &Path, value: &str) -> LensResult<Decimal> {
    Decimal::from_str(value).map_err(|_| LensError::store_corrupt(db_path))
}

fn to_index(db_path: &Path, value: i64) -> LensResult<usize> {
    usize::try_from(value).map_err(|_| LensError::store_corrupt(db_path))
}

fn to_item_id(db_path: &Path, value: Option<i64>) -> LensResult<Option<CatalogItemId>> {
    value
        .map(|raw| to_index(db_path, raw).map(CatalogItemId))
        .transpose()
}
