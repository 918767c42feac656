use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::DateTime;
use rusqlite::{Transaction, TransactionBehavior, params};
use rust_decimal::Decimal;
use tracing::info;
use ulid::Ulid;

use crate::allocation::batch::AllocatedOrder;
use crate::catalog::CatalogIndex;
use crate::contracts::types::RunSummary;
use crate::ingest::ORDER_DATETIME_FORMAT;
use crate::store::Store;
use crate::store::sqlite_failure;
use crate::{LensError, LensResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistResult {
    pub run_id: String,
    pub orders_written: usize,
    pub items_written: usize,
}

pub struct PersistInput<'a> {
    pub summary: &'a RunSummary,
    pub orders: &'a [AllocatedOrder],
    pub catalog: &'a CatalogIndex,
}

/// Writes one analysis run, its orders and its allocated items atomically.
pub fn persist_dataset(store: &mut Store, input: PersistInput<'_>) -> LensResult<PersistResult> {
    let run_id = format!("run_{}", Ulid::new());
    let created_at = now_timestamp();
    let db_path = store.db_path().to_path_buf();

    let sources_json = serde_json::to_string(&input.summary.sources)
        .map_err(|error| LensError::internal_serialization(&error.to_string()))?;
    let mut summary = input.summary.clone();
    summary.run_id = Some(run_id.clone());
    let summary_json = serde_json::to_string(&summary)
        .map_err(|error| LensError::internal_serialization(&error.to_string()))?;
    let total_revenue = input
        .orders
        .iter()
        .map(|allocated| allocated.allocation.allocated_total())
        .sum::<Decimal>();
    let items_count = input
        .orders
        .iter()
        .map(|allocated| allocated.allocation.items.len())
        .sum::<usize>();

    let transaction = store
        .connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|error| sqlite_failure(&db_path, &error))?;

    transaction
        .execute(
            "INSERT INTO analysis_runs (
                run_id,
                created_at,
                policy_version,
                sources_json,
                orders_count,
                items_count,
                total_revenue,
                summary_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &run_id,
                &created_at,
                &input.summary.policy_version,
                &sources_json,
                to_sql_count(input.orders.len()),
                to_sql_count(items_count),
                total_revenue.to_string(),
                &summary_json
            ],
        )
        .map_err(|error| sqlite_failure(&db_path, &error))?;

    let mut items_written = 0_usize;
    for allocated in input.orders {
        insert_order(&transaction, &db_path, &run_id, allocated)?;
        items_written += insert_items(&transaction, &db_path, &run_id, allocated, input.catalog)?;
    }

    transaction
        .commit()
        .map_err(|error| sqlite_failure(&db_path, &error))?;

    info!(
        run_id = %run_id,
        orders = input.orders.len(),
        items = items_written,
        "persisted analysis run"
    );
    Ok(PersistResult {
        run_id,
        orders_written: input.orders.len(),
        items_written,
    })
}

fn insert_order(
    transaction: &Transaction<'_>,
    db_path: &Path,
    run_id: &str,
    allocated: &AllocatedOrder,
) -> LensResult<()> {
    let order = &allocated.order;
    let audit_json = allocated
        .allocation
        .audit
        .map(|audit| serde_json::to_string(&audit))
        .transpose()
        .map_err(|error| LensError::internal_serialization(&error.to_string()))?;

    transaction
        .execute(
            "INSERT INTO orders (
                run_id,
                order_id,
                external_id,
                source_file,
                source_row,
                order_datetime,
                order_total,
                order_type,
                sub_order_type,
                service_zone,
                table_number,
                payment_type,
                status,
                allocation_path,
                audit_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                run_id,
                &order.order_id,
                &order.external_id,
                &order.source_file,
                order.source_row,
                order.formatted_datetime(),
                order.order_total.to_string(),
                &order.order_type,
                &order.sub_order_type,
                &order.service_zone,
                &order.table_number,
                &order.payment_type,
                &order.status,
                allocated.allocation.path.as_str(),
                &audit_json
            ],
        )
        .map_err(|error| sqlite_failure(db_path, &error))?;
    Ok(())
}

fn insert_items(
    transaction: &Transaction<'_>,
    db_path: &Path,
    run_id: &str,
    allocated: &AllocatedOrder,
    catalog: &CatalogIndex,
) -> LensResult<usize> {
    let mut statement = transaction
        .prepare_cached(
            "INSERT INTO order_items (
                run_id,
                order_id,
                line_number,
                raw_name,
                normalized_name,
                quantity,
                catalog_item_id,
                candidate_item_id,
                catalog_name,
                menu_price,
                allocated_price,
                confidence,
                match_score,
                allocation_method,
                reconciliation_adjustment
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .map_err(|error| sqlite_failure(db_path, &error))?;

    for item in &allocated.allocation.items {
        let catalog_name = item
            .catalog_item_id
            .and_then(|id| catalog.get(id))
            .map(|catalog_item| catalog_item.name.clone());
        statement
            .execute(params![
                run_id,
                &allocated.order.order_id,
                to_sql_count(item.line_number),
                &item.raw_name,
                &item.normalized_name,
                item.quantity,
                item.catalog_item_id.map(|id| to_sql_count(id.0)),
                item.candidate_item_id.map(|id| to_sql_count(id.0)),
                &catalog_name,
                item.menu_price.map(|price| price.to_string()),
                item.allocated_price.to_string(),
                item.confidence.as_str(),
                item.match_score,
                item.allocation_method.as_str(),
                item.reconciliation_adjustment.to_string()
            ])
            .map_err(|error| sqlite_failure(db_path, &error))?;
    }
    Ok(allocated.allocation.items.len())
}

pub(crate) fn now_timestamp() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0);
    DateTime::from_timestamp(i64::try_from(seconds).unwrap_or(0), 0)
        .map(|moment| moment.naive_utc().format(ORDER_DATETIME_FORMAT).to_string())
        .unwrap_or_else(|| "1970-01-01 00:00:00".to_string())
}

fn to_sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
