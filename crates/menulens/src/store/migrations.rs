use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

const BOOTSTRAP_SQL: &str = include_str!("migrations/0001_bootstrap.sql");

pub const EXPECTED_USER_VERSION: i64 = 1;
pub const EXPECTED_SCHEMA_VERSION: &str = "v1";

const STORE_META_COLUMNS: [&str; 2] = ["key", "value"];
const ANALYSIS_RUNS_COLUMNS: [&str; 8] = [
    "run_id",
    "created_at",
    "policy_version",
    "sources_json",
    "orders_count",
    "items_count",
    "total_revenue",
    "summary_json",
];
const ORDERS_COLUMNS: [&str; 15] = [
    "run_id",
    "order_id",
    "external_id",
    "source_file",
    "source_row",
    "order_datetime",
    "order_total",
    "order_type",
    "sub_order_type",
    "service_zone",
    "table_number",
    "payment_type",
    "status",
    "allocation_path",
    "audit_json",
];
const ORDER_ITEMS_COLUMNS: [&str; 15] = [
    "run_id",
    "order_id",
    "line_number",
    "raw_name",
    "normalized_name",
    "quantity",
    "catalog_item_id",
    "candidate_item_id",
    "catalog_name",
    "menu_price",
    "allocated_price",
    "confidence",
    "match_score",
    "allocation_method",
    "reconciliation_adjustment",
];

pub const REQUIRED_TABLES: [(&str, &[&str]); 4] = [
    ("store_meta", &STORE_META_COLUMNS),
    ("analysis_runs", &ANALYSIS_RUNS_COLUMNS),
    ("orders", &ORDERS_COLUMNS),
    ("order_items", &ORDER_ITEMS_COLUMNS),
];

pub const REQUIRED_INDEX_NAMES: [&str; 2] = [
    "idx_orders_run_datetime",
    "idx_order_items_run_catalog_item",
];

pub fn run_pending(conn: &mut Connection) -> rusqlite_migration::Result<()> {
    let migrations = Migrations::new(vec![M::up(BOOTSTRAP_SQL)]);
    migrations.to_latest(conn)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{EXPECTED_USER_VERSION, run_pending};

    #[test]
    fn migrating_in_memory_sets_user_version() {
        let opened = Connection::open_in_memory();
        assert!(opened.is_ok());
        if let Ok(mut connection) = opened {
            assert!(run_pending(&mut connection).is_ok());
            let version = connection.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0));
            assert!(matches!(version, Ok(value) if value == EXPECTED_USER_VERSION));
            // rerunning is a no-op
            assert!(run_pending(&mut connection).is_ok());
        }
    }
}
