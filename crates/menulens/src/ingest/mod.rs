pub mod aggregate;
pub mod input;
pub mod parse;
pub mod validate;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Display layout for order timestamps in reports and the store.
pub const ORDER_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One transaction header from a POS export.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// `<source_file>#<external_id>`, unique across a run.
    pub order_id: String,
    pub external_id: String,
    pub order_datetime: NaiveDateTime,
    pub order_total: Decimal,
    pub order_type: Option<String>,
    pub sub_order_type: Option<String>,
    pub service_zone: Option<String>,
    pub table_number: Option<String>,
    pub payment_type: Option<String>,
    pub status: Option<String>,
    pub source_file: String,
    pub source_row: i64,
    pub items: Vec<String>,
}

impl Order {
    pub fn formatted_datetime(&self) -> String {
        self.order_datetime
            .format(ORDER_DATETIME_FORMAT)
            .to_string()
    }
}
