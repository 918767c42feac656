use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::contracts::types::RowIssue;
use crate::ingest::Order;
use crate::ingest::parse::ParsedRow;
use crate::money::{AmountError, parse_amount};

/// Accepted `Created` layouts, tried in order.
pub const TIMESTAMP_FORMATS: [&str; 4] = [
    "%d %b %Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M",
];

#[derive(Debug, Clone, Default)]
pub struct ValidatedRows {
    pub orders: Vec<Order>,
    pub issues: Vec<RowIssue>,
    pub rows_skipped: usize,
}

pub fn validate_rows(source_file: &str, parsed_rows: Vec<ParsedRow>) -> ValidatedRows {
    let mut validated = ValidatedRows::default();

    for raw in parsed_rows {
        let mut row_issues = Vec::new();

        let external_id = normalize_optional(raw.order_id);
        if external_id.is_none() {
            row_issues.push(issue(
                raw.row,
                "order_id",
                "missing_order_id",
                "Order number must be present and non-empty.",
            ));
        }
        let order_total = validate_total(raw.row, raw.total, &mut row_issues);
        let order_datetime = validate_timestamp(raw.row, raw.created, &mut row_issues);
        let items = split_items(raw.items.as_deref().unwrap_or_default());
        if items.is_empty() {
            row_issues.push(issue(
                raw.row,
                "items",
                "missing_items",
                "Items must list at least one item name.",
            ));
        }

        let (Some(external_id), Some(order_total), Some(order_datetime), true) =
            (external_id, order_total, order_datetime, row_issues.is_empty())
        else {
            validated.rows_skipped += 1;
            validated.issues.extend(row_issues);
            continue;
        };

        let sub_order_type = normalize_optional(raw.sub_order_type);
        let (service_zone, table_number) = sub_order_type
            .as_deref()
            .map(extract_table_info)
            .unwrap_or((None, None));

        validated.orders.push(Order {
            order_id: format!("{source_file}#{external_id}"),
            external_id,
            order_datetime,
            order_total,
            order_type: normalize_optional(raw.order_type),
            sub_order_type,
            service_zone,
            table_number,
            payment_type: normalize_optional(raw.payment_type),
            status: normalize_optional(raw.status),
            source_file: source_file.to_string(),
            source_row: raw.row,
            items,
        });
    }

    validated
}

/// Comma-separated item list; each non-empty token is one line occurrence.
pub fn split_items(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

/// `Dine In (5)` -> zone `Dine In`, table `5`; anything without a
/// parenthesized table keeps its text as the zone.
pub fn extract_table_info(sub_order_type: &str) -> (Option<String>, Option<String>) {
    let trimmed = sub_order_type.trim();
    let table = trimmed.find('(').and_then(|open| {
        let close = trimmed[open..].find(')')? + open;
        let inner = trimmed[open + 1..close].trim();
        let starts_with_digit = inner.chars().next().is_some_and(|c| c.is_ascii_digit());
        let is_table = starts_with_digit
            && inner
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase());
        is_table.then(|| (open, close, inner.to_string()))
    });

    match table {
        Some((open, close, number)) => {
            let zone = format!("{} {}", &trimmed[..open], &trimmed[close + 1..])
                .split_whitespace()
                .collect::<Vec<&str>>()
                .join(" ");
            (normalize_optional(Some(zone)), Some(number))
        }
        None => (normalize_optional(Some(trimmed.to_string())), None),
    }
}

fn validate_total(
    row: i64,
    value: Option<String>,
    issues: &mut Vec<RowIssue>,
) -> Option<Decimal> {
    let raw = value.unwrap_or_default();
    match parse_amount(&raw) {
        Ok(amount) if amount > Decimal::ZERO => Some(amount),
        Ok(_) => {
            issues.push(issue(
                row,
                "order_total",
                "non_positive_total",
                &format!("Order total must be greater than zero, got `{}`.", raw.trim()),
            ));
            None
        }
        Err(AmountError::Blank) => {
            issues.push(issue(
                row,
                "order_total",
                "missing_total",
                "Order total must be present.",
            ));
            None
        }
        Err(AmountError::NotNumeric) => {
            issues.push(issue(
                row,
                "order_total",
                "invalid_total",
                &format!("Order total `{}` is not a number.", raw.trim()),
            ));
            None
        }
        Err(AmountError::TooPrecise) => {
            issues.push(issue(
                row,
                "order_total",
                "invalid_amount_scale",
                &format!(
                    "Order total `{}` has more than two fractional digits.",
                    raw.trim()
                ),
            ));
            None
        }
    }
}

fn validate_timestamp(
    row: i64,
    value: Option<String>,
    issues: &mut Vec<RowIssue>,
) -> Option<NaiveDateTime> {
    let Some(raw) = normalize_optional(value) else {
        issues.push(issue(
            row,
            "order_datetime",
            "missing_timestamp",
            "Created timestamp must be present.",
        ));
        return None;
    };

    let parsed = parse_timestamp(&raw);
    if parsed.is_none() {
        issues.push(issue(
            row,
            "order_datetime",
            "invalid_timestamp",
            &format!("Created timestamp `{raw}` does not match a supported layout."),
        ));
    }
    parsed
}

fn issue(row: i64, field: &str, code: &str, description: &str) -> RowIssue {
    RowIssue {
        row,
        field: field.to_string(),
        code: code.to_string(),
        description: description.to_string(),
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|current| {
        let trimmed = current.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
