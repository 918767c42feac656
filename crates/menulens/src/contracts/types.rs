use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::allocation::AllocationMethod;
use crate::analytics::bcg::Quadrant;
use crate::analytics::elasticity::ElasticityConfidence;
use crate::catalog::keywords::DemandClass;
use crate::catalog::matcher::Confidence;
use crate::catalog::{CatalogItemId, CatalogStats};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub row: i64,
    pub field: String,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source_file: String,
    pub path: String,
    pub encoding: String,
    pub rows_read: usize,
    pub rows_parsed: usize,
    pub rows_skipped: usize,
    pub issues: Vec<RowIssue>,
}

/// One row of the reconciled item-level revenue dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocatedItemRecord {
    pub order_id: String,
    pub source_file: String,
    pub order_datetime: String,
    pub line_number: usize,
    pub raw_name: String,
    pub normalized_name: String,
    pub quantity: u32,
    pub catalog_item_id: Option<CatalogItemId>,
    pub candidate_item_id: Option<CatalogItemId>,
    pub catalog_name: Option<String>,
    pub menu_price: Option<Decimal>,
    pub allocated_price: Decimal,
    pub confidence: Confidence,
    pub match_score: Option<f64>,
    pub allocation_method: AllocationMethod,
    pub reconciliation_adjustment: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BcgRow {
    pub catalog_item_id: CatalogItemId,
    pub name: String,
    pub quantity_sold: u64,
    pub total_revenue: Decimal,
    pub popularity_percentile: f64,
    pub revenue_percentile: f64,
    pub quadrant: Quadrant,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElasticityRow {
    pub catalog_item_id: CatalogItemId,
    pub name: String,
    pub demand_class: DemandClass,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficient: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_squared: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ElasticityConfidence>,
    pub pricing_eligible: bool,
    pub anomaly: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceZoneRow {
    pub service_zone: String,
    pub order_count: usize,
    pub total_revenue: Decimal,
    pub avg_order_value: Decimal,
    /// Orders placed 11:00 to 15:59.
    pub lunch_orders: usize,
    /// Orders placed 19:00 to 23:59.
    pub dinner_orders: usize,
    pub first_order: String,
    pub last_order: String,
    pub peak_hours: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrendRow {
    /// `YYYY-MM`.
    pub month: String,
    pub service_zone: String,
    pub order_count: usize,
    pub revenue: Decimal,
    pub avg_order_value: Decimal,
    pub active_days: usize,
    pub order_growth_pct: Option<f64>,
    pub revenue_growth_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSummary {
    pub rows_read: usize,
    pub rows_parsed: usize,
    pub rows_skipped: usize,
    pub skip_reasons: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocationSummary {
    pub orders_allocated: usize,
    pub orders_flagged_for_audit: usize,
    pub items_allocated: usize,
    pub items_by_confidence: BTreeMap<String, usize>,
    pub orders_by_path: BTreeMap<String, usize>,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElasticitySummary {
    pub evaluated: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub acceptance_rate: f64,
    pub rejection_reasons: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub policy_version: String,
    pub sources: Vec<String>,
    pub rows: RowSummary,
    pub allocation: AllocationSummary,
    pub catalog: CatalogStats,
    pub quadrant_counts: BTreeMap<String, usize>,
    pub elasticity: ElasticitySummary,
    pub service_zones: Vec<ServiceZoneRow>,
    pub monthly_trends: Vec<MonthlyTrendRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisData {
    pub summary: RunSummary,
    pub source_reports: Vec<SourceReport>,
    pub items: Vec<AllocatedItemRecord>,
    pub bcg: Vec<BcgRow>,
    pub elasticity: Vec<ElasticityRow>,
}
