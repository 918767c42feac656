use std::collections::BTreeMap;
use std::path::PathBuf;

use rust_decimal::Decimal;
use tracing::info;

use crate::allocation::batch::{AllocatedOrder, allocate_orders, item_records};
use crate::analytics::bcg::{BcgClassification, classify};
use crate::analytics::elasticity::{ElasticityOutcome, estimate_all};
use crate::analytics::metrics::{OrderScope, item_metrics};
use crate::analytics::service::{monthly_trends, service_zones};
use crate::catalog::CatalogIndex;
use crate::catalog::load::load_catalog;
use crate::catalog::matcher::Confidence;
use crate::config::AnalysisConfig;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{
    AllocationSummary, AnalysisData, ElasticitySummary, RowSummary, RunSummary, SourceReport,
};
use crate::ingest::aggregate::aggregate_sources;
use crate::policy::ANALYSIS_POLICY_VERSION;
use crate::store::open_store;
use crate::store::persist::{PersistInput, persist_dataset};
use crate::{LensError, LensResult};

pub const ANALYZE_COMMAND: &str = "analyze";

#[derive(Debug, Clone, Default)]
pub struct AnalysisRunOptions {
    pub catalog_path: PathBuf,
    pub sources: Vec<PathBuf>,
    /// `None` loads `MENULENS_CONFIG` or the built-in defaults.
    pub config: Option<AnalysisConfig>,
    pub scope: OrderScope,
    pub persist: bool,
    pub home_override: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub data: AnalysisData,
    pub orders: Vec<AllocatedOrder>,
    pub catalog: CatalogIndex,
    pub bcg: BcgClassification,
    pub elasticity: Vec<ElasticityOutcome>,
}

impl AnalysisOutput {
    pub fn summary(&self) -> &RunSummary {
        &self.data.summary
    }

    pub fn run_id(&self) -> Option<&str> {
        self.data.summary.run_id.as_deref()
    }
}

/// Runs one analysis end to end and wraps the result in a success envelope.
pub fn run(options: AnalysisRunOptions) -> LensResult<SuccessEnvelope> {
    let output = run_analysis(options)?;
    success(ANALYZE_COMMAND, &output.data)
}

pub fn run_analysis(options: AnalysisRunOptions) -> LensResult<AnalysisOutput> {
    if options.catalog_path.as_os_str().is_empty() {
        return Err(LensError::invalid_argument(
            "A menu catalog path is required for an analysis run.",
        ));
    }

    let config = match options.config {
        Some(config) => {
            config.validate()?;
            config
        }
        None => AnalysisConfig::from_env()?,
    };

    let catalog = load_catalog(&options.catalog_path, config.matching)?;
    let aggregated = aggregate_sources(&options.sources)?;
    let orders = allocate_orders(aggregated.orders, &catalog, &config.allocation);

    let metrics = item_metrics(&orders, &catalog, options.scope);
    let bcg = classify(&metrics, &config.bcg);
    let elasticity = estimate_all(&orders, &catalog, &config.elasticity);

    let mut summary = RunSummary {
        run_id: None,
        policy_version: ANALYSIS_POLICY_VERSION.to_string(),
        sources: aggregated
            .reports
            .iter()
            .map(|report| report.source_file.clone())
            .collect(),
        rows: summarize_rows(&aggregated.reports),
        allocation: summarize_allocation(&orders),
        catalog: catalog.stats(),
        quadrant_counts: bcg.labelled_counts(),
        elasticity: summarize_elasticity(&elasticity),
        service_zones: service_zones(orders.iter().map(|allocated| &allocated.order)),
        monthly_trends: monthly_trends(orders.iter().map(|allocated| &allocated.order)),
    };

    if options.persist {
        let mut store = open_store(options.home_override.as_deref())?;
        let persisted = persist_dataset(
            &mut store,
            PersistInput {
                summary: &summary,
                orders: &orders,
                catalog: &catalog,
            },
        )?;
        summary.run_id = Some(persisted.run_id);
    }

    log_summary(&summary);

    let elasticity_rows = elasticity
        .iter()
        .map(|outcome| {
            let id = outcome.catalog_item_id();
            let name = catalog
                .get(id)
                .map(|item| item.name.clone())
                .unwrap_or_else(|| id.to_string());
            outcome.to_row(&name)
        })
        .collect();

    let data = AnalysisData {
        summary,
        source_reports: aggregated.reports,
        items: item_records(&orders, &catalog),
        bcg: bcg.rows.clone(),
        elasticity: elasticity_rows,
    };

    Ok(AnalysisOutput {
        data,
        orders,
        catalog,
        bcg,
        elasticity,
    })
}

fn summarize_rows(reports: &[SourceReport]) -> RowSummary {
    let mut rows = RowSummary::default();
    for report in reports {
        rows.rows_read += report.rows_read;
        rows.rows_parsed += report.rows_parsed;
        rows.rows_skipped += report.rows_skipped;
        for issue in &report.issues {
            *rows.skip_reasons.entry(issue.code.clone()).or_insert(0) += 1;
        }
    }
    rows
}

fn summarize_allocation(orders: &[AllocatedOrder]) -> AllocationSummary {
    let mut items_by_confidence: BTreeMap<String, usize> = Confidence::ALL
        .iter()
        .map(|tier| (tier.as_str().to_string(), 0))
        .collect();
    let mut orders_by_path: BTreeMap<String, usize> = BTreeMap::new();
    let mut items_allocated = 0;
    let mut total_revenue = Decimal::ZERO;

    for allocated in orders {
        *orders_by_path
            .entry(allocated.allocation.path.as_str().to_string())
            .or_insert(0) += 1;
        total_revenue += allocated.allocation.allocated_total();
        for item in &allocated.allocation.items {
            items_allocated += 1;
            *items_by_confidence
                .entry(item.confidence.as_str().to_string())
                .or_insert(0) += 1;
        }
    }

    AllocationSummary {
        orders_allocated: orders.len(),
        orders_flagged_for_audit: orders
            .iter()
            .filter(|allocated| allocated.allocation.audit.is_some())
            .count(),
        items_allocated,
        items_by_confidence,
        orders_by_path,
        total_revenue,
    }
}

fn summarize_elasticity(outcomes: &[ElasticityOutcome]) -> ElasticitySummary {
    let mut summary = ElasticitySummary {
        evaluated: outcomes.len(),
        ..ElasticitySummary::default()
    };
    for outcome in outcomes {
        match outcome {
            ElasticityOutcome::Accepted(_) => summary.accepted += 1,
            ElasticityOutcome::Rejected { reason, .. } => {
                summary.rejected += 1;
                *summary
                    .rejection_reasons
                    .entry(reason.code().to_string())
                    .or_insert(0) += 1;
            }
        }
    }
    if summary.evaluated > 0 {
        summary.acceptance_rate = summary.accepted as f64 / summary.evaluated as f64;
    }
    summary
}

fn log_summary(summary: &RunSummary) {
    info!(
        run_id = summary.run_id.as_deref().unwrap_or("-"),
        sources = summary.sources.len(),
        rows_read = summary.rows.rows_read,
        rows_parsed = summary.rows.rows_parsed,
        rows_skipped = summary.rows.rows_skipped,
        orders = summary.allocation.orders_allocated,
        flagged_for_audit = summary.allocation.orders_flagged_for_audit,
        items = summary.allocation.items_allocated,
        revenue = %summary.allocation.total_revenue,
        elasticity_accepted = summary.elasticity.accepted,
        elasticity_rejected = summary.elasticity.rejected,
        "Analysis run complete"
    );
    for (reason, count) in &summary.rows.skip_reasons {
        info!(reason = %reason, count, "Skipped rows");
    }
    for (tier, count) in &summary.allocation.items_by_confidence {
        info!(tier = %tier, count, "Allocated items by confidence");
    }
    for zone in &summary.service_zones {
        info!(
            zone = %zone.service_zone,
            orders = zone.order_count,
            revenue = %zone.total_revenue,
            avg_order_value = %zone.avg_order_value,
            "Service zone totals"
        );
    }
}
