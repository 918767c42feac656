use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::allocation::batch::AllocatedOrder;
use crate::analytics::metrics::{PriceObservation, price_series};
use crate::analytics::stats::{linear_regression, mean, sample_std_dev};
use crate::catalog::keywords::{DemandClass, demand_class};
use crate::catalog::{CatalogIndex, CatalogItemId};
use crate::contracts::types::ElasticityRow;
use crate::policy::ElasticityPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElasticityConfidence {
    High,
    Medium,
    Low,
}

impl ElasticityConfidence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElasticityResult {
    pub catalog_item_id: CatalogItemId,
    pub coefficient: f64,
    pub r_squared: f64,
    pub p_value: f64,
    pub confidence: ElasticityConfidence,
    /// Distinct transactions behind the estimate.
    pub sample_size: usize,
    pub pair_count: usize,
    pub period_count: usize,
    pub window_days: i64,
    pub price_coefficient_of_variation: f64,
    pub demand_class: DemandClass,
    pub pricing_eligible: bool,
    pub anomaly: bool,
}

/// Why an item has no usable elasticity estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RejectionReason {
    NoObservations,
    InsufficientWindow { days: i64, required: i64 },
    TooFewTransactions { count: usize, required: usize },
    LowPriceVariation { cv: f64, required: f64 },
    TooFewPairs { pairs: usize, required: usize },
    DegenerateFit,
    PositiveElasticity { coefficient: f64 },
    OutOfBounds { coefficient: f64, bound: f64 },
}

impl RejectionReason {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoObservations => "no_observations",
            Self::InsufficientWindow { .. } => "insufficient_window",
            Self::TooFewTransactions { .. } => "too_few_transactions",
            Self::LowPriceVariation { .. } => "low_price_variation",
            Self::TooFewPairs { .. } => "too_few_pairs",
            Self::DegenerateFit => "degenerate_fit",
            Self::PositiveElasticity { .. } => "positive_elasticity",
            Self::OutOfBounds { .. } => "out_of_bounds",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoObservations => write!(formatter, "no verified sales"),
            Self::InsufficientWindow { days, required } => write!(
                formatter,
                "observation window of {days} days is shorter than {required} days"
            ),
            Self::TooFewTransactions { count, required } => write!(
                formatter,
                "{count} distinct transactions, need at least {required}"
            ),
            Self::LowPriceVariation { cv, required } => write!(
                formatter,
                "price coefficient of variation {cv:.4} is below {required:.4}"
            ),
            Self::TooFewPairs { pairs, required } => write!(
                formatter,
                "{pairs} usable period-over-period pairs, need at least {required}"
            ),
            Self::DegenerateFit => write!(formatter, "price changes have no variance to fit"),
            Self::PositiveElasticity { coefficient } => write!(
                formatter,
                "positive elasticity {coefficient:.4} is implausible for ordinary goods"
            ),
            Self::OutOfBounds { coefficient, bound } => write!(
                formatter,
                "elasticity {coefficient:.4} exceeds the plausible magnitude {bound:.2}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElasticityOutcome {
    Accepted(ElasticityResult),
    Rejected {
        catalog_item_id: CatalogItemId,
        demand_class: DemandClass,
        reason: RejectionReason,
    },
}

impl ElasticityOutcome {
    pub fn catalog_item_id(&self) -> CatalogItemId {
        match self {
            Self::Accepted(result) => result.catalog_item_id,
            Self::Rejected {
                catalog_item_id, ..
            } => *catalog_item_id,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn to_row(&self, name: &str) -> ElasticityRow {
        match self {
            Self::Accepted(result) => ElasticityRow {
                catalog_item_id: result.catalog_item_id,
                name: name.to_string(),
                demand_class: result.demand_class,
                status: "ACCEPTED".to_string(),
                coefficient: Some(result.coefficient),
                r_squared: Some(result.r_squared),
                p_value: Some(result.p_value),
                confidence: Some(result.confidence),
                pricing_eligible: result.pricing_eligible,
                anomaly: result.anomaly,
                rejection_reason: None,
            },
            Self::Rejected {
                catalog_item_id,
                demand_class,
                reason,
            } => ElasticityRow {
                catalog_item_id: *catalog_item_id,
                name: name.to_string(),
                demand_class: *demand_class,
                status: "REJECTED".to_string(),
                coefficient: None,
                r_squared: None,
                p_value: None,
                confidence: None,
                pricing_eligible: false,
                anomaly: false,
                rejection_reason: Some(reason.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Period {
    mean_price: f64,
    quantity: f64,
}

/// Estimates the price elasticity of demand for one item.
///
/// Notes:
/// - `series` must be sorted by time; the first observation anchors the
///   weekly buckets.
/// - Preconditions are checked in order and the first failure is reported.
pub fn estimate(
    catalog_item_id: CatalogItemId,
    series: &[PriceObservation],
    class: DemandClass,
    policy: &ElasticityPolicy,
) -> ElasticityOutcome {
    let reject = |reason: RejectionReason| ElasticityOutcome::Rejected {
        catalog_item_id,
        demand_class: class,
        reason,
    };

    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return reject(RejectionReason::NoObservations);
    };

    let window_days = (last.at - first.at).num_days();
    if window_days < policy.min_window_days {
        return reject(RejectionReason::InsufficientWindow {
            days: window_days,
            required: policy.min_window_days,
        });
    }

    let sample_size = series
        .iter()
        .map(|observation| observation.order_id.as_str())
        .collect::<HashSet<&str>>()
        .len();
    if sample_size < policy.min_transactions {
        return reject(RejectionReason::TooFewTransactions {
            count: sample_size,
            required: policy.min_transactions,
        });
    }

    let periods = bucket_periods(series, policy.period_days);
    let period_prices = periods
        .iter()
        .map(|period| period.mean_price)
        .collect::<Vec<f64>>();
    let average_price = mean(&period_prices);
    let cv = if average_price > 0.0 {
        sample_std_dev(&period_prices) / average_price
    } else {
        0.0
    };
    if cv < policy.min_price_cv {
        return reject(RejectionReason::LowPriceVariation {
            cv,
            required: policy.min_price_cv,
        });
    }

    let (price_changes, quantity_changes) = percentage_changes(&periods);
    let pair_count = price_changes.len();
    if pair_count < policy.min_pairs {
        return reject(RejectionReason::TooFewPairs {
            pairs: pair_count,
            required: policy.min_pairs,
        });
    }

    let Some(regression) = linear_regression(&price_changes, &quantity_changes) else {
        return reject(RejectionReason::DegenerateFit);
    };
    let coefficient = regression.slope;

    let anomaly = coefficient > 0.0;
    if anomaly && !policy.accept_positive_as_anomaly {
        return reject(RejectionReason::PositiveElasticity { coefficient });
    }

    let bound = policy.magnitude_bound(class);
    if coefficient.abs() > bound {
        return reject(RejectionReason::OutOfBounds { coefficient, bound });
    }

    let confidence = if anomaly {
        ElasticityConfidence::Low
    } else {
        policy.confidence_for(regression.r_squared, regression.p_value)
    };

    ElasticityOutcome::Accepted(ElasticityResult {
        catalog_item_id,
        coefficient,
        r_squared: regression.r_squared,
        p_value: regression.p_value,
        confidence,
        sample_size,
        pair_count,
        period_count: periods.len(),
        window_days,
        price_coefficient_of_variation: cv,
        demand_class: class,
        pricing_eligible: confidence != ElasticityConfidence::Low,
        anomaly,
    })
}

/// Runs [`estimate`] for every catalog item with verified sales, in item id
/// order.
pub fn estimate_all(
    orders: &[AllocatedOrder],
    catalog: &CatalogIndex,
    policy: &ElasticityPolicy,
) -> Vec<ElasticityOutcome> {
    let mut outcomes = Vec::new();
    for (catalog_item_id, series) in price_series(orders) {
        let class = catalog
            .get(catalog_item_id)
            .map(|item| demand_class(&item.name, item.is_alcohol))
            .unwrap_or(DemandClass::General);
        let outcome = estimate(catalog_item_id, &series, class, policy);
        if let ElasticityOutcome::Rejected { reason, .. } = &outcome {
            debug!(
                item = %catalog_item_id,
                reason = reason.code(),
                detail = %reason,
                "Elasticity estimate rejected"
            );
        }
        outcomes.push(outcome);
    }
    outcomes
}

fn bucket_periods(series: &[PriceObservation], period_days: i64) -> Vec<Period> {
    let Some(first) = series.first() else {
        return Vec::new();
    };
    let span = period_days.max(1);

    let mut buckets: BTreeMap<i64, (f64, usize, f64)> = BTreeMap::new();
    for observation in series {
        let bucket = (observation.at - first.at).num_days().div_euclid(span);
        let entry = buckets.entry(bucket).or_insert((0.0, 0, 0.0));
        entry.0 += observation.price;
        entry.1 += 1;
        entry.2 += f64::from(observation.quantity);
    }

    buckets
        .into_values()
        .map(|(price_sum, observations, quantity)| Period {
            mean_price: price_sum / observations as f64,
            quantity,
        })
        .collect()
}

// Percentage changes between consecutive non-empty periods; a pair is
// dropped when the earlier period has zero price or quantity.
fn percentage_changes(periods: &[Period]) -> (Vec<f64>, Vec<f64>) {
    let mut price_changes = Vec::new();
    let mut quantity_changes = Vec::new();
    for window in periods.windows(2) {
        let (previous, current) = (window[0], window[1]);
        if previous.mean_price == 0.0 || previous.quantity == 0.0 {
            continue;
        }
        price_changes.push((current.mean_price - previous.mean_price) / previous.mean_price * 100.0);
        quantity_changes.push((current.quantity - previous.quantity) / previous.quantity * 100.0);
    }
    (price_changes, quantity_changes)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use crate::analytics::metrics::PriceObservation;
    use crate::catalog::CatalogItemId;
    use crate::catalog::keywords::DemandClass;
    use crate::policy::ELASTICITY_POLICY_V1;

    use super::{ElasticityConfidence, ElasticityOutcome, RejectionReason, estimate};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 6)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .unwrap_or_default()
    }

    // One observation per week with the given price and quantity.
    fn weekly(points: &[(f64, u32)]) -> Vec<PriceObservation> {
        points
            .iter()
            .enumerate()
            .map(|(week, (price, quantity))| PriceObservation {
                order_id: format!("order-{week}"),
                at: start() + Duration::days(7 * week as i64),
                price: *price,
                quantity: *quantity,
            })
            .collect()
    }

    fn reason(outcome: &ElasticityOutcome) -> Option<&RejectionReason> {
        match outcome {
            ElasticityOutcome::Rejected { reason, .. } => Some(reason),
            ElasticityOutcome::Accepted(_) => None,
        }
    }

    fn cycle(prices: &[f64], quantities: &[u32], weeks: usize) -> Vec<(f64, u32)> {
        (0..weeks)
            .map(|week| (prices[week % prices.len()], quantities[week % quantities.len()]))
            .collect()
    }

    #[test]
    fn clean_negative_response_is_accepted_with_high_confidence() {
        let points = cycle(&[100.0, 120.0, 90.0, 110.0], &[1000, 850, 1100, 930], 16);
        let outcome = estimate(
            CatalogItemId(4),
            &weekly(&points),
            DemandClass::General,
            &ELASTICITY_POLICY_V1,
        );

        assert!(outcome.is_accepted());
        if let ElasticityOutcome::Accepted(result) = outcome {
            assert!(result.coefficient < -0.5 && result.coefficient > -1.5);
            assert_eq!(result.confidence, ElasticityConfidence::High);
            assert!(result.pricing_eligible);
            assert!(!result.anomaly);
            assert_eq!(result.sample_size, 16);
            assert_eq!(result.pair_count, 15);
            assert_eq!(result.window_days, 105);
        }
    }

    #[test]
    fn low_price_variation_is_rejected_even_with_a_perfect_fit() {
        // prices alternate 100/110: CV about 0.05
        let points = cycle(&[100.0, 110.0], &[1000, 900], 20);
        let outcome = estimate(
            CatalogItemId(1),
            &weekly(&points),
            DemandClass::General,
            &ELASTICITY_POLICY_V1,
        );
        assert!(matches!(
            reason(&outcome),
            Some(RejectionReason::LowPriceVariation { cv, .. }) if *cv < 0.08 && *cv > 0.04
        ));
    }

    #[test]
    fn preconditions_are_checked_in_order() {
        let short = weekly(&cycle(&[100.0, 130.0], &[10, 8], 10));
        let outcome = estimate(CatalogItemId(0), &short, DemandClass::General, &ELASTICITY_POLICY_V1);
        assert!(matches!(
            reason(&outcome),
            Some(RejectionReason::InsufficientWindow { days: 63, required: 90 })
        ));

        let mut sparse = weekly(&cycle(&[100.0, 130.0], &[10, 8], 14));
        for observation in &mut sparse {
            observation.order_id = "same-order".to_string();
        }
        let outcome = estimate(CatalogItemId(0), &sparse, DemandClass::General, &ELASTICITY_POLICY_V1);
        assert!(matches!(
            reason(&outcome),
            Some(RejectionReason::TooFewTransactions { count: 1, .. })
        ));

        let outcome = estimate(CatalogItemId(0), &[], DemandClass::General, &ELASTICITY_POLICY_V1);
        assert_eq!(reason(&outcome), Some(&RejectionReason::NoObservations));
    }

    #[test]
    fn positive_slopes_are_rejected_unless_flagged_as_anomalies() {
        let points = cycle(&[100.0, 120.0, 90.0, 110.0], &[1000, 1150, 900, 1070], 16);
        let series = weekly(&points);

        let outcome = estimate(CatalogItemId(2), &series, DemandClass::General, &ELASTICITY_POLICY_V1);
        assert!(matches!(
            reason(&outcome),
            Some(RejectionReason::PositiveElasticity { coefficient }) if *coefficient > 0.0
        ));

        let mut tolerant = ELASTICITY_POLICY_V1;
        tolerant.accept_positive_as_anomaly = true;
        let outcome = estimate(CatalogItemId(2), &series, DemandClass::General, &tolerant);
        assert!(outcome.is_accepted());
        if let ElasticityOutcome::Accepted(result) = outcome {
            assert!(result.anomaly);
            assert_eq!(result.confidence, ElasticityConfidence::Low);
            assert!(!result.pricing_eligible);
        }
    }

    #[test]
    fn magnitudes_beyond_the_class_bound_are_rejected() {
        // roughly -1.9: plausible in general, not for a staple
        let points = cycle(&[100.0, 120.0, 90.0, 110.0], &[1000, 700, 1150, 880], 16);
        let series = weekly(&points);

        let staple = estimate(CatalogItemId(3), &series, DemandClass::Staple, &ELASTICITY_POLICY_V1);
        assert!(matches!(
            reason(&staple),
            Some(RejectionReason::OutOfBounds { bound, .. }) if (*bound - 1.0).abs() < f64::EPSILON
        ));

        let general = estimate(CatalogItemId(3), &series, DemandClass::General, &ELASTICITY_POLICY_V1);
        assert!(general.is_accepted());
    }
}
