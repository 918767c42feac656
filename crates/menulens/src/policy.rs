use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::elasticity::ElasticityConfidence;
use crate::catalog::keywords::DemandClass;
use crate::catalog::matcher::Confidence;

/// Policy identifier emitted with every run summary.
///
/// Bump it whenever a default threshold below changes so persisted runs stay
/// comparable in diffs and support sessions.
pub const ANALYSIS_POLICY_VERSION: &str = "menulens/v1";

/// Fuzzy name matching thresholds (Jaccard similarity over name tokens).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchPolicy {
    pub min_similarity: f64,
    pub medium_similarity: f64,
}

impl MatchPolicy {
    pub fn tier_for(self, score: f64) -> Confidence {
        if score >= self.medium_similarity {
            return Confidence::Medium;
        }
        if score >= self.min_similarity {
            return Confidence::Low;
        }
        Confidence::Estimated
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MATCH_POLICY_V1
    }
}

pub const MATCH_POLICY_V1: MatchPolicy = MatchPolicy {
    min_similarity: 0.6,
    medium_similarity: 0.8,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocationPolicy {
    /// Worker threads used for per-order allocation. Output order never
    /// depends on this value.
    pub workers: usize,
    /// Reconciliation adjustments larger than this are logged for review.
    pub notable_adjustment: Decimal,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        ALLOCATION_POLICY_V1
    }
}

pub const ALLOCATION_POLICY_V1: AllocationPolicy = AllocationPolicy {
    workers: 1,
    notable_adjustment: Decimal::ONE,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BcgPolicy {
    pub popularity_threshold: f64,
    pub revenue_threshold: f64,
}

impl Default for BcgPolicy {
    fn default() -> Self {
        BCG_POLICY_V1
    }
}

pub const BCG_POLICY_V1: BcgPolicy = BcgPolicy {
    popularity_threshold: 0.5,
    revenue_threshold: 0.5,
};

/// Statistical and economic validity gates for elasticity estimates.
///
/// Notes:
/// - Preconditions (window, transactions, price variation) are checked before
///   any regression is fitted.
/// - Magnitude bounds encode how elastic each demand class can plausibly be;
///   anything beyond them is treated as a fitting artefact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElasticityPolicy {
    pub min_window_days: i64,
    pub min_transactions: usize,
    pub min_price_cv: f64,
    pub min_pairs: usize,
    pub period_days: i64,
    pub alcohol_bound: f64,
    pub staple_bound: f64,
    pub general_bound: f64,
    pub high_min_r_squared: f64,
    pub high_max_p_value: f64,
    pub medium_min_r_squared: f64,
    pub medium_max_p_value: f64,
    pub accept_positive_as_anomaly: bool,
}

impl ElasticityPolicy {
    pub fn magnitude_bound(self, class: DemandClass) -> f64 {
        match class {
            DemandClass::Alcohol => self.alcohol_bound,
            DemandClass::Staple => self.staple_bound,
            DemandClass::General => self.general_bound,
        }
    }

    pub fn confidence_for(self, r_squared: f64, p_value: f64) -> ElasticityConfidence {
        if r_squared > self.high_min_r_squared && p_value < self.high_max_p_value {
            return ElasticityConfidence::High;
        }
        if r_squared > self.medium_min_r_squared && p_value < self.medium_max_p_value {
            return ElasticityConfidence::Medium;
        }
        ElasticityConfidence::Low
    }
}

impl Default for ElasticityPolicy {
    fn default() -> Self {
        ELASTICITY_POLICY_V1
    }
}

pub const ELASTICITY_POLICY_V1: ElasticityPolicy = ElasticityPolicy {
    min_window_days: 90,
    min_transactions: 10,
    min_price_cv: 0.08,
    min_pairs: 3,
    period_days: 7,
    alcohol_bound: 1.5,
    staple_bound: 1.0,
    general_bound: 3.0,
    high_min_r_squared: 0.7,
    high_max_p_value: 0.05,
    medium_min_r_squared: 0.4,
    medium_max_p_value: 0.1,
    accept_positive_as_anomaly: false,
};
