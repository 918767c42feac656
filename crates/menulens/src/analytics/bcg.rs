use std::collections::BTreeMap;

use serde::Serialize;

use crate::analytics::metrics::ItemMetrics;
use crate::catalog::CatalogItemId;
use crate::contracts::types::BcgRow;
use crate::money::to_f64;
use crate::policy::BcgPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quadrant {
    Star,
    Plowhorse,
    Puzzle,
    Dog,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::Star,
        Quadrant::Plowhorse,
        Quadrant::Puzzle,
        Quadrant::Dog,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Star => "STAR",
            Self::Plowhorse => "PLOWHORSE",
            Self::Puzzle => "PUZZLE",
            Self::Dog => "DOG",
        }
    }

    pub const fn action(self) -> &'static str {
        match self {
            Self::Star => "Feature: top performer on both volume and revenue.",
            Self::Plowhorse => "Optimize: popular but earns little; review price or portion cost.",
            Self::Puzzle => "Promote: earns well but sells rarely; improve placement.",
            Self::Dog => "Review: low volume and low revenue.",
        }
    }

    pub fn from_percentiles(popularity: f64, revenue: f64, policy: &BcgPolicy) -> Self {
        let popular = popularity >= policy.popularity_threshold;
        let lucrative = revenue >= policy.revenue_threshold;
        match (popular, lucrative) {
            (true, true) => Self::Star,
            (true, false) => Self::Plowhorse,
            (false, true) => Self::Puzzle,
            (false, false) => Self::Dog,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BcgClassification {
    pub quadrants: BTreeMap<CatalogItemId, Quadrant>,
    pub rows: Vec<BcgRow>,
    pub counts: BTreeMap<Quadrant, usize>,
}

impl BcgClassification {
    /// Quadrant counts keyed by label, with every quadrant present.
    pub fn labelled_counts(&self) -> BTreeMap<String, usize> {
        Quadrant::ALL
            .iter()
            .map(|quadrant| {
                (
                    quadrant.as_str().to_string(),
                    self.counts.get(quadrant).copied().unwrap_or(0),
                )
            })
            .collect()
    }
}

/// Assigns every item exactly one quadrant from its volume and revenue
/// percentiles.
pub fn classify(metrics: &[ItemMetrics], policy: &BcgPolicy) -> BcgClassification {
    let popularity = percentile_ranks(
        &metrics
            .iter()
            .map(|row| row.quantity_sold as f64)
            .collect::<Vec<f64>>(),
    );
    let revenue = percentile_ranks(
        &metrics
            .iter()
            .map(|row| to_f64(row.total_revenue))
            .collect::<Vec<f64>>(),
    );

    let mut classification = BcgClassification::default();
    for ((row, popularity_percentile), revenue_percentile) in
        metrics.iter().zip(popularity).zip(revenue)
    {
        let quadrant =
            Quadrant::from_percentiles(popularity_percentile, revenue_percentile, policy);
        classification
            .quadrants
            .insert(row.catalog_item_id, quadrant);
        *classification.counts.entry(quadrant).or_insert(0) += 1;
        classification.rows.push(BcgRow {
            catalog_item_id: row.catalog_item_id,
            name: row.name.clone(),
            quantity_sold: row.quantity_sold,
            total_revenue: row.total_revenue,
            popularity_percentile,
            revenue_percentile,
            quadrant,
            action: quadrant.action().to_string(),
        });
    }
    classification
}

/// Fractional ranks in (0, 1]: average 1-based rank of each value divided by
/// the count, ties sharing their mean rank.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let count = values.len();
    let mut order = (0..count).collect::<Vec<usize>>();
    order.sort_by(|left, right| values[*left].total_cmp(&values[*right]));

    let mut ranks = vec![0.0; count];
    let mut start = 0;
    while start < count {
        let mut end = start + 1;
        while end < count && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let average_rank = ((start + 1 + end) as f64) / 2.0;
        for position in start..end {
            ranks[order[position]] = average_rank / (count as f64);
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::analytics::metrics::ItemMetrics;
    use crate::catalog::CatalogItemId;
    use crate::policy::BCG_POLICY_V1;

    use super::{Quadrant, classify, percentile_ranks};

    fn metric(id: usize, quantity: u64, revenue: i64) -> ItemMetrics {
        ItemMetrics {
            catalog_item_id: CatalogItemId(id),
            name: format!("Item {id}"),
            quantity_sold: quantity,
            total_revenue: Decimal::from(revenue),
        }
    }

    #[test]
    fn percentile_ranks_average_ties() {
        assert_eq!(percentile_ranks(&[10.0, 20.0, 30.0, 40.0]), vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(percentile_ranks(&[5.0, 5.0, 9.0, 1.0]), vec![0.625, 0.625, 1.0, 0.25]);
        assert_eq!(percentile_ranks(&[7.0]), vec![1.0]);
        assert!(percentile_ranks(&[]).is_empty());
    }

    #[test]
    fn every_item_gets_exactly_one_quadrant() {
        let metrics = vec![
            metric(0, 50, 5000),
            metric(1, 60, 200),
            metric(2, 4, 7000),
            metric(3, 3, 100),
            metric(4, 40, 4000),
            metric(5, 30, 3000),
        ];
        let classification = classify(&metrics, &BCG_POLICY_V1);

        assert_eq!(classification.quadrants.len(), metrics.len());
        assert_eq!(classification.quadrants.get(&CatalogItemId(0)), Some(&Quadrant::Star));
        assert_eq!(classification.quadrants.get(&CatalogItemId(1)), Some(&Quadrant::Plowhorse));
        assert_eq!(classification.quadrants.get(&CatalogItemId(2)), Some(&Quadrant::Puzzle));
        assert_eq!(classification.quadrants.get(&CatalogItemId(3)), Some(&Quadrant::Dog));
        assert_eq!(classification.counts.get(&Quadrant::Star), Some(&3));
        assert_eq!(classification.counts.values().sum::<usize>(), 6);
        assert_eq!(classification.labelled_counts().len(), 4);
    }

    #[test]
    fn duplicate_valued_item_ties_without_reshuffling_the_rest() {
        let base = vec![
            metric(0, 10, 900),
            metric(1, 20, 100),
            metric(2, 30, 700),
            metric(3, 40, 300),
            metric(4, 50, 500),
        ];
        let before = classify(&base, &BCG_POLICY_V1);

        let mut with_twin = base.clone();
        with_twin.push(metric(5, 30, 700));
        let after = classify(&with_twin, &BCG_POLICY_V1);

        let original = after.rows.iter().find(|row| row.catalog_item_id == CatalogItemId(2));
        let twin = after.rows.iter().find(|row| row.catalog_item_id == CatalogItemId(5));
        assert!(original.is_some() && twin.is_some());
        if let (Some(original), Some(twin)) = (original, twin) {
            assert_eq!(original.popularity_percentile, twin.popularity_percentile);
            assert_eq!(original.revenue_percentile, twin.revenue_percentile);
            assert_eq!(original.quadrant, twin.quadrant);
        }

        for (id, quadrant) in &before.quadrants {
            assert_eq!(after.quadrants.get(id), Some(quadrant), "item {id}");
        }
        assert_eq!(after.quadrants.get(&CatalogItemId(5)), Some(&Quadrant::Star));

        // Where the twin sits in the input makes no difference.
        let mut twin_first = vec![metric(5, 30, 700)];
        twin_first.extend(base);
        assert_eq!(classify(&twin_first, &BCG_POLICY_V1).quadrants, after.quadrants);
    }

    #[test]
    fn empty_metrics_classify_to_nothing() {
        let classification = classify(&[], &BCG_POLICY_V1);
        assert!(classification.quadrants.is_empty());
        assert!(classification.rows.is_empty());
        assert_eq!(classification.labelled_counts().get("DOG"), Some(&0));
    }
}
