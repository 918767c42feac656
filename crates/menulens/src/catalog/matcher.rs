use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::catalog::normalize::{normalize, tokens};
use crate::catalog::{CatalogIndex, CatalogItemId};

/// How trustworthy a name match (and therefore an item's price) is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Estimated,
}

impl Confidence {
    pub const ALL: [Confidence; 4] = [
        Confidence::High,
        Confidence::Medium,
        Confidence::Low,
        Confidence::Estimated,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Estimated => "ESTIMATED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.as_str() == value)
    }

    /// HIGH and MEDIUM matches are trusted for direct pricing.
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::High | Self::Medium)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub catalog_item_id: Option<CatalogItemId>,
    pub score: f64,
    pub tier: Confidence,
}

impl MatchResult {
    pub const fn no_match() -> Self {
        Self {
            catalog_item_id: None,
            score: 0.0,
            tier: Confidence::Estimated,
        }
    }

    const fn exact(id: CatalogItemId) -> Self {
        Self {
            catalog_item_id: Some(id),
            score: 1.0,
            tier: Confidence::High,
        }
    }
}

impl CatalogIndex {
    /// Resolves a transaction item name against the frozen catalog.
    ///
    /// Exact raw name, then exact normalized name, then the best token-set
    /// Jaccard score at or above the policy cutoff.
    pub fn match_name(&self, raw_name: &str) -> MatchResult {
        let trimmed = raw_name.trim();
        if let Some(slot) = self.by_raw_name.get(trimmed) {
            return MatchResult::exact(self.items[*slot].id);
        }

        let normalized = normalize(trimmed);
        if normalized.is_empty() {
            return MatchResult::no_match();
        }
        if let Some(slot) = self.by_normalized_name.get(&normalized) {
            return MatchResult::exact(self.items[*slot].id);
        }

        let query = tokens(&normalized).collect::<BTreeSet<&str>>();
        let mut best: Option<(usize, f64)> = None;
        for (slot, candidate_tokens) in self.token_sets.iter().enumerate() {
            let score = jaccard(&query, candidate_tokens);
            if score <= 0.0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_slot, best_score)) => {
                    self.compare_candidates(slot, score, best_slot, best_score) == Ordering::Less
                }
            };
            if better {
                best = Some((slot, score));
            }
        }

        let Some((slot, score)) = best else {
            return MatchResult::no_match();
        };
        let tier = self.policy.tier_for(score);
        if tier == Confidence::Estimated {
            return MatchResult::no_match();
        }

        MatchResult {
            catalog_item_id: Some(self.items[slot].id),
            score,
            tier,
        }
    }

    // Less means `left` ranks ahead of `right`.
    fn compare_candidates(
        &self,
        left: usize,
        left_score: f64,
        right: usize,
        right_score: f64,
    ) -> Ordering {
        let left_item = &self.items[left];
        let right_item = &self.items[right];
        right_score
            .total_cmp(&left_score)
            .then_with(|| {
                left_item
                    .normalized_name
                    .chars()
                    .count()
                    .cmp(&right_item.normalized_name.chars().count())
            })
            .then_with(|| left_item.normalized_name.cmp(&right_item.normalized_name))
            .then_with(|| left_item.id.cmp(&right_item.id))
    }
}

pub fn jaccard(query: &BTreeSet<&str>, candidate: &BTreeSet<String>) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let intersection = candidate
        .iter()
        .filter(|token| query.contains(token.as_str()))
        .count();
    let union = query.len() + candidate.len() - intersection;
    (intersection as f64) / (union as f64)
}
