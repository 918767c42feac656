pub mod keywords;
pub mod load;
pub mod matcher;
pub mod normalize;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::keywords::looks_like_alcohol;
use crate::catalog::normalize::{normalize, tokens};
use crate::policy::MatchPolicy;

pub const DEFAULT_CATEGORY: &str = "General";

/// Position of an entry in the source price list (0-based, blank rows
/// included), so ids stay stable for a given catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CatalogItemId(pub usize);

impl fmt::Display for CatalogItemId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "item_{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub name: String,
    pub normalized_name: String,
    pub price: Decimal,
    pub category: String,
    pub is_alcohol: bool,
}

/// One row of a menu price list before it is admitted to the index.
#[derive(Debug, Clone, Default)]
pub struct CatalogEntry {
    pub name: String,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub is_alcohol: Option<bool>,
}

impl CatalogEntry {
    pub fn priced(name: &str, price: Decimal) -> Self {
        Self {
            name: name.to_string(),
            price: Some(price),
            category: None,
            is_alcohol: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub rows_read: usize,
    pub indexed: usize,
    pub unpriced_placeholders: usize,
    pub unnamed_rows: usize,
    pub duplicate_names: usize,
    pub conflicting_prices: usize,
}

/// Frozen, read-only view of the verified menu.
///
/// Built once per run before any matching starts; shared by reference across
/// allocation workers.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    pub(crate) items: Vec<CatalogItem>,
    pub(crate) token_sets: Vec<BTreeSet<String>>,
    pub(crate) by_id: HashMap<CatalogItemId, usize>,
    pub(crate) by_raw_name: HashMap<String, usize>,
    pub(crate) by_normalized_name: HashMap<String, usize>,
    pub(crate) policy: MatchPolicy,
    stats: CatalogStats,
}

impl CatalogIndex {
    pub fn build(entries: Vec<CatalogEntry>, policy: MatchPolicy) -> Self {
        let mut index = Self::empty(policy);
        let mut first_prices: HashMap<String, Decimal> = HashMap::new();

        for (position, entry) in entries.into_iter().enumerate() {
            index.stats.rows_read += 1;
            let name = entry.name.trim().to_string();
            if name.is_empty() {
                index.stats.unnamed_rows += 1;
                continue;
            }

            let Some(price) = entry.price.filter(|value| *value > Decimal::ZERO) else {
                index.stats.unpriced_placeholders += 1;
                debug!(item = %name, "Skipping unpriced catalog placeholder");
                continue;
            };

            if let Some(existing) = first_prices.get(&name) {
                index.stats.duplicate_names += 1;
                if *existing != price {
                    index.stats.conflicting_prices += 1;
                }
                warn!(
                    item = %name,
                    kept_price = %existing,
                    ignored_price = %price,
                    "Duplicate catalog entry ignored; first priced definition wins"
                );
                continue;
            }
            first_prices.insert(name.clone(), price);

            let normalized_name = normalize(&name);
            let is_alcohol = entry
                .is_alcohol
                .unwrap_or_else(|| looks_like_alcohol(&name));
            let category = entry
                .category
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

            let slot = index.items.len();
            let id = CatalogItemId(position);
            index.by_id.insert(id, slot);
            index.by_raw_name.insert(name.clone(), slot);
            index
                .by_normalized_name
                .entry(normalized_name.clone())
                .or_insert(slot);
            index.token_sets.push(
                tokens(&normalized_name)
                    .map(std::string::ToString::to_string)
                    .collect(),
            );
            index.items.push(CatalogItem {
                id,
                name,
                normalized_name,
                price,
                category,
                is_alcohol,
            });
        }

        index.stats.indexed = index.items.len();
        index
    }

    pub fn empty(policy: MatchPolicy) -> Self {
        Self {
            items: Vec::new(),
            token_sets: Vec::new(),
            by_id: HashMap::new(),
            by_raw_name: HashMap::new(),
            by_normalized_name: HashMap::new(),
            policy,
            stats: CatalogStats::default(),
        }
    }

    pub fn get(&self, id: CatalogItemId) -> Option<&CatalogItem> {
        self.by_id.get(&id).map(|slot| &self.items[*slot])
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn stats(&self) -> CatalogStats {
        self.stats
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::policy::MATCH_POLICY_V1;

    use super::{CatalogEntry, CatalogIndex, CatalogItemId};

    #[test]
    fn first_priced_definition_wins_over_later_duplicates() {
        let index = CatalogIndex::build(
            vec![
                CatalogEntry::priced("Veg Thali", Decimal::ZERO),
                CatalogEntry::priced("Veg Thali", Decimal::from(110)),
                CatalogEntry::priced("Veg Thali", Decimal::from(130)),
                CatalogEntry::priced("Chapati", Decimal::from(20)),
            ],
            MATCH_POLICY_V1,
        );

        assert_eq!(index.len(), 2);
        let thali = index.get(CatalogItemId(1));
        assert!(thali.is_some());
        if let Some(item) = thali {
            assert_eq!(item.price, Decimal::from(110));
        }
        assert!(index.get(CatalogItemId(0)).is_none());

        let stats = index.stats();
        assert_eq!(stats.rows_read, 4);
        assert_eq!(stats.unpriced_placeholders, 1);
        assert_eq!(stats.duplicate_names, 1);
        assert_eq!(stats.conflicting_prices, 1);
    }

    #[test]
    fn alcohol_flag_falls_back_to_keyword_heuristic() {
        let mut explicit = CatalogEntry::priced("House Special", Decimal::from(300));
        explicit.is_alcohol = Some(true);
        let index = CatalogIndex::build(
            vec![
                explicit,
                CatalogEntry::priced("Old Monk 60 ML", Decimal::from(120)),
                CatalogEntry::priced("Sol Kadhi", Decimal::from(40)),
            ],
            MATCH_POLICY_V1,
        );

        let flags = index
            .items()
            .iter()
            .map(|item| item.is_alcohol)
            .collect::<Vec<bool>>();
        assert_eq!(flags, vec![true, true, false]);
        assert!(index.items().iter().all(|item| item.category == "General"));
    }
}
