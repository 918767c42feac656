use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::allocation::OrderItem;
use crate::allocation::batch::AllocatedOrder;
use crate::catalog::{CatalogIndex, CatalogItemId};

/// Narrows which orders feed an analytics pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderScope {
    #[default]
    All,
    /// Orders containing at least one verified alcohol item.
    Alcohol,
    NonAlcohol,
}

impl OrderScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Alcohol => "ALCOHOL",
            Self::NonAlcohol => "NON_ALCOHOL",
        }
    }

    fn admits(self, allocated: &AllocatedOrder, catalog: &CatalogIndex) -> bool {
        match self {
            Self::All => true,
            Self::Alcohol => has_alcohol(allocated, catalog),
            Self::NonAlcohol => !has_alcohol(allocated, catalog),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemMetrics {
    pub catalog_item_id: CatalogItemId,
    pub name: String,
    pub quantity_sold: u64,
    pub total_revenue: Decimal,
}

/// One verified sale of a catalog item.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub order_id: String,
    pub at: NaiveDateTime,
    pub price: f64,
    pub quantity: u32,
}

/// Occurrences priced with a trusted catalog match (HIGH or MEDIUM).
pub fn eligible_item(item: &OrderItem) -> Option<CatalogItemId> {
    if item.confidence.is_verified() {
        return item.catalog_item_id;
    }
    None
}

/// Per catalog item volume and revenue, ordered by item id.
pub fn item_metrics(
    orders: &[AllocatedOrder],
    catalog: &CatalogIndex,
    scope: OrderScope,
) -> Vec<ItemMetrics> {
    let mut grouped: BTreeMap<CatalogItemId, (u64, Decimal)> = BTreeMap::new();
    for allocated in orders {
        if !scope.admits(allocated, catalog) {
            continue;
        }
        for item in &allocated.allocation.items {
            let Some(id) = eligible_item(item) else {
                continue;
            };
            let entry = grouped.entry(id).or_insert((0, Decimal::ZERO));
            entry.0 += u64::from(item.quantity);
            entry.1 += item.allocated_price;
        }
    }

    grouped
        .into_iter()
        .map(|(catalog_item_id, (quantity_sold, total_revenue))| ItemMetrics {
            catalog_item_id,
            name: catalog
                .get(catalog_item_id)
                .map(|item| item.name.clone())
                .unwrap_or_else(|| catalog_item_id.to_string()),
            quantity_sold,
            total_revenue,
        })
        .collect()
}

/// Time-ordered price observations per catalog item.
pub fn price_series(orders: &[AllocatedOrder]) -> BTreeMap<CatalogItemId, Vec<PriceObservation>> {
    let mut series: BTreeMap<CatalogItemId, Vec<PriceObservation>> = BTreeMap::new();
    for allocated in orders {
        for item in &allocated.allocation.items {
            let Some(id) = eligible_item(item) else {
                continue;
            };
            let quantity = item.quantity.max(1);
            series.entry(id).or_default().push(PriceObservation {
                order_id: allocated.order.order_id.clone(),
                at: allocated.order.order_datetime,
                price: crate::money::to_f64(item.allocated_price) / f64::from(quantity),
                quantity,
            });
        }
    }

    for observations in series.values_mut() {
        observations.sort_by(|left, right| {
            left.at
                .cmp(&right.at)
                .then_with(|| left.order_id.cmp(&right.order_id))
        });
    }
    series
}

fn has_alcohol(allocated: &AllocatedOrder, catalog: &CatalogIndex) -> bool {
    allocated.allocation.items.iter().any(|item| {
        eligible_item(item)
            .and_then(|id| catalog.get(id))
            .is_some_and(|catalog_item| catalog_item.is_alcohol)
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::allocation::allocate;
    use crate::allocation::batch::AllocatedOrder;
    use crate::catalog::{CatalogEntry, CatalogIndex, CatalogItemId};
    use crate::ingest::Order;
    use crate::ingest::validate::parse_timestamp;
    use crate::policy::{ALLOCATION_POLICY_V1, MATCH_POLICY_V1};

    use super::{OrderScope, item_metrics, price_series};

    fn allocated(id: &str, total: i64, items: &[&str], catalog: &CatalogIndex) -> AllocatedOrder {
        let names = items.iter().map(ToString::to_string).collect::<Vec<String>>();
        let allocation = allocate(Decimal::from(total), &names, catalog, &ALLOCATION_POLICY_V1);
        AllocatedOrder {
            order: Order {
                order_id: format!("test.csv#{id}"),
                external_id: id.to_string(),
                order_datetime: parse_timestamp("2025-01-01 12:00:00").unwrap_or_default(),
                order_total: Decimal::from(total),
                order_type: None,
                sub_order_type: None,
                service_zone: None,
                table_number: None,
                payment_type: None,
                status: None,
                source_file: "test.csv".to_string(),
                source_row: 1,
                items: names,
            },
            allocation,
        }
    }

    #[test]
    fn only_verified_occurrences_are_counted() {
        let catalog = CatalogIndex::build(
            vec![
                CatalogEntry::priced("Veg Thali", Decimal::from(110)),
                CatalogEntry::priced("Fish Curry Rice", Decimal::from(180)),
                CatalogEntry::priced("Tuborg", Decimal::from(200)),
            ],
            MATCH_POLICY_V1,
        );
        let orders = vec![
            allocated("1", 300, &["Veg Thali", "Fish Curry"], &catalog),
            allocated("2", 310, &["Veg Thali", "Tuborg"], &catalog),
            // clamped: no verified occurrences survive
            allocated("3", 50, &["Veg Thali"], &catalog),
        ];

        let metrics = item_metrics(&orders, &catalog, OrderScope::All);
        let summary = metrics
            .iter()
            .map(|row| (row.catalog_item_id, row.quantity_sold, row.total_revenue))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (CatalogItemId(0), 2, Decimal::from(220)),
                (CatalogItemId(2), 1, Decimal::from(200)),
            ]
        );

        let alcohol = item_metrics(&orders, &catalog, OrderScope::Alcohol);
        assert_eq!(alcohol.len(), 2);
        assert!(alcohol.iter().all(|row| row.quantity_sold == 1));

        let sober = item_metrics(&orders, &catalog, OrderScope::NonAlcohol);
        assert_eq!(sober.len(), 1);
        assert_eq!(sober[0].catalog_item_id, CatalogItemId(0));

        let series = price_series(&orders);
        assert_eq!(series.get(&CatalogItemId(0)).map(Vec::len), Some(2));
        assert!(!series.contains_key(&CatalogItemId(1)));
    }
}
