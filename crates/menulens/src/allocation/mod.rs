pub mod batch;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::catalog::matcher::Confidence;
use crate::catalog::normalize::normalize;
use crate::catalog::{CatalogIndex, CatalogItemId};
use crate::money::round_currency;
use crate::policy::AllocationPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationMethod {
    MenuPrice,
    EqualSplit,
    ProportionalFallback,
}

impl AllocationMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MenuPrice => "MENU_PRICE",
            Self::EqualSplit => "EQUAL_SPLIT",
            Self::ProportionalFallback => "PROPORTIONAL_FALLBACK",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [Self::MenuPrice, Self::EqualSplit, Self::ProportionalFallback]
            .into_iter()
            .find(|method| method.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationPath {
    Empty,
    Clamped,
    MatchedOnly,
    EqualSplit,
}

impl AllocationPath {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::Clamped => "CLAMPED",
            Self::MatchedOnly => "MATCHED_ONLY",
            Self::EqualSplit => "EQUAL_SPLIT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditFlag {
    /// Verified menu prices alone add up to more than the amount paid.
    MatchedPricesExceedTotal {
        known_total: Decimal,
        order_total: Decimal,
    },
    /// The order was paid at zero or a negative amount (refund, comp).
    NonPositiveTotal { order_total: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    /// 1-based position in the order's item list.
    pub line_number: usize,
    pub raw_name: String,
    pub normalized_name: String,
    pub quantity: u32,
    pub catalog_item_id: Option<CatalogItemId>,
    pub candidate_item_id: Option<CatalogItemId>,
    pub menu_price: Option<Decimal>,
    pub allocated_price: Decimal,
    pub confidence: Confidence,
    pub match_score: Option<f64>,
    pub allocation_method: AllocationMethod,
    pub reconciliation_adjustment: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub items: Vec<OrderItem>,
    pub path: AllocationPath,
    pub audit: Option<AuditFlag>,
}

impl Allocation {
    pub fn allocated_total(&self) -> Decimal {
        allocated_total(&self.items)
    }
}

/// Picks the allocation path for an order.
///
/// | items empty | remaining < 0 | unmatched empty | path        |
/// |-------------|---------------|-----------------|-------------|
/// | yes         | -             | -               | Empty       |
/// | no          | yes           | -               | Clamped     |
/// | no          | no            | yes             | MatchedOnly |
/// | no          | no            | no              | EqualSplit  |
pub fn decide(has_items: bool, remaining: Decimal, has_unmatched: bool) -> AllocationPath {
    match (has_items, remaining < Decimal::ZERO, has_unmatched) {
        (false, _, _) => AllocationPath::Empty,
        (true, true, _) => AllocationPath::Clamped,
        (true, false, false) => AllocationPath::MatchedOnly,
        (true, false, true) => AllocationPath::EqualSplit,
    }
}

/// Splits an order total across its item lines.
///
/// HIGH and MEDIUM matches are priced at their menu price; everything else
/// shares what is left. The result always sums exactly to `order_total`
/// (except for an item-less order, which yields no lines).
pub fn allocate(
    order_total: Decimal,
    raw_items: &[String],
    catalog: &CatalogIndex,
    policy: &AllocationPolicy,
) -> Allocation {
    let mut items = raw_items
        .iter()
        .enumerate()
        .map(|(index, raw_name)| matched_line(index + 1, raw_name, catalog))
        .collect::<Vec<OrderItem>>();

    let matched_slots = slots_where(&items, |item| item.confidence.is_verified());
    let unmatched_slots = slots_where(&items, |item| !item.confidence.is_verified());
    let known_total = matched_slots
        .iter()
        .filter_map(|slot| items[*slot].menu_price)
        .sum::<Decimal>();
    let remaining = order_total - known_total;

    let path = decide(!items.is_empty(), remaining, !unmatched_slots.is_empty());
    let mut audit = None;
    match path {
        AllocationPath::Empty => {
            return Allocation {
                items,
                path,
                audit,
            };
        }
        AllocationPath::Clamped => {
            warn!(
                %order_total,
                %known_total,
                items = items.len(),
                "Matched menu prices exceed order total; allocating proportionally"
            );
            clamp(&mut items, order_total);
            audit = Some(AuditFlag::MatchedPricesExceedTotal {
                known_total,
                order_total,
            });
        }
        AllocationPath::MatchedOnly => {
            price_matched(&mut items, &matched_slots);
        }
        AllocationPath::EqualSplit => {
            price_matched(&mut items, &matched_slots);
            let share = round_currency(remaining / Decimal::from(unmatched_slots.len()));
            for slot in &unmatched_slots {
                items[*slot].allocated_price = share;
                items[*slot].allocation_method = AllocationMethod::EqualSplit;
            }
        }
    }

    if order_total <= Decimal::ZERO {
        audit = Some(AuditFlag::NonPositiveTotal { order_total });
    }

    let designated = unmatched_slots
        .last()
        .or(matched_slots.last())
        .copied()
        .unwrap_or(items.len() - 1);
    reconcile(&mut items, designated, order_total, policy);

    Allocation { items, path, audit }
}

fn matched_line(line_number: usize, raw_name: &str, catalog: &CatalogIndex) -> OrderItem {
    let result = catalog.match_name(raw_name);
    let candidate = result.catalog_item_id;
    let menu_price = candidate
        .and_then(|id| catalog.get(id))
        .map(|item| item.price);

    OrderItem {
        line_number,
        raw_name: raw_name.trim().to_string(),
        normalized_name: normalize(raw_name),
        quantity: 1,
        catalog_item_id: candidate.filter(|_| result.tier != Confidence::Estimated),
        candidate_item_id: candidate,
        menu_price,
        allocated_price: Decimal::ZERO,
        confidence: result.tier,
        match_score: candidate.map(|_| result.score),
        allocation_method: AllocationMethod::EqualSplit,
        reconciliation_adjustment: Decimal::ZERO,
    }
}

fn slots_where(items: &[OrderItem], predicate: impl Fn(&OrderItem) -> bool) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| predicate(item))
        .map(|(slot, _)| slot)
        .collect()
}

fn price_matched(items: &mut [OrderItem], matched_slots: &[usize]) {
    for slot in matched_slots {
        let item = &mut items[*slot];
        item.allocated_price = item.menu_price.unwrap_or_default();
        item.allocation_method = AllocationMethod::MenuPrice;
    }
}

// Lines weigh their menu price whatever the match tier; lines without one
// weigh the mean of those that have one, or everything weighs the same when
// no line has a menu price.
fn clamp(items: &mut [OrderItem], order_total: Decimal) {
    let priced = items
        .iter()
        .filter_map(|item| item.menu_price)
        .collect::<Vec<Decimal>>();
    let fallback_weight = if priced.is_empty() {
        Decimal::ONE
    } else {
        priced.iter().copied().sum::<Decimal>() / Decimal::from(priced.len())
    };
    let weights = items
        .iter()
        .map(|item| item.menu_price.unwrap_or(fallback_weight))
        .collect::<Vec<Decimal>>();
    let weight_total = weights.iter().copied().sum::<Decimal>();

    for (item, weight) in items.iter_mut().zip(weights) {
        item.allocated_price = if weight_total.is_zero() {
            Decimal::ZERO
        } else {
            round_currency(order_total * weight / weight_total)
        };
        item.allocation_method = AllocationMethod::ProportionalFallback;
        item.confidence = Confidence::Estimated;
        item.catalog_item_id = None;
    }
}

fn reconcile(
    items: &mut [OrderItem],
    designated: usize,
    order_total: Decimal,
    policy: &AllocationPolicy,
) {
    let residual = order_total - allocated_total(items);
    if !residual.is_zero() {
        let item = &mut items[designated];
        item.allocated_price += residual;
        item.reconciliation_adjustment = residual;
        if residual.abs() > policy.notable_adjustment {
            debug!(
                item = %item.raw_name,
                adjustment = %residual,
                %order_total,
                "Large reconciliation adjustment"
            );
        }
    }

    let settled = allocated_total(items);
    if settled != order_total {
        debug_assert_eq!(settled, order_total, "allocation does not preserve the order total");
        let defect = order_total - settled;
        error!(
            %order_total,
            %settled,
            %defect,
            "Allocation total mismatch after reconciliation; forcing absorption"
        );
        let item = &mut items[designated];
        item.allocated_price += defect;
        item.reconciliation_adjustment += defect;
    }
}

fn allocated_total(items: &[OrderItem]) -> Decimal {
    items.iter().map(|item| item.allocated_price).sum()
}
