use std::thread;

use tracing::debug;

use crate::allocation::{Allocation, allocate};
use crate::catalog::CatalogIndex;
use crate::contracts::types::AllocatedItemRecord;
use crate::ingest::Order;
use crate::policy::AllocationPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct AllocatedOrder {
    pub order: Order,
    pub allocation: Allocation,
}

/// Allocates every order against a frozen catalog.
///
/// Orders are split into contiguous chunks, one per worker; chunk results are
/// concatenated in chunk order, so the output order equals the input order
/// for any worker count.
pub fn allocate_orders(
    orders: Vec<Order>,
    catalog: &CatalogIndex,
    policy: &AllocationPolicy,
) -> Vec<AllocatedOrder> {
    let workers = policy.workers.max(1).min(orders.len().max(1));
    let chunk_size = orders.len().div_ceil(workers).max(1);
    debug!(orders = orders.len(), workers, chunk_size, "Allocating orders");

    let allocations = if workers == 1 {
        allocate_chunk(&orders, catalog, policy)
    } else {
        thread::scope(|scope| {
            let handles = orders
                .chunks(chunk_size)
                .map(|chunk| scope.spawn(move || allocate_chunk(chunk, catalog, policy)))
                .collect::<Vec<_>>();

            let mut merged = Vec::with_capacity(orders.len());
            for handle in handles {
                match handle.join() {
                    Ok(chunk) => merged.extend(chunk),
                    Err(payload) => std::panic::resume_unwind(payload),
                }
            }
            merged
        })
    };

    orders
        .into_iter()
        .zip(allocations)
        .map(|(order, allocation)| AllocatedOrder { order, allocation })
        .collect()
}

fn allocate_chunk(
    chunk: &[Order],
    catalog: &CatalogIndex,
    policy: &AllocationPolicy,
) -> Vec<Allocation> {
    chunk
        .iter()
        .map(|order| allocate(order.order_total, &order.items, catalog, policy))
        .collect()
}

/// Flattens allocated orders into the item-level revenue dataset.
pub fn item_records(orders: &[AllocatedOrder], catalog: &CatalogIndex) -> Vec<AllocatedItemRecord> {
    let mut records = Vec::new();
    for allocated in orders {
        let order_datetime = allocated.order.formatted_datetime();
        for item in &allocated.allocation.items {
            records.push(AllocatedItemRecord {
                order_id: allocated.order.order_id.clone(),
                source_file: allocated.order.source_file.clone(),
                order_datetime: order_datetime.clone(),
                line_number: item.line_number,
                raw_name: item.raw_name.clone(),
                normalized_name: item.normalized_name.clone(),
                quantity: item.quantity,
                catalog_item_id: item.catalog_item_id,
                candidate_item_id: item.candidate_item_id,
                catalog_name: item
                    .catalog_item_id
                    .and_then(|id| catalog.get(id))
                    .map(|catalog_item| catalog_item.name.clone()),
                menu_price: item.menu_price,
                allocated_price: item.allocated_price,
                confidence: item.confidence,
                match_score: item.match_score,
                allocation_method: item.allocation_method,
                reconciliation_adjustment: item.reconciliation_adjustment,
            });
        }
    }
    records
}
