use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;

use crate::contracts::types::{MonthlyTrendRow, ServiceZoneRow};
use crate::ingest::{ORDER_DATETIME_FORMAT, Order};
use crate::money::{round_currency, to_f64};

/// Zone label for orders exported without a sub order type.
pub const UNSPECIFIED_ZONE: &str = "Unspecified";

const LUNCH_HOURS: RangeInclusive<u32> = 11..=15;
const DINNER_HOURS: RangeInclusive<u32> = 19..=23;
const PEAK_HOUR_COUNT: usize = 3;

#[derive(Debug, Default)]
struct ZoneTotals {
    order_count: usize,
    revenue: Decimal,
    lunch_orders: usize,
    dinner_orders: usize,
    first_order: Option<NaiveDateTime>,
    last_order: Option<NaiveDateTime>,
    orders_by_hour: BTreeMap<u32, usize>,
    days: BTreeSet<NaiveDate>,
}

impl ZoneTotals {
    fn add(&mut self, order: &Order) {
        let at = order.order_datetime;
        let hour = at.hour();
        self.order_count += 1;
        self.revenue += order.order_total;
        if LUNCH_HOURS.contains(&hour) {
            self.lunch_orders += 1;
        }
        if DINNER_HOURS.contains(&hour) {
            self.dinner_orders += 1;
        }
        self.first_order = Some(self.first_order.map_or(at, |first| first.min(at)));
        self.last_order = Some(self.last_order.map_or(at, |last| last.max(at)));
        *self.orders_by_hour.entry(hour).or_insert(0) += 1;
        self.days.insert(at.date());
    }

    fn average_order_value(&self) -> Decimal {
        if self.order_count == 0 {
            return Decimal::ZERO;
        }
        round_currency(self.revenue / Decimal::from(self.order_count))
    }

    // Busiest hours first; ties go to the earlier hour.
    fn peak_hours(&self) -> Vec<u32> {
        let mut hours = self
            .orders_by_hour
            .iter()
            .map(|(hour, count)| (*hour, *count))
            .collect::<Vec<(u32, usize)>>();
        hours.sort_by(|left, right| right.1.cmp(&left.1).then(left.0.cmp(&right.0)));
        hours
            .into_iter()
            .take(PEAK_HOUR_COUNT)
            .map(|(hour, _)| hour)
            .collect()
    }
}

fn zone_of(order: &Order) -> String {
    order
        .service_zone
        .clone()
        .unwrap_or_else(|| UNSPECIFIED_ZONE.to_string())
}

fn format_at(at: Option<NaiveDateTime>) -> String {
    at.map(|value| value.format(ORDER_DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Orders, revenue and meal-period mix per service zone, highest revenue
/// first.
pub fn service_zones<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Vec<ServiceZoneRow> {
    let mut zones: BTreeMap<String, ZoneTotals> = BTreeMap::new();
    for order in orders {
        zones.entry(zone_of(order)).or_default().add(order);
    }

    let mut rows = zones
        .into_iter()
        .map(|(service_zone, totals)| ServiceZoneRow {
            service_zone,
            order_count: totals.order_count,
            total_revenue: totals.revenue,
            avg_order_value: totals.average_order_value(),
            lunch_orders: totals.lunch_orders,
            dinner_orders: totals.dinner_orders,
            first_order: format_at(totals.first_order),
            last_order: format_at(totals.last_order),
            peak_hours: totals.peak_hours(),
        })
        .collect::<Vec<ServiceZoneRow>>();
    rows.sort_by(|left, right| {
        right
            .total_revenue
            .cmp(&left.total_revenue)
            .then_with(|| left.service_zone.cmp(&right.service_zone))
    });
    rows
}

/// Per month and service zone totals with growth against the previous month
/// that has any orders.
pub fn monthly_trends<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Vec<MonthlyTrendRow> {
    let mut months: BTreeMap<String, BTreeMap<String, ZoneTotals>> = BTreeMap::new();
    for order in orders {
        let month = order.order_datetime.format("%Y-%m").to_string();
        months
            .entry(month)
            .or_default()
            .entry(zone_of(order))
            .or_default()
            .add(order);
    }

    let mut rows = Vec::new();
    let mut previous: Option<&BTreeMap<String, ZoneTotals>> = None;
    for (month, zones) in &months {
        for (zone, totals) in zones {
            let prior = previous.map(|zones| zones.get(zone));
            rows.push(MonthlyTrendRow {
                month: month.clone(),
                service_zone: zone.clone(),
                order_count: totals.order_count,
                revenue: totals.revenue,
                avg_order_value: totals.average_order_value(),
                active_days: totals.days.len(),
                order_growth_pct: prior.map(|prior| {
                    growth_pct(
                        prior.map_or(0.0, |prior| prior.order_count as f64),
                        totals.order_count as f64,
                    )
                }),
                revenue_growth_pct: prior.map(|prior| {
                    growth_pct(
                        prior.map_or(0.0, |prior| to_f64(prior.revenue)),
                        to_f64(totals.revenue),
                    )
                }),
            });
        }
        previous = Some(zones);
    }
    rows
}

// A zone with nothing the month before counts as 100% growth.
fn growth_pct(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return if current == 0.0 { 0.0 } else { 100.0 };
    }
    (((current - previous) / previous) * 10_000.0).round() / 100.0
}
