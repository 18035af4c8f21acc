//! Sales velocity per SKU

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::{round_to, Trend};
use crate::store::orders::OrderLineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VelocityCategory {
    High,
    Medium,
    Low,
}

impl VelocityCategory {
    pub fn from_units_per_day(velocity: f64) -> Self {
        if velocity >= 5.0 {
            VelocityCategory::High
        } else if velocity >= 1.0 {
            VelocityCategory::Medium
        } else {
            VelocityCategory::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuVelocity {
    pub sku: String,
    pub product_name: Option<String>,
    pub total_quantity: i64,
    pub total_revenue: i64,
    pub days_period: u32,
    pub velocity_per_day: f64,
    /// Cents per day
    pub revenue_per_day: f64,
    pub trend: Trend,
    pub performance_category: VelocityCategory,
}

/// Compare the two halves of the window; a 10% change either way is a trend
pub fn half_over_half(first: i64, second: i64) -> Trend {
    let (first, second) = (first as f64, second as f64);
    if second > first * 1.1 {
        Trend::Increasing
    } else if second < first * 0.9 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[derive(Default)]
struct Accumulator {
    product_name: Option<String>,
    quantity: i64,
    revenue: i64,
    first_half: i64,
    second_half: i64,
}

/// Velocity for every SKU sold in the `days` window starting at `since`,
/// fastest first
pub fn sales_velocity(items: &[OrderLineItem], since: DateTime<Utc>, days: u32) -> Vec<SkuVelocity> {
    let days = days.max(1);
    let midpoint = since + Duration::seconds(i64::from(days) * 86_400 / 2);
    let mut by_sku: BTreeMap<&str, Accumulator> = BTreeMap::new();

    for item in items {
        let Some(sku) = item.sku.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let acc = by_sku.entry(sku).or_default();
        if acc.product_name.is_none() {
            acc.product_name = item.product_name.clone();
        }
        acc.quantity += item.quantity;
        acc.revenue += item.revenue();
        match item.created_at {
            Some(at) if at < midpoint => acc.first_half += item.quantity,
            Some(_) => acc.second_half += item.quantity,
            None => {}
        }
    }

    let mut rows: Vec<SkuVelocity> = by_sku
        .into_iter()
        .map(|(sku, acc)| {
            let velocity = acc.quantity as f64 / f64::from(days);
            SkuVelocity {
                sku: sku.to_string(),
                product_name: acc.product_name,
                total_quantity: acc.quantity,
                total_revenue: acc.revenue,
                days_period: days,
                velocity_per_day: round_to(velocity, 2),
                revenue_per_day: round_to(acc.revenue as f64 / f64::from(days), 2),
                trend: half_over_half(acc.first_half, acc.second_half),
                performance_category: VelocityCategory::from_units_per_day(velocity),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.velocity_per_day
            .total_cmp(&a.velocity_per_day)
            .then_with(|| a.sku.cmp(&b.sku))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::line_item;

    #[test]
    fn thirty_day_velocity() {
        let since = Utc::now() - Duration::days(30);
        let items = vec![
            line_item("TEST-001", 10, 100, 50, since + Duration::days(1)),
            line_item("TEST-001", 15, 100, 50, since + Duration::days(16)),
            line_item("TEST-001", 20, 100, 50, since + Duration::days(29)),
        ];

        let rows = sales_velocity(&items, since, 30);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.total_quantity, 45);
        assert_eq!(row.total_revenue, 4500);
        assert_eq!(row.velocity_per_day, 1.5);
        assert_eq!(row.revenue_per_day, 150.0);
        assert_eq!(row.trend, Trend::Increasing);
        assert_eq!(row.performance_category, VelocityCategory::Medium);
    }

    #[test]
    fn fastest_first() {
        let since = Utc::now() - Duration::days(10);
        let at = since + Duration::days(2);
        let items = vec![
            line_item("SLOW", 2, 100, 50, at),
            line_item("FAST", 60, 100, 50, at),
        ];
        let rows = sales_velocity(&items, since, 10);
        assert_eq!(rows[0].sku, "FAST");
        assert_eq!(rows[0].performance_category, VelocityCategory::High);
        assert_eq!(rows[0].trend, Trend::Decreasing);
        assert_eq!(rows[1].performance_category, VelocityCategory::Low);
    }

    #[test]
    fn half_over_half_thresholds() {
        assert_eq!(half_over_half(100, 110), Trend::Stable);
        assert_eq!(half_over_half(100, 111), Trend::Increasing);
        assert_eq!(half_over_half(100, 89), Trend::Decreasing);
        assert_eq!(half_over_half(0, 0), Trend::Stable);
        assert_eq!(half_over_half(0, 3), Trend::Increasing);
    }
}
