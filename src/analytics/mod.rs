//! Business formulas computed in the application tier.
//!
//! Everything here is pure: handlers fetch rows from the store layer and pass
//! them in. Money stays in cents; ratios and percentages are `f64`.

pub mod abc;
pub mod alerts;
pub mod channels;
pub mod customers;
pub mod forecast;
pub mod margin;
pub mod opportunities;
pub mod suppliers;
pub mod turnover;
pub mod velocity;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::store::orders::OrderLineItem;

/// Direction of a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// Totals for one SKU over a window of line items
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuSales {
    pub sku: String,
    pub product_name: Option<String>,
    pub quantity: i64,
    /// Cents, after line discounts
    pub revenue: i64,
    /// Cents, from cost at time of sale
    pub cost: i64,
}

/// Sum line items per SKU, ordered by SKU. Items without a SKU are skipped.
pub fn aggregate_by_sku(items: &[OrderLineItem]) -> Vec<SkuSales> {
    let mut by_sku: BTreeMap<&str, SkuSales> = BTreeMap::new();

    for item in items {
        let Some(sku) = item.sku.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let entry = by_sku.entry(sku).or_insert_with(|| SkuSales {
            sku: sku.to_string(),
            product_name: None,
            quantity: 0,
            revenue: 0,
            cost: 0,
        });
        if entry.product_name.is_none() {
            entry.product_name = item.product_name.clone();
        }
        entry.quantity += item.quantity;
        entry.revenue += item.revenue();
        entry.cost += item.cost();
    }

    by_sku.into_values().collect()
}

/// Round to `places` decimals for presentation
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Analyses served by `POST /api/analytics/advanced`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    AbcAnalysis,
    DemandForecast,
    SalesVelocity,
    GrossMargin,
    HiddenOpportunities,
    SupplierPerformance,
    InventoryTurnover,
    CustomerInsights,
    ChannelFees,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 9] = [
        AnalysisType::AbcAnalysis,
        AnalysisType::DemandForecast,
        AnalysisType::SalesVelocity,
        AnalysisType::GrossMargin,
        AnalysisType::HiddenOpportunities,
        AnalysisType::SupplierPerformance,
        AnalysisType::InventoryTurnover,
        AnalysisType::CustomerInsights,
        AnalysisType::ChannelFees,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisType::AbcAnalysis => "abc-analysis",
            AnalysisType::DemandForecast => "demand-forecast",
            AnalysisType::SalesVelocity => "sales-velocity",
            AnalysisType::GrossMargin => "gross-margin",
            AnalysisType::HiddenOpportunities => "hidden-opportunities",
            AnalysisType::SupplierPerformance => "supplier-performance",
            AnalysisType::InventoryTurnover => "inventory-turnover",
            AnalysisType::CustomerInsights => "customer-insights",
            AnalysisType::ChannelFees => "channel-fees",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        AnalysisType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("Unknown analysis type: {}", s))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use crate::store::inventory::InventoryItem;
    use crate::store::orders::OrderLineItem;

    pub fn line_item(sku: &str, quantity: i64, price: i64, cost: i64, at: DateTime<Utc>) -> OrderLineItem {
        OrderLineItem {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            variant_id: None,
            product_name: Some(format!("Product {}", sku)),
            variant_title: None,
            sku: Some(sku.to_string()),
            quantity,
            price,
            total_discount: 0,
            cost_at_time: Some(cost),
            created_at: Some(at),
        }
    }

    pub fn inventory_item(sku: &str, quantity: i64, reorder_point: Option<i64>, price: i64, cost: i64) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            sku: sku.to_string(),
            title: None,
            product_title: Some(format!("Product {}", sku)),
            product_status: Some("active".to_string()),
            product_type: None,
            image_url: None,
            price: Some(price),
            cost: Some(cost),
            inventory_quantity: quantity,
            reorder_point,
            reorder_quantity: None,
            supplier_id: None,
            location: None,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::fixtures::line_item;
    use super::*;

    #[test]
    fn aggregates_line_items_per_sku() {
        let now = Utc::now();
        let mut unnamed = line_item("", 4, 100, 50, now);
        unnamed.sku = None;
        let items = vec![
            line_item("B-2", 2, 1000, 400, now),
            line_item("A-1", 1, 500, 200, now),
            line_item("B-2", 3, 1000, 400, now),
            unnamed,
        ];

        let totals = aggregate_by_sku(&items);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].sku, "A-1");
        assert_eq!(totals[1].quantity, 5);
        assert_eq!(totals[1].revenue, 5000);
        assert_eq!(totals[1].cost, 2000);
    }

    #[test]
    fn analysis_type_names() {
        assert_eq!("abc-analysis".parse(), Ok(AnalysisType::AbcAnalysis));
        assert_eq!("CUSTOMER_INSIGHTS".parse(), Ok(AnalysisType::CustomerInsights));
        assert!("what-if".parse::<AnalysisType>().is_err());
        for kind in AnalysisType::ALL {
            assert_eq!(kind.as_str().parse(), Ok(kind));
        }
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(89.75, 1), 89.8);
    }
}
