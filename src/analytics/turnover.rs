//! Inventory turnover per SKU

use std::collections::HashMap;

use serde::Serialize;

use super::{round_to, SkuSales};
use crate::store::inventory::InventoryItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnoverRating {
    Excellent,
    Good,
    Average,
    Poor,
    DeadStock,
}

impl TurnoverRating {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 10.0 {
            TurnoverRating::Excellent
        } else if ratio >= 6.0 {
            TurnoverRating::Good
        } else if ratio >= 3.0 {
            TurnoverRating::Average
        } else if ratio > 0.0 {
            TurnoverRating::Poor
        } else {
            TurnoverRating::DeadStock
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuTurnover {
    pub sku: String,
    pub product_name: Option<String>,
    /// Cost of goods sold, scaled to a year, in cents
    pub annual_cogs: i64,
    /// On-hand quantity at cost, in cents
    pub inventory_value: i64,
    pub turnover_ratio: f64,
    /// `None` when nothing sells
    pub days_of_inventory: Option<f64>,
    pub rating: TurnoverRating,
}

/// Annual COGS over inventory value; zero without inventory value
pub fn turnover_ratio(annual_cogs: i64, inventory_value: i64) -> f64 {
    if inventory_value <= 0 {
        return 0.0;
    }
    annual_cogs as f64 / inventory_value as f64
}

pub fn days_of_inventory(ratio: f64) -> Option<f64> {
    (ratio > 0.0).then(|| 365.0 / ratio)
}

/// Turnover for every stocked SKU. `sales` covers the last `days` days and
/// is annualized.
pub fn inventory_turnover(sales: &[SkuSales], inventory: &[InventoryItem], days: u32) -> Vec<SkuTurnover> {
    let scale = 365.0 / f64::from(days.max(1));
    let cogs_by_sku: HashMap<&str, i64> = sales.iter().map(|s| (s.sku.as_str(), s.cost)).collect();

    let mut rows: Vec<SkuTurnover> = inventory
        .iter()
        .map(|item| {
            let cogs = cogs_by_sku.get(item.sku.as_str()).copied().unwrap_or(0);
            let annual_cogs = (cogs as f64 * scale).round() as i64;
            let inventory_value = item.stock_value();
            let ratio = turnover_ratio(annual_cogs, inventory_value);
            SkuTurnover {
                sku: item.sku.clone(),
                product_name: Some(item.display_name()),
                annual_cogs,
                inventory_value,
                turnover_ratio: round_to(ratio, 2),
                days_of_inventory: days_of_inventory(ratio).map(|d| round_to(d, 1)),
                rating: TurnoverRating::from_ratio(ratio),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.turnover_ratio
            .total_cmp(&a.turnover_ratio)
            .then_with(|| a.sku.cmp(&b.sku))
    });
    rows
}
