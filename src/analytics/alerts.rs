//! Stock alerts derived from variant rows

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::store::inventory::{InventoryItem, StockStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    OutOfStock,
    LowStock,
    DeadStock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub variant_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub message: String,
    pub quantity: i64,
    pub reorder_point: Option<i64>,
    pub last_sold_at: Option<DateTime<Utc>>,
}

/// One alert per variant at most. Stock problems take precedence over dead
/// stock. A variant is dead stock when it has stock and no sale within
/// `dead_stock_days`; never-sold variants only count once they have been
/// untouched that long.
pub fn derive_alerts(
    items: &[InventoryItem],
    last_sales: &HashMap<String, DateTime<Utc>>,
    dead_stock_days: i64,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let cutoff = now - Duration::days(dead_stock_days.max(1));

    let mut alerts: Vec<Alert> = items
        .iter()
        .filter_map(|item| {
            let last_sold_at = last_sales.get(&item.sku).copied();
            let name = item.display_name();

            let (kind, severity, message) = match item.stock_status() {
                StockStatus::OutOfStock => (
                    AlertKind::OutOfStock,
                    Severity::Critical,
                    format!("{} is out of stock", name),
                ),
                StockStatus::LowStock => (
                    AlertKind::LowStock,
                    Severity::Warning,
                    format!(
                        "{} is low on stock ({} left, reorder point {})",
                        name,
                        item.inventory_quantity,
                        item.reorder_point.unwrap_or(0)
                    ),
                ),
                StockStatus::InStock => {
                    let last_activity = last_sold_at.or(item.updated_at);
                    let stale = last_activity.map_or(true, |at| at < cutoff);
                    if !stale {
                        return None;
                    }
                    (
                        AlertKind::DeadStock,
                        Severity::Info,
                        format!("{} has not sold in over {} days", name, dead_stock_days),
                    )
                }
            };

            Some(Alert {
                kind,
                severity,
                variant_id: item.id,
                sku: item.sku.clone(),
                product_name: name,
                message,
                quantity: item.inventory_quantity,
                reorder_point: item.reorder_point,
                last_sold_at,
            })
        })
        .collect();

    alerts.sort_by(|a, b| a.severity.cmp(&b.severity).then_with(|| a.sku.cmp(&b.sku)));
    alerts
}
