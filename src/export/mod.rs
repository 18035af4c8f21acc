//! CSV exports of company data

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::store::analytics::ReorderSuggestion;
use crate::store::inventory::InventoryItem;
use crate::store::orders::Order;
use crate::store::supabase::SupabaseError;
use crate::store::suppliers::Supplier;
use crate::store::{AnalyticsStore, InventoryStore, OrderStore, SupplierStore};
use crate::util::money::format_cents;
use crate::util::time::days_ago;

/// Order history covered by the orders export
pub const ORDER_EXPORT_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Inventory,
    Suppliers,
    Orders,
    ReorderSuggestions,
}

impl ExportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportKind::Inventory => "inventory",
            ExportKind::Suppliers => "suppliers",
            ExportKind::Orders => "orders",
            ExportKind::ReorderSuggestions => "reorder-suggestions",
        }
    }

    fn headers(self) -> &'static [&'static str] {
        match self {
            ExportKind::Inventory => &[
                "sku", "product", "variant", "status", "quantity", "reorder_point", "price", "cost",
                "stock_value", "location",
            ],
            ExportKind::Suppliers => &["name", "email", "phone", "default_lead_time_days", "notes"],
            ExportKind::Orders => &[
                "order_number", "created_at", "customer_email", "financial_status",
                "fulfillment_status", "currency", "subtotal", "tax", "shipping", "discounts", "total",
                "source_platform",
            ],
            ExportKind::ReorderSuggestions => &[
                "sku", "product", "supplier", "current_stock", "reorder_point",
                "suggested_quantity", "unit_cost", "line_total",
            ],
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inventory" => Ok(ExportKind::Inventory),
            "suppliers" => Ok(ExportKind::Suppliers),
            "orders" => Ok(ExportKind::Orders),
            "reorder-suggestions" | "reorder_suggestions" => Ok(ExportKind::ReorderSuggestions),
            other => Err(ExportError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Unknown export '{0}'")]
    UnknownKind(String),

    #[error("Could not write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not finish CSV: {0}")]
    Flush(String),

    #[error(transparent)]
    Store(#[from] SupabaseError),
}

/// A rendered CSV file
#[derive(Debug)]
pub struct CsvFile {
    pub filename: String,
    pub body: Vec<u8>,
}

fn write_csv<T: Serialize>(headers: &[&str], rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| ExportError::Flush(e.to_string()))
}

fn money(cents: Option<i64>) -> String {
    cents.map(format_cents).unwrap_or_default()
}

pub fn inventory_csv(items: &[InventoryItem]) -> Result<Vec<u8>, ExportError> {
    let rows = items.iter().map(|item| {
        (
            &item.sku,
            item.product_title.as_deref().unwrap_or_default(),
            item.title.as_deref().unwrap_or_default(),
            item.stock_status().as_str(),
            item.inventory_quantity,
            item.reorder_point,
            money(item.price),
            money(item.cost),
            format_cents(item.stock_value()),
            item.location.as_deref().unwrap_or_default(),
        )
    });
    write_csv(ExportKind::Inventory.headers(), rows)
}

pub fn suppliers_csv(suppliers: &[Supplier]) -> Result<Vec<u8>, ExportError> {
    let rows = suppliers.iter().map(|s| {
        (
            &s.name,
            s.email.as_deref().unwrap_or_default(),
            s.phone.as_deref().unwrap_or_default(),
            s.default_lead_time_days,
            s.notes.as_deref().unwrap_or_default(),
        )
    });
    write_csv(ExportKind::Suppliers.headers(), rows)
}

pub fn orders_csv(orders: &[Order]) -> Result<Vec<u8>, ExportError> {
    let rows = orders.iter().map(|o| {
        (
            &o.order_number,
            o.created_at.to_rfc3339(),
            o.customer_email.as_deref().unwrap_or_default(),
            o.financial_status.as_deref().unwrap_or_default(),
            o.fulfillment_status.as_deref().unwrap_or_default(),
            o.currency.as_deref().unwrap_or_default(),
            format_cents(o.subtotal),
            format_cents(o.total_tax),
            format_cents(o.total_shipping),
            format_cents(o.total_discounts),
            format_cents(o.total_amount),
            o.source_platform.as_deref().unwrap_or_default(),
        )
    });
    write_csv(ExportKind::Orders.headers(), rows)
}

pub fn reorder_csv(suggestions: &[ReorderSuggestion]) -> Result<Vec<u8>, ExportError> {
    let rows = suggestions.iter().map(|s| {
        (
            &s.sku,
            s.product_name.as_deref().unwrap_or_default(),
            s.supplier_name.as_deref().unwrap_or_default(),
            s.current_stock,
            s.reorder_point,
            s.suggested_reorder_quantity,
            money(s.unit_cost),
            money(s.unit_cost.map(|c| c * s.suggested_reorder_quantity)),
        )
    });
    write_csv(ExportKind::ReorderSuggestions.headers(), rows)
}

#[derive(Clone)]
pub struct Exporter {
    inventory: InventoryStore,
    suppliers: SupplierStore,
    orders: OrderStore,
    analytics: AnalyticsStore,
}

impl Exporter {
    pub fn new(
        inventory: InventoryStore,
        suppliers: SupplierStore,
        orders: OrderStore,
        analytics: AnalyticsStore,
    ) -> Self {
        Self {
            inventory,
            suppliers,
            orders,
            analytics,
        }
    }

    pub async fn export(&self, company_id: Uuid, kind: ExportKind) -> Result<CsvFile, ExportError> {
        let body = match kind {
            ExportKind::Inventory => inventory_csv(&self.inventory.all(company_id).await?)?,
            ExportKind::Suppliers => suppliers_csv(&self.suppliers.all(company_id).await?)?,
            ExportKind::Orders => {
                let orders = self
                    .orders
                    .since(company_id, days_ago(ORDER_EXPORT_DAYS))
                    .await?;
                orders_csv(&orders)?
            }
            ExportKind::ReorderSuggestions => {
                reorder_csv(&self.analytics.reorder_suggestions(company_id).await?)?
            }
        };

        Ok(CsvFile {
            filename: format!("{}-{}.csv", kind, Utc::now().format("%Y-%m-%d")),
            body,
        })
    }
}
