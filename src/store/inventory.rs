//! Inventory views, adjustments and the stock ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::query::{Pagination, Query};
use super::supabase::{SupabaseClient, SupabaseError};

/// Row of `product_variants_with_details`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct InventoryItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub product_title: Option<String>,
    #[serde(default)]
    pub product_status: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Cents
    #[serde(default)]
    pub price: Option<i64>,
    /// Cents
    #[serde(default)]
    pub cost: Option<i64>,
    pub inventory_quantity: i64,
    #[serde(default)]
    pub reorder_point: Option<i64>,
    #[serde(default)]
    pub reorder_quantity: Option<i64>,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.inventory_quantity, self.reorder_point)
    }

    /// Quantity times unit cost, zero when cost is unknown
    pub fn stock_value(&self) -> i64 {
        self.inventory_quantity.max(0) * self.cost.unwrap_or(0)
    }

    pub fn display_name(&self) -> String {
        match (&self.product_title, &self.title) {
            (Some(product), Some(variant)) if !variant.is_empty() && variant != "Default Title" => {
                format!("{} - {}", product, variant)
            }
            (Some(product), _) => product.clone(),
            (None, Some(variant)) => variant.clone(),
            (None, None) => self.sku.clone(),
        }
    }
}

/// Stock level bucket for a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Out of stock at zero or below; low stock needs a reorder point
    pub fn classify(quantity: i64, reorder_point: Option<i64>) -> Self {
        if quantity <= 0 {
            return StockStatus::OutOfStock;
        }
        match reorder_point {
            Some(point) if point > 0 && quantity <= point => StockStatus::LowStock,
            _ => StockStatus::InStock,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

/// Filters for the inventory listing
#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub search: Option<String>,
    pub status: Option<StockStatus>,
}

/// Arguments for `adjust_inventory_quantity`
#[derive(Debug, Serialize)]
struct AdjustArgs<'a> {
    p_company_id: Uuid,
    p_variant_id: Uuid,
    p_new_quantity: i64,
    p_change_reason: &'a str,
    p_user_id: Uuid,
}

/// Result of a stock adjustment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct InventoryAdjustment {
    pub variant_id: Uuid,
    pub previous_quantity: i64,
    pub new_quantity: i64,
}

/// Row of `inventory_ledger`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct LedgerEntry {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub change_type: String,
    pub quantity_change: i64,
    pub new_quantity: i64,
    #[serde(default)]
    pub related_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Inventory store operations
#[derive(Clone)]
pub struct InventoryStore {
    client: SupabaseClient,
}

impl InventoryStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// One page of inventory with the total number of matching variants
    pub async fn list(
        &self,
        company_id: Uuid,
        filter: &InventoryFilter,
        page: Pagination,
    ) -> Result<(Vec<InventoryItem>, u64), SupabaseError> {
        let mut query = Query::for_company(company_id).is_null("deleted_at");

        if let Some(term) = &filter.search {
            query = query.search(&["product_title", "sku", "title"], term);
        }
        if let Some(status) = filter.status {
            query = query.eq("stock_status", status.as_str());
        }

        let query = query.order("product_title", false).order("sku", false).paginate(page);
        self.client
            .get_page("product_variants_with_details", &query)
            .await
    }

    /// Every live variant for the company, used by exports and alerts
    pub async fn all(&self, company_id: Uuid) -> Result<Vec<InventoryItem>, SupabaseError> {
        let query = Query::for_company(company_id)
            .is_null("deleted_at")
            .order("sku", false);
        self.client
            .get("product_variants_with_details", &query)
            .await
    }

    /// Set a variant's on-hand quantity; the database locks the row and
    /// writes the ledger entry
    pub async fn adjust_quantity(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        variant_id: Uuid,
        new_quantity: i64,
        reason: &str,
    ) -> Result<InventoryAdjustment, SupabaseError> {
        let args = AdjustArgs {
            p_company_id: company_id,
            p_variant_id: variant_id,
            p_new_quantity: new_quantity,
            p_change_reason: reason,
            p_user_id: user_id,
        };
        self.client.rpc("adjust_inventory_quantity", &args).await
    }

    /// Ledger history for one variant, newest first
    pub async fn ledger(
        &self,
        company_id: Uuid,
        variant_id: Uuid,
        page: Pagination,
    ) -> Result<(Vec<LedgerEntry>, u64), SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("variant_id", variant_id)
            .order("created_at", true)
            .paginate(page);
        self.client.get_page("inventory_ledger", &query).await
    }
}
