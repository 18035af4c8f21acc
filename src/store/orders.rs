//! Sales orders and their line items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::query::{Pagination, Query};
use super::supabase::{SupabaseClient, SupabaseError};

/// Page size used when walking line items for analytics
const LINE_ITEM_PAGE: u32 = 1000;
/// Upper bound on pages fetched per analytics request
const MAX_LINE_ITEM_PAGES: u32 = 20;

/// Row of `orders_view`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub subtotal: i64,
    #[serde(default)]
    pub total_tax: i64,
    #[serde(default)]
    pub total_shipping: i64,
    #[serde(default)]
    pub total_discounts: i64,
    pub total_amount: i64,
    #[serde(default)]
    pub source_platform: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename(deserialize = "order_line_items"), skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<OrderLineItem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct OrderLineItem {
    pub id: Uuid,
    pub order_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: i64,
    /// Unit price in cents
    pub price: i64,
    #[serde(default)]
    pub total_discount: i64,
    #[serde(default)]
    pub cost_at_time: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl OrderLineItem {
    pub fn revenue(&self) -> i64 {
        self.price * self.quantity - self.total_discount
    }

    pub fn cost(&self) -> i64 {
        self.cost_at_time.unwrap_or(0) * self.quantity
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub search: Option<String>,
    pub financial_status: Option<String>,
}

/// Order store operations
#[derive(Clone)]
pub struct OrderStore {
    client: SupabaseClient,
}

impl OrderStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        filter: &OrderFilter,
        page: Pagination,
    ) -> Result<(Vec<Order>, u64), SupabaseError> {
        let mut query = Query::for_company(company_id);
        if let Some(term) = &filter.search {
            query = query.search(&["order_number", "customer_email"], term);
        }
        if let Some(status) = &filter.financial_status {
            query = query.eq("financial_status", status);
        }
        let query = query.order("created_at", true).paginate(page);
        self.client.get_page("orders_view", &query).await
    }

    /// Orders created since `since`, newest first, for exports
    pub async fn since(
        &self,
        company_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Order>, SupabaseError> {
        let query = Query::for_company(company_id)
            .gte("created_at", since.to_rfc3339())
            .order("created_at", true);
        self.client.get("orders_view", &query).await
    }

    pub async fn get(&self, company_id: Uuid, order_id: Uuid) -> Result<Option<Order>, SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("id", order_id)
            .select("*,order_line_items(*)");
        self.client.get_one("orders", &query).await
    }

    /// Line items sold since `since`, oldest first. Paged in blocks of 1000
    /// rows up to 20000 rows.
    pub async fn line_items_since(
        &self,
        company_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<OrderLineItem>, SupabaseError> {
        let mut items = Vec::new();
        for page in 0..MAX_LINE_ITEM_PAGES {
            let query = Query::for_company(company_id)
                .gte("created_at", since.to_rfc3339())
                .order("created_at", false)
                .order("id", false)
                .limit(LINE_ITEM_PAGE)
                .offset(u64::from(page) * u64::from(LINE_ITEM_PAGE));
            let batch: Vec<OrderLineItem> = self.client.get("order_line_items", &query).await?;
            let done = batch.len() < LINE_ITEM_PAGE as usize;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }
}
