//! Purchase orders, their status lifecycle and receiving

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::query::{Pagination, Query};
use super::supabase::{SupabaseClient, SupabaseError};

/// Purchase order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderStatus {
    Draft,
    Ordered,
    #[serde(rename = "Partially Received")]
    PartiallyReceived,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "Draft",
            PurchaseOrderStatus::Ordered => "Ordered",
            PurchaseOrderStatus::PartiallyReceived => "Partially Received",
            PurchaseOrderStatus::Received => "Received",
            PurchaseOrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Whether `self -> next` is an allowed move. Staying put is always allowed.
    pub fn can_transition_to(self, next: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;

        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Draft, Ordered)
                | (Draft, Cancelled)
                | (Ordered, PartiallyReceived)
                | (Ordered, Received)
                | (Ordered, Cancelled)
                | (PartiallyReceived, Received)
        )
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "draft" => Ok(PurchaseOrderStatus::Draft),
            "ordered" => Ok(PurchaseOrderStatus::Ordered),
            "partiallyreceived" => Ok(PurchaseOrderStatus::PartiallyReceived),
            "received" => Ok(PurchaseOrderStatus::Received),
            "cancelled" | "canceled" => Ok(PurchaseOrderStatus::Cancelled),
            _ => Err(format!("Unknown purchase order status: {}", s)),
        }
    }
}

/// Row of `purchase_orders_view`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub po_number: String,
    pub status: PurchaseOrderStatus,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    /// Cents
    #[serde(default)]
    pub total_cost: i64,
    #[serde(default)]
    pub expected_arrival_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<PurchaseOrderLineItem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct PurchaseOrderLineItem {
    pub id: Uuid,
    pub variant_id: Uuid,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub quantity_received: i64,
    /// Unit cost in cents
    pub cost: i64,
}

/// One line of a new purchase order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLineItem {
    pub variant_id: Uuid,
    pub quantity: i64,
    pub cost: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPurchaseOrder {
    pub supplier_id: Option<Uuid>,
    pub status: PurchaseOrderStatus,
    pub notes: Option<String>,
    pub expected_arrival_date: Option<NaiveDate>,
    pub line_items: Vec<NewLineItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceivedItem {
    pub variant_id: Uuid,
    pub quantity_received: i64,
}

#[derive(Serialize)]
struct CreateArgs<'a> {
    p_company_id: Uuid,
    p_user_id: Uuid,
    p_supplier_id: Option<Uuid>,
    p_status: &'static str,
    p_notes: Option<&'a str>,
    p_expected_arrival: Option<NaiveDate>,
    p_line_items: &'a [NewLineItem],
}

#[derive(Serialize)]
struct ReceiveArgs<'a> {
    p_company_id: Uuid,
    p_user_id: Uuid,
    p_po_id: Uuid,
    p_items_to_receive: &'a [ReceivedItem],
}

#[derive(Serialize)]
struct StatusUpdate {
    status: PurchaseOrderStatus,
    updated_at: DateTime<Utc>,
}

/// Purchase order store operations
#[derive(Clone)]
pub struct PurchaseOrderStore {
    client: SupabaseClient,
}

impl PurchaseOrderStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<(Vec<PurchaseOrder>, u64), SupabaseError> {
        let mut query = Query::for_company(company_id);
        if let Some(term) = search {
            query = query.search(&["po_number", "supplier_name"], term);
        }
        let query = query.order("created_at", true).paginate(page);
        self.client.get_page("purchase_orders_view", &query).await
    }

    pub async fn get(
        &self,
        company_id: Uuid,
        po_id: Uuid,
    ) -> Result<Option<PurchaseOrder>, SupabaseError> {
        let query = Query::for_company(company_id).eq("id", po_id);
        self.client.get_one("purchase_orders_view", &query).await
    }

    /// Create the order and its line items in one transaction; returns the new id
    pub async fn create(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        order: &NewPurchaseOrder,
    ) -> Result<Uuid, SupabaseError> {
        let args = CreateArgs {
            p_company_id: company_id,
            p_user_id: user_id,
            p_supplier_id: order.supplier_id,
            p_status: order.status.as_str(),
            p_notes: order.notes.as_deref(),
            p_expected_arrival: order.expected_arrival_date,
            p_line_items: &order.line_items,
        };
        self.client.rpc("create_full_purchase_order", &args).await
    }

    /// Move the order from `from` to `status`. Returns false when no row was
    /// still in `from`, either because it is gone or another request changed it.
    pub async fn set_status(
        &self,
        company_id: Uuid,
        po_id: Uuid,
        from: PurchaseOrderStatus,
        status: PurchaseOrderStatus,
    ) -> Result<bool, SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("id", po_id)
            .eq("status", from);
        let rows: Vec<serde_json::Value> = self
            .client
            .update(
                "purchase_orders",
                &query,
                &StatusUpdate {
                    status,
                    updated_at: Utc::now(),
                },
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// Book received quantities into stock; the database updates the order
    /// status and writes ledger entries
    pub async fn receive_items(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        po_id: Uuid,
        items: &[ReceivedItem],
    ) -> Result<(), SupabaseError> {
        let args = ReceiveArgs {
            p_company_id: company_id,
            p_user_id: user_id,
            p_po_id: po_id,
            p_items_to_receive: items,
        };
        self.client
            .rpc_void("receive_purchase_order_items", &args)
            .await
    }
}
