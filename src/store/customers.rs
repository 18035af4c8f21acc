//! Customer records and per-customer order statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::query::{Pagination, Query};
use super::supabase::{SupabaseClient, SupabaseError};

/// Row of `customers_view`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Customer {
    pub id: Uuid,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub total_orders: i64,
    /// Cents
    #[serde(default)]
    pub total_spent: i64,
    #[serde(default)]
    pub first_order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_order_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SoftDelete {
    deleted_at: DateTime<Utc>,
}

/// Customer store operations
#[derive(Clone)]
pub struct CustomerStore {
    client: SupabaseClient,
}

impl CustomerStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<(Vec<Customer>, u64), SupabaseError> {
        let mut query = Query::for_company(company_id).is_null("deleted_at");
        if let Some(term) = search {
            query = query.search(&["customer_name", "email"], term);
        }
        let query = query.order("total_spent", true).paginate(page);
        self.client.get_page("customers_view", &query).await
    }

    /// Customers that have ordered at least once, for segmentation
    pub async fn with_orders(&self, company_id: Uuid) -> Result<Vec<Customer>, SupabaseError> {
        let query = Query::for_company(company_id)
            .is_null("deleted_at")
            .gt("total_orders", 0);
        self.client.get("customers_view", &query).await
    }

    pub async fn get(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<Customer>, SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("id", customer_id)
            .is_null("deleted_at");
        self.client.get_one("customers_view", &query).await
    }

    pub async fn soft_delete(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<bool, SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("id", customer_id)
            .is_null("deleted_at");
        let rows: Vec<serde_json::Value> = self
            .client
            .update(
                "customers",
                &query,
                &SoftDelete {
                    deleted_at: Utc::now(),
                },
            )
            .await?;
        Ok(!rows.is_empty())
    }
}
