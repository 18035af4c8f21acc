//! Supplier records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::query::{Pagination, Query};
use super::supabase::{SupabaseClient, SupabaseError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Supplier {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub default_lead_time_days: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSupplier {
    pub company_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub default_lead_time_days: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SupplierUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_lead_time_days: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Supplier store operations
#[derive(Clone)]
pub struct SupplierStore {
    client: SupabaseClient,
}

impl SupplierStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<(Vec<Supplier>, u64), SupabaseError> {
        let mut query = Query::for_company(company_id);
        if let Some(term) = search {
            query = query.search(&["name", "email"], term);
        }
        let query = query.order("name", false).paginate(page);
        self.client.get_page("suppliers", &query).await
    }

    pub async fn all(&self, company_id: Uuid) -> Result<Vec<Supplier>, SupabaseError> {
        let query = Query::for_company(company_id).order("name", false);
        self.client.get("suppliers", &query).await
    }

    pub async fn get(
        &self,
        company_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Option<Supplier>, SupabaseError> {
        let query = Query::for_company(company_id).eq("id", supplier_id);
        self.client.get_one("suppliers", &query).await
    }

    pub async fn create(&self, supplier: &NewSupplier) -> Result<Supplier, SupabaseError> {
        self.client.insert("suppliers", supplier).await
    }

    pub async fn update(
        &self,
        company_id: Uuid,
        supplier_id: Uuid,
        update: &SupplierUpdate,
    ) -> Result<Option<Supplier>, SupabaseError> {
        let query = Query::for_company(company_id).eq("id", supplier_id);
        let mut rows: Vec<Supplier> = self.client.update("suppliers", &query, update).await?;
        Ok(rows.pop())
    }

    pub async fn delete(&self, company_id: Uuid, supplier_id: Uuid) -> Result<bool, SupabaseError> {
        let query = Query::for_company(company_id).eq("id", supplier_id);
        Ok(self.client.delete("suppliers", &query).await? > 0)
    }

    /// Insert or update suppliers keyed by name, used by CSV import
    pub async fn upsert_many(&self, rows: &[NewSupplier]) -> Result<(), SupabaseError> {
        self.client.upsert("suppliers", rows, "company_id,name").await
    }
}
