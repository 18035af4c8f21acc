//! Products and their variants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::query::{Pagination, Query};
use super::supabase::{SupabaseClient, SupabaseError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Product {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, rename(deserialize = "product_variants"))]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub cost: Option<i64>,
    #[serde(default)]
    pub inventory_quantity: i64,
    #[serde(default)]
    pub reorder_point: Option<i64>,
    #[serde(default)]
    pub reorder_quantity: Option<i64>,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub company_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub product_type: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewVariant {
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub title: Option<String>,
    pub price: Option<i64>,
    pub cost: Option<i64>,
    pub inventory_quantity: i64,
    pub reorder_point: Option<i64>,
    pub reorder_quantity: Option<i64>,
    pub supplier_id: Option<Uuid>,
}

/// Partial product update; absent fields are left alone
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SoftDelete {
    deleted_at: DateTime<Utc>,
}

const PRODUCT_WITH_VARIANTS: &str = "*,product_variants(*)";

/// Product store operations
#[derive(Clone)]
pub struct ProductStore {
    client: SupabaseClient,
}

impl ProductStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<(Vec<Product>, u64), SupabaseError> {
        let mut query = Query::for_company(company_id)
            .is_null("deleted_at")
            .select(PRODUCT_WITH_VARIANTS);
        if let Some(term) = search {
            query = query.search(&["title", "product_type"], term);
        }
        let query = query.order("created_at", true).paginate(page);
        self.client.get_page("products", &query).await
    }

    pub async fn get(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("id", product_id)
            .is_null("deleted_at")
            .select(PRODUCT_WITH_VARIANTS);
        let product: Option<Product> = self.client.get_one("products", &query).await?;
        Ok(product.map(|mut p| {
            p.variants.retain(|v| v.deleted_at.is_none());
            p
        }))
    }

    /// Insert a product and its variants. If the variants are rejected (for
    /// example a duplicate SKU) the product row is removed again.
    pub async fn create(
        &self,
        product: &NewProduct,
        variants: Vec<NewVariant>,
    ) -> Result<Product, SupabaseError> {
        let created: Product = self.client.insert("products", product).await?;

        let variants: Vec<NewVariant> = variants
            .into_iter()
            .map(|v| NewVariant {
                product_id: created.id,
                ..v
            })
            .collect();

        if let Err(e) = self.client.insert_many("product_variants", &variants).await {
            let cleanup = Query::for_company(product.company_id).eq("id", created.id);
            if let Err(cleanup_err) = self.client.delete("products", &cleanup).await {
                warn!(product_id = %created.id, error = %cleanup_err, "Failed to remove orphaned product");
            }
            return Err(e);
        }

        self.get(product.company_id, created.id)
            .await?
            .ok_or(SupabaseError::NoRowReturned)
    }

    pub async fn update(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        update: &ProductUpdate,
    ) -> Result<bool, SupabaseError> {
        let query = Query::for_company(company_id)
            .eq("id", product_id)
            .is_null("deleted_at");
        let updated: Vec<serde_json::Value> = self.client.update("products", &query, update).await?;
        Ok(!updated.is_empty())
    }

    /// Soft delete a product and all of its variants
    pub async fn soft_delete(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, SupabaseError> {
        let stamp = SoftDelete {
            deleted_at: Utc::now(),
        };

        let query = Query::for_company(company_id)
            .eq("id", product_id)
            .is_null("deleted_at");
        let deleted: Vec<serde_json::Value> = self.client.update("products", &query, &stamp).await?;
        if deleted.is_empty() {
            return Ok(false);
        }

        let variants = Query::for_company(company_id)
            .eq("product_id", product_id)
            .is_null("deleted_at");
        let _: Vec<serde_json::Value> = self
            .client
            .update("product_variants", &variants, &stamp)
            .await?;
        Ok(true)
    }

    /// Create or update products and variants (keyed by SKU) in one database
    /// transaction, used by CSV import
    pub async fn import_batch<T: Serialize>(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        records: &[T],
    ) -> Result<(), SupabaseError> {
        #[derive(Serialize)]
        struct ImportArgs<'a, T> {
            p_company_id: Uuid,
            p_user_id: Uuid,
            p_records: &'a [T],
        }

        self.client
            .rpc_void(
                "batch_import_products",
                &ImportArgs {
                    p_company_id: company_id,
                    p_user_id: user_id,
                    p_records: records,
                },
            )
            .await
    }
}
