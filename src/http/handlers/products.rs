//! Product catalogue CRUD

use std::collections::HashSet;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{ListParams, ListResponse};
use crate::app::AppState;
use crate::http::error::AppError;
use crate::http::extract::{Json, Path, Query};
use crate::http::middleware::AuthenticatedUser;
use crate::store::products::{NewProduct, NewVariant, Product, ProductUpdate};

const PRODUCT_STATUSES: [&str; 3] = ["active", "draft", "archived"];

fn product_status(status: &str) -> Result<(), ValidationError> {
    if PRODUCT_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(ValidationError::new("status must be active, draft or archived"))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VariantInput {
    #[validate(length(min = 1, max = 100, message = "sku must be 1 to 100 characters"))]
    sku: String,
    title: Option<String>,
    #[validate(range(min = 0, message = "price cannot be negative"))]
    price: Option<i64>,
    #[validate(range(min = 0, message = "cost cannot be negative"))]
    cost: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 0, message = "inventoryQuantity cannot be negative"))]
    inventory_quantity: i64,
    #[validate(range(min = 0, message = "reorderPoint cannot be negative"))]
    reorder_point: Option<i64>,
    #[validate(range(min = 0, message = "reorderQuantity cannot be negative"))]
    reorder_quantity: Option<i64>,
    supplier_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "title must be 1 to 255 characters"))]
    title: String,
    description: Option<String>,
    product_type: Option<String>,
    tags: Option<Vec<String>>,
    #[validate(custom = "product_status")]
    status: Option<String>,
    image_url: Option<String>,
    #[validate]
    variants: Vec<VariantInput>,
}

impl CreateProductRequest {
    /// At least one variant, SKUs unique within the request
    fn check_variants(&self) -> Result<(), AppError> {
        if self.variants.is_empty() {
            return Err(AppError::Validation(
                "A product needs at least one variant".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for variant in &self.variants {
            if !seen.insert(variant.sku.trim().to_ascii_lowercase()) {
                return Err(AppError::Validation(format!(
                    "SKU '{}' appears more than once",
                    variant.sku
                )));
            }
        }
        Ok(())
    }
}

pub async fn list_products(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<Product>>, AppError> {
    let page = params.pagination();
    let result = state
        .products
        .list(auth.company_id, params.search(), page)
        .await?;
    Ok(Json(ListResponse::new(result, page)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    state
        .products
        .get(auth.company_id, product_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Product"))
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    req.validate()?;
    req.check_variants()?;

    let product = NewProduct {
        company_id: auth.company_id,
        title: req.title.trim().to_string(),
        description: req.description,
        product_type: req.product_type,
        tags: req.tags,
        status: req.status.unwrap_or_else(|| "active".to_string()),
        image_url: req.image_url,
    };
    let variants = req
        .variants
        .into_iter()
        .map(|v| NewVariant {
            company_id: auth.company_id,
            product_id: Uuid::nil(),
            sku: v.sku.trim().to_string(),
            title: v.title,
            price: v.price,
            cost: v.cost,
            inventory_quantity: v.inventory_quantity,
            reorder_point: v.reorder_point,
            reorder_quantity: v.reorder_quantity,
            supplier_id: v.supplier_id,
        })
        .collect();

    let created = state.products.create(&product, variants).await?;
    info!(company_id = %auth.company_id, product_id = %created.id, "Product created");

    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "title must be 1 to 255 characters"))]
    title: Option<String>,
    description: Option<String>,
    product_type: Option<String>,
    tags: Option<Vec<String>>,
    #[validate(custom = "product_status")]
    status: Option<String>,
    image_url: Option<String>,
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    req.validate()?;

    let update = ProductUpdate {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        product_type: req.product_type,
        tags: req.tags,
        status: req.status,
        image_url: req.image_url,
        updated_at: Utc::now(),
    };

    if !state
        .products
        .update(auth.company_id, product_id, &update)
        .await?
    {
        return Err(AppError::not_found("Product"));
    }

    state
        .products
        .get(auth.company_id, product_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Product"))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_manager()?;

    if !state
        .products
        .soft_delete(auth.company_id, product_id)
        .await?
    {
        return Err(AppError::not_found("Product"));
    }

    info!(company_id = %auth.company_id, product_id = %product_id, user_id = %auth.user_id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
