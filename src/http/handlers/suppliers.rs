//! Supplier CRUD

use axum::{
    extract::{Extension, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{ListParams, ListResponse};
use crate::app::AppState;
use crate::http::error::AppError;
use crate::http::extract::{Json, Path, Query};
use crate::http::middleware::AuthenticatedUser;
use crate::store::suppliers::{NewSupplier, Supplier, SupplierUpdate};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1 to 255 characters"))]
    name: String,
    #[validate(email(message = "email is not valid"))]
    email: Option<String>,
    #[validate(length(max = 50, message = "phone cannot exceed 50 characters"))]
    phone: Option<String>,
    #[validate(range(min = 0, max = 365, message = "defaultLeadTimeDays must be between 0 and 365"))]
    default_lead_time_days: Option<i32>,
    #[validate(length(max = 2000, message = "notes cannot exceed 2000 characters"))]
    notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1 to 255 characters"))]
    name: Option<String>,
    #[validate(email(message = "email is not valid"))]
    email: Option<String>,
    #[validate(length(max = 50, message = "phone cannot exceed 50 characters"))]
    phone: Option<String>,
    #[validate(range(min = 0, max = 365, message = "defaultLeadTimeDays must be between 0 and 365"))]
    default_lead_time_days: Option<i32>,
    #[validate(length(max = 2000, message = "notes cannot exceed 2000 characters"))]
    notes: Option<String>,
}

pub async fn list_suppliers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<Supplier>>, AppError> {
    let page = params.pagination();
    let result = state
        .suppliers
        .list(auth.company_id, params.search(), page)
        .await?;
    Ok(Json(ListResponse::new(result, page)))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(supplier_id): Path<Uuid>,
) -> Result<Json<Supplier>, AppError> {
    state
        .suppliers
        .get(auth.company_id, supplier_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Supplier"))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<CreateSupplierRequest>,
) -> Result<(StatusCode, Json<Supplier>), AppError> {
    req.validate()?;

    let supplier = state
        .suppliers
        .create(&NewSupplier {
            company_id: auth.company_id,
            name: req.name.trim().to_string(),
            email: req.email,
            phone: req.phone,
            default_lead_time_days: req.default_lead_time_days,
            notes: req.notes,
        })
        .await?;

    info!(company_id = %auth.company_id, supplier_id = %supplier.id, "Supplier created");
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(supplier_id): Path<Uuid>,
    Json(req): Json<UpdateSupplierRequest>,
) -> Result<Json<Supplier>, AppError> {
    req.validate()?;

    let update = SupplierUpdate {
        name: req.name.map(|n| n.trim().to_string()),
        email: req.email,
        phone: req.phone,
        default_lead_time_days: req.default_lead_time_days,
        notes: req.notes,
        updated_at: Utc::now(),
    };

    state
        .suppliers
        .update(auth.company_id, supplier_id, &update)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Supplier"))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(supplier_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_manager()?;

    if !state.suppliers.delete(auth.company_id, supplier_id).await? {
        return Err(AppError::not_found("Supplier"));
    }

    info!(company_id = %auth.company_id, supplier_id = %supplier_id, "Supplier deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_rules() {
        let ok: CreateSupplierRequest = serde_json::from_value(serde_json::json!({
            "name": "Acme",
            "email": "orders@acme.test",
            "defaultLeadTimeDays": 14
        }))
        .unwrap();
        assert!(ok.validate().is_ok());

        let bad: CreateSupplierRequest = serde_json::from_value(serde_json::json!({
            "name": "",
            "email": "nope",
            "defaultLeadTimeDays": 400
        }))
        .unwrap();
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("default_lead_time_days"));
    }
}
