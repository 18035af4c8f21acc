//! Customer listing and removal

use axum::{
    extract::{Extension, State},
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;

use super::{ListParams, ListResponse};
use crate::app::AppState;
use crate::http::error::AppError;
use crate::http::extract::{Json, Path, Query};
use crate::http::middleware::AuthenticatedUser;
use crate::store::customers::Customer;

pub async fn list_customers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<Customer>>, AppError> {
    let page = params.pagination();
    let result = state
        .customers
        .list(auth.company_id, params.search(), page)
        .await?;
    Ok(Json(ListResponse::new(result, page)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    state
        .customers
        .get(auth.company_id, customer_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Customer"))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(customer_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_manager()?;

    if !state
        .customers
        .soft_delete(auth.company_id, customer_id)
        .await?
    {
        return Err(AppError::not_found("Customer"));
    }

    info!(company_id = %auth.company_id, customer_id = %customer_id, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}
