//! Sales orders

use axum::extract::{Extension, State};
use serde::Deserialize;
use uuid::Uuid;

use super::{non_blank, ListResponse};
use crate::app::AppState;
use crate::http::error::AppError;
use crate::http::extract::{Json, Path, Query};
use crate::http::middleware::AuthenticatedUser;
use crate::store::orders::{Order, OrderFilter};
use crate::store::query::Pagination;

#[derive(Debug, Deserialize)]
pub struct OrderParams {
    query: Option<String>,
    /// Financial status, e.g. `paid` or `refunded`
    status: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<OrderParams>,
) -> Result<Json<ListResponse<Order>>, AppError> {
    let filter = OrderFilter {
        search: non_blank(params.query.as_deref()).map(str::to_string),
        financial_status: non_blank(params.status.as_deref())
            .filter(|s| *s != "all")
            .map(str::to_ascii_lowercase),
    };
    let page = Pagination::new(params.page, params.limit);

    let result = state.orders.list(auth.company_id, &filter, page).await?;
    Ok(Json(ListResponse::new(result, page)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    state
        .orders
        .get(auth.company_id, order_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Order"))
}
