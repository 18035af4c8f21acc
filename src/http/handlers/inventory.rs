//! Stock levels and manual adjustments

use axum::extract::{Extension, State};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{non_blank, ListResponse};
use crate::app::AppState;
use crate::http::error::AppError;
use crate::http::extract::{Json, Path, Query};
use crate::http::middleware::AuthenticatedUser;
use crate::store::inventory::{
    InventoryAdjustment, InventoryFilter, InventoryItem, LedgerEntry, StockStatus,
};
use crate::store::query::{PageParams, Pagination};

#[derive(Debug, Deserialize)]
pub struct InventoryParams {
    query: Option<String>,
    status: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

fn parse_status(raw: Option<&str>) -> Result<Option<StockStatus>, AppError> {
    match non_blank(raw) {
        None | Some("all") => Ok(None),
        Some("in_stock") => Ok(Some(StockStatus::InStock)),
        Some("low_stock") => Ok(Some(StockStatus::LowStock)),
        Some("out_of_stock") => Ok(Some(StockStatus::OutOfStock)),
        Some(other) => Err(AppError::BadRequest(format!(
            "Unknown stock status '{}'",
            other
        ))),
    }
}

pub async fn list_inventory(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<InventoryParams>,
) -> Result<Json<ListResponse<InventoryItem>>, AppError> {
    let filter = InventoryFilter {
        search: non_blank(params.query.as_deref()).map(str::to_string),
        status: parse_status(params.status.as_deref())?,
    };
    let page = Pagination::new(params.page, params.limit);

    let result = state.inventory.list(auth.company_id, &filter, page).await?;
    Ok(Json(ListResponse::new(result, page)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    variant_id: Uuid,
    #[validate(range(min = 0, message = "newQuantity cannot be negative"))]
    new_quantity: i64,
    #[validate(length(min = 1, max = 500, message = "reason must be 1 to 500 characters"))]
    reason: String,
}

pub async fn adjust_inventory(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<InventoryAdjustment>, AppError> {
    req.validate()?;

    let adjustment = state
        .inventory
        .adjust_quantity(
            auth.company_id,
            auth.user_id,
            req.variant_id,
            req.new_quantity,
            req.reason.trim(),
        )
        .await?;

    info!(
        company_id = %auth.company_id,
        variant_id = %req.variant_id,
        from = adjustment.previous_quantity,
        to = adjustment.new_quantity,
        "Inventory adjusted"
    );

    Ok(Json(adjustment))
}

pub async fn inventory_ledger(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(variant_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListResponse<LedgerEntry>>, AppError> {
    let page = Pagination::from(params);
    let result = state
        .inventory
        .ledger(auth.company_id, variant_id, page)
        .await?;
    Ok(Json(ListResponse::new(result, page)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_values() {
        assert_eq!(parse_status(None).unwrap(), None);
        assert_eq!(parse_status(Some("all")).unwrap(), None);
        assert_eq!(parse_status(Some("low_stock")).unwrap(), Some(StockStatus::LowStock));
        assert!(parse_status(Some("sold_out")).is_err());
    }

    #[test]
    fn negative_adjustments_fail_validation() {
        let req = AdjustRequest {
            variant_id: Uuid::new_v4(),
            new_quantity: -1,
            reason: "Cycle count".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
