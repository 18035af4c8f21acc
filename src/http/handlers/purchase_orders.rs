//! Purchase orders: creation, status lifecycle, receiving, and drafting
//! orders from reorder suggestions

use std::collections::{BTreeMap, HashSet};

use axum::{
    extract::{Extension, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{ListParams, ListResponse};
use crate::app::AppState;
use crate::http::error::AppError;
use crate::http::extract::{Json, Path, Query};
use crate::http::middleware::AuthenticatedUser;
use crate::store::analytics::ReorderSuggestion;
use crate::store::purchase_orders::{
    NewLineItem, NewPurchaseOrder, PurchaseOrder, PurchaseOrderStatus, ReceivedItem,
};

const SUGGESTION_NOTE: &str = "Created from reorder suggestions";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    variant_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    quantity: i64,
    #[validate(range(min = 0, message = "cost cannot be negative"))]
    cost: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderRequest {
    supplier_id: Option<Uuid>,
    status: Option<String>,
    #[validate(length(max = 2000, message = "notes cannot exceed 2000 characters"))]
    notes: Option<String>,
    expected_arrival_date: Option<NaiveDate>,
    #[validate]
    line_items: Vec<LineItemInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    id: Uuid,
}

fn check_line_items(items: &[LineItemInput]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::Validation(
            "A purchase order needs at least one line item".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    if let Some(dupe) = items.iter().find(|i| !seen.insert(i.variant_id)) {
        return Err(AppError::Validation(format!(
            "Variant {} appears more than once",
            dupe.variant_id
        )));
    }
    Ok(())
}

/// New orders start as Draft or Ordered
fn initial_status(raw: Option<&str>) -> Result<PurchaseOrderStatus, AppError> {
    let status = match raw {
        None => PurchaseOrderStatus::Draft,
        Some(raw) => raw.parse().map_err(AppError::BadRequest)?,
    };
    match status {
        PurchaseOrderStatus::Draft | PurchaseOrderStatus::Ordered => Ok(status),
        other => Err(AppError::BadRequest(format!(
            "A new purchase order cannot start as {}",
            other
        ))),
    }
}

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<PurchaseOrder>>, AppError> {
    let page = params.pagination();
    let result = state
        .purchase_orders
        .list(auth.company_id, params.search(), page)
        .await?;
    Ok(Json(ListResponse::new(result, page)))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(po_id): Path<Uuid>,
) -> Result<Json<PurchaseOrder>, AppError> {
    find(&state, auth.company_id, po_id).await.map(Json)
}

async fn find(state: &AppState, company_id: Uuid, po_id: Uuid) -> Result<PurchaseOrder, AppError> {
    state
        .purchase_orders
        .get(company_id, po_id)
        .await?
        .ok_or_else(|| AppError::not_found("Purchase order"))
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<CreatePurchaseOrderRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    req.validate()?;
    check_line_items(&req.line_items)?;
    let status = initial_status(req.status.as_deref())?;

    let order = NewPurchaseOrder {
        supplier_id: req.supplier_id,
        status,
        notes: req.notes,
        expected_arrival_date: req.expected_arrival_date,
        line_items: req
            .line_items
            .into_iter()
            .map(|i| NewLineItem {
                variant_id: i.variant_id,
                quantity: i.quantity,
                cost: i.cost,
            })
            .collect(),
    };

    let id = state
        .purchase_orders
        .create(auth.company_id, auth.user_id, &order)
        .await?;

    info!(
        company_id = %auth.company_id,
        po_id = %id,
        lines = order.line_items.len(),
        "Purchase order created"
    );
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    id: Uuid,
    status: PurchaseOrderStatus,
}

pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(po_id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let next: PurchaseOrderStatus = req.status.parse().map_err(AppError::BadRequest)?;
    let current = find(&state, auth.company_id, po_id).await?.status;

    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot change a purchase order from {} to {}",
            current, next
        )));
    }

    if current != next {
        if !state
            .purchase_orders
            .set_status(auth.company_id, po_id, current, next)
            .await?
        {
            return Err(AppError::Conflict(
                "The purchase order was changed by another request, reload and try again".to_string(),
            ));
        }
        info!(company_id = %auth.company_id, po_id = %po_id, from = %current, to = %next, "Purchase order status changed");
    }

    Ok(Json(StatusResponse {
        id: po_id,
        status: next,
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveItemInput {
    variant_id: Uuid,
    #[validate(range(min = 1, message = "quantityReceived must be at least 1"))]
    quantity_received: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReceiveRequest {
    #[validate]
    items: Vec<ReceiveItemInput>,
}

pub async fn receive_purchase_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(po_id): Path<Uuid>,
    Json(req): Json<ReceiveRequest>,
) -> Result<Json<PurchaseOrder>, AppError> {
    req.validate()?;
    if req.items.is_empty() {
        return Err(AppError::Validation("No items to receive".to_string()));
    }

    let order = find(&state, auth.company_id, po_id).await?;
    if !matches!(
        order.status,
        PurchaseOrderStatus::Ordered | PurchaseOrderStatus::PartiallyReceived
    ) {
        return Err(AppError::BadRequest(format!(
            "Cannot receive items on a {} purchase order",
            order.status
        )));
    }

    let items: Vec<ReceivedItem> = req
        .items
        .iter()
        .map(|i| ReceivedItem {
            variant_id: i.variant_id,
            quantity_received: i.quantity_received,
        })
        .collect();
    state
        .purchase_orders
        .receive_items(auth.company_id, auth.user_id, po_id, &items)
        .await?;

    info!(company_id = %auth.company_id, po_id = %po_id, lines = items.len(), "Purchase order items received");
    find(&state, auth.company_id, po_id).await.map(Json)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromSuggestionsRequest {
    /// Restrict to these variants; all suggestions when absent
    #[serde(default)]
    variant_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FromSuggestionsResponse {
    created_purchase_order_ids: Vec<Uuid>,
    count: usize,
}

/// One draft order per supplier. Suggestions without a supplier share a
/// single unassigned order.
pub fn group_suggestions(
    suggestions: &[ReorderSuggestion],
    only: Option<&HashSet<Uuid>>,
) -> Vec<NewPurchaseOrder> {
    let mut by_supplier: BTreeMap<Option<Uuid>, Vec<NewLineItem>> = BTreeMap::new();

    for suggestion in suggestions {
        if suggestion.suggested_reorder_quantity <= 0 {
            continue;
        }
        if only.is_some_and(|ids| !ids.contains(&suggestion.variant_id)) {
            continue;
        }
        let lines = by_supplier.entry(suggestion.supplier_id).or_default();
        if lines.iter().any(|l| l.variant_id == suggestion.variant_id) {
            continue;
        }
        lines.push(NewLineItem {
            variant_id: suggestion.variant_id,
            quantity: suggestion.suggested_reorder_quantity,
            cost: suggestion.unit_cost.unwrap_or(0).max(0),
        });
    }

    by_supplier
        .into_iter()
        .map(|(supplier_id, line_items)| NewPurchaseOrder {
            supplier_id,
            status: PurchaseOrderStatus::Draft,
            notes: Some(SUGGESTION_NOTE.to_string()),
            expected_arrival_date: None,
            line_items,
        })
        .collect()
}

pub async fn create_from_suggestions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    body: Option<Json<FromSuggestionsRequest>>,
) -> Result<(StatusCode, Json<FromSuggestionsResponse>), AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let only: Option<HashSet<Uuid>> = req.variant_ids.map(|ids| ids.into_iter().collect());

    let suggestions = state.analytics.reorder_suggestions(auth.company_id).await?;
    let orders = group_suggestions(&suggestions, only.as_ref());
    if orders.is_empty() {
        return Err(AppError::BadRequest(
            "There are no reorder suggestions to order".to_string(),
        ));
    }

    let ids = try_join_all(
        orders
            .iter()
            .map(|order| state.purchase_orders.create(auth.company_id, auth.user_id, order)),
    )
    .await?;

    info!(company_id = %auth.company_id, count = ids.len(), "Purchase orders created from suggestions");
    Ok((
        StatusCode::CREATED,
        Json(FromSuggestionsResponse {
            count: ids.len(),
            created_purchase_order_ids: ids,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(supplier: Option<Uuid>, quantity: i64) -> ReorderSuggestion {
        ReorderSuggestion {
            variant_id: Uuid::new_v4(),
            product_id: None,
            sku: "SKU".to_string(),
            product_name: None,
            supplier_id: supplier,
            supplier_name: None,
            current_stock: 1,
            reorder_point: Some(5),
            suggested_reorder_quantity: quantity,
            unit_cost: Some(250),
        }
    }

    #[test]
    fn suggestions_group_by_supplier() {
        let acme = Uuid::new_v4();
        let suggestions = vec![
            suggestion(Some(acme), 10),
            suggestion(None, 4),
            suggestion(Some(acme), 6),
            suggestion(None, 2),
            suggestion(Some(Uuid::new_v4()), 0),
        ];

        let orders = group_suggestions(&suggestions, None);
        assert_eq!(orders.len(), 2);
        let unassigned = orders.iter().find(|o| o.supplier_id.is_none()).unwrap();
        assert_eq!(unassigned.line_items.len(), 2);
        let acme_order = orders.iter().find(|o| o.supplier_id == Some(acme)).unwrap();
        assert_eq!(acme_order.line_items.len(), 2);
        assert!(orders.iter().all(|o| o.status == PurchaseOrderStatus::Draft));
    }

    #[test]
    fn suggestions_can_be_filtered_by_variant() {
        let suggestions = vec![suggestion(None, 3), suggestion(None, 5)];
        let only: HashSet<Uuid> = [suggestions[1].variant_id].into_iter().collect();

        let orders = group_suggestions(&suggestions, Some(&only));
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].line_items[0].quantity, 5);
    }

    #[test]
    fn line_items_are_checked() {
        assert!(check_line_items(&[]).is_err());
        let variant = Uuid::new_v4();
        let dupes = vec![
            LineItemInput { variant_id: variant, quantity: 1, cost: 0 },
            LineItemInput { variant_id: variant, quantity: 2, cost: 0 },
        ];
        assert!(check_line_items(&dupes).is_err());
    }

    #[test]
    fn new_orders_start_as_draft_or_ordered() {
        assert_eq!(initial_status(None).unwrap(), PurchaseOrderStatus::Draft);
        assert_eq!(initial_status(Some("ordered")).unwrap(), PurchaseOrderStatus::Ordered);
        assert!(initial_status(Some("Received")).is_err());
        assert!(initial_status(Some("shipped")).is_err());
    }
}
