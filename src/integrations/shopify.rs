//! Shopify order webhooks with HMAC verification

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::store::supabase::SupabaseError;
use crate::util::money::parse_cents;

type HmacSha256 = Hmac<Sha256>;

pub const PLATFORM: &str = "shopify";

const HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";
const SHOP_HEADER: &str = "X-Shopify-Shop-Domain";
const TOPIC_HEADER: &str = "X-Shopify-Topic";
const WEBHOOK_ID_HEADER: &str = "X-Shopify-Webhook-Id";

/// Handle Shopify webhook deliveries
pub async fn shopify_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookError> {
    let secret = state
        .config
        .shopify_webhook_secret
        .as_deref()
        .ok_or(WebhookError::NotConfigured)?;

    let signature = header(&headers, HMAC_HEADER).ok_or(WebhookError::MissingHeader(HMAC_HEADER))?;
    verify_signature(&body, signature, secret)?;

    let shop = header(&headers, SHOP_HEADER).ok_or(WebhookError::MissingHeader(SHOP_HEADER))?;
    let topic = header(&headers, TOPIC_HEADER).unwrap_or_default();

    let integration = state
        .integrations
        .find_by_shop(PLATFORM, shop)
        .await?
        .ok_or_else(|| WebhookError::UnknownShop(shop.to_string()))?;

    if !matches!(topic, "orders/create" | "orders/updated") {
        info!(shop = %shop, topic = %topic, "Ignoring Shopify webhook topic");
        return Ok((StatusCode::OK, Json(serde_json::json!({ "status": "ignored" }))));
    }

    let payload: ShopifyOrder = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, shop = %shop, "Failed to parse Shopify order");
        WebhookError::InvalidPayload
    })?;
    let order = normalize_order(payload)?;

    let webhook_id = header(&headers, WEBHOOK_ID_HEADER);
    if let Some(webhook_id) = webhook_id {
        if !state.integrations.record_webhook(integration.id, webhook_id).await? {
            info!(webhook_id = %webhook_id, shop = %shop, "Duplicate Shopify webhook");
            return Ok((StatusCode::OK, Json(serde_json::json!({ "status": "duplicate" }))));
        }
    }

    if let Err(e) = state
        .integrations
        .record_order(integration.company_id, PLATFORM, &order)
        .await
    {
        // Shopify retries failed deliveries with the same id
        if let Some(webhook_id) = webhook_id {
            if let Err(release) = state.integrations.release_webhook(integration.id, webhook_id).await {
                warn!(webhook_id = %webhook_id, error = %release, "Failed to release webhook id");
            }
        }
        return Err(e.into());
    }

    info!(
        company_id = %integration.company_id,
        order = %order.order_number,
        topic = %topic,
        line_items = order.line_items.len(),
        "Recorded Shopify order"
    );

    Ok((StatusCode::OK, Json(serde_json::json!({ "status": "processed" }))))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Check the base64 HMAC-SHA256 of the raw body in constant time
pub fn verify_signature(body: &[u8], signature_b64: &str, secret: &str) -> Result<(), WebhookError> {
    let signature = STANDARD
        .decode(signature_b64)
        .map_err(|_| WebhookError::InvalidSignature)?;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&signature).map_err(|_| {
        warn!("Shopify webhook signature mismatch");
        WebhookError::InvalidSignature
    })
}

fn cents(field: &'static str, value: Option<&str>) -> Result<i64, WebhookError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(0),
        Some(raw) => parse_cents(raw).ok_or(WebhookError::InvalidAmount(field)),
    }
}

// ============================================================================
// Shopify payload types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ShopifyOrder {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    order_number: Option<i64>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    financial_status: Option<String>,
    #[serde(default)]
    fulfillment_status: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    subtotal_price: Option<String>,
    #[serde(default)]
    total_tax: Option<String>,
    #[serde(default)]
    total_discounts: Option<String>,
    #[serde(default)]
    total_price: Option<String>,
    #[serde(default)]
    total_shipping_price_set: Option<PriceSet>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    customer: Option<ShopifyCustomer>,
    #[serde(default)]
    line_items: Vec<ShopifyLineItem>,
}

#[derive(Debug, Deserialize)]
struct PriceSet {
    shop_money: Money,
}

#[derive(Debug, Deserialize)]
struct Money {
    amount: String,
}

#[derive(Debug, Deserialize)]
struct ShopifyCustomer {
    id: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShopifyLineItem {
    id: i64,
    #[serde(default)]
    variant_id: Option<i64>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    variant_title: Option<String>,
    quantity: i64,
    price: String,
    #[serde(default)]
    total_discount: Option<String>,
}

// ============================================================================
// Normalized order passed to record_order_from_platform
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformOrder {
    pub external_order_id: String,
    pub order_number: String,
    pub customer: Option<PlatformCustomer>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub currency: String,
    pub subtotal: i64,
    pub total_tax: i64,
    pub total_shipping: i64,
    pub total_discounts: i64,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub line_items: Vec<PlatformLineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformCustomer {
    pub external_customer_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformLineItem {
    pub external_line_item_id: String,
    pub external_variant_id: Option<String>,
    pub sku: Option<String>,
    pub product_name: Option<String>,
    pub variant_title: Option<String>,
    pub quantity: i64,
    pub price: i64,
    pub total_discount: i64,
}

pub fn normalize_order(order: ShopifyOrder) -> Result<PlatformOrder, WebhookError> {
    let line_items = order
        .line_items
        .into_iter()
        .map(|item| {
            Ok(PlatformLineItem {
                external_line_item_id: item.id.to_string(),
                external_variant_id: item.variant_id.map(|v| v.to_string()),
                sku: item.sku.filter(|s| !s.is_empty()),
                product_name: item.title,
                variant_title: item.variant_title,
                quantity: item.quantity,
                price: cents("line_items.price", Some(&item.price))?,
                total_discount: cents("line_items.total_discount", item.total_discount.as_deref())?,
            })
        })
        .collect::<Result<Vec<_>, WebhookError>>()?;

    let customer = order.customer.map(|c| {
        let name = [c.first_name, c.last_name]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        PlatformCustomer {
            external_customer_id: c.id.to_string(),
            email: c.email.or_else(|| order.email.clone()),
            name: (!name.is_empty()).then_some(name),
        }
    });

    let order_number = order
        .name
        .or_else(|| order.order_number.map(|n| format!("#{}", n)))
        .unwrap_or_else(|| order.id.to_string());

    Ok(PlatformOrder {
        external_order_id: order.id.to_string(),
        order_number,
        customer,
        financial_status: order.financial_status,
        fulfillment_status: order.fulfillment_status,
        currency: order.currency.unwrap_or_else(|| "USD".to_string()),
        subtotal: cents("subtotal_price", order.subtotal_price.as_deref())?,
        total_tax: cents("total_tax", order.total_tax.as_deref())?,
        total_shipping: cents(
            "total_shipping_price_set",
            order.total_shipping_price_set.as_ref().map(|s| s.shop_money.amount.as_str()),
        )?,
        total_discounts: cents("total_discounts", order.total_discounts.as_deref())?,
        total_amount: cents("total_price", order.total_price.as_deref())?,
        created_at: order.created_at,
        line_items,
    })
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Shopify webhooks are not configured")]
    NotConfigured,

    #[error("Missing {0} header")]
    MissingHeader(&'static str),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Unknown shop {0}")]
    UnknownShop(String),

    #[error("Invalid request payload")]
    InvalidPayload,

    #[error("Invalid amount in {0}")]
    InvalidAmount(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            WebhookError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            WebhookError::MissingHeader(_)
            | WebhookError::InvalidPayload
            | WebhookError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::UnknownShop(_) => StatusCode::NOT_FOUND,
            WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            WebhookError::Database(e) => {
                error!(error = %e, "Shopify webhook failed");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
