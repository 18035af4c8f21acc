//! Analytics routes: thin wrappers over the reporting RPCs, the advanced
//! analyses computed from raw rows, and stock alerts

use std::collections::HashMap;

use axum::extract::{Extension, State};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::{check_days, non_blank, DaysParams};
use crate::analytics::alerts::{derive_alerts, Alert};
use crate::analytics::forecast::{forecast_demand, DemandForecast};
use crate::analytics::{
    abc, aggregate_by_sku, channels, customers, margin, opportunities, suppliers, turnover,
    velocity, AnalysisType,
};
use crate::app::AppState;
use crate::http::error::AppError;
use crate::http::extract::{Json, Query};
use crate::http::middleware::AuthenticatedUser;
use crate::store::analytics::{
    AbcRow, DashboardMetrics, DeadStockItem, GrossMarginRow, HistoricalSale, InventoryTurnover,
    ReorderSuggestion, SalesVelocityRow, SupplierPerformanceRow,
};
use crate::store::orders::OrderLineItem;
use crate::util::time::days_ago;

pub const DEFAULT_DAYS: u32 = 30;
pub const DEFAULT_TURNOVER_DAYS: u32 = 90;
pub const DEFAULT_ADVANCED_DAYS: u32 = 90;
pub const DEFAULT_HORIZON_DAYS: u32 = 30;
const DEFAULT_VELOCITY_LIMIT: u32 = 10;
const MAX_VELOCITY_LIMIT: u32 = 100;
/// SKUs forecast when no SKU is named
const TOP_FORECAST_SKUS: usize = 5;

// ============================================================================
// Reporting RPCs
// ============================================================================

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<DaysParams>,
) -> Result<Json<DashboardMetrics>, AppError> {
    let days = params.resolve(DEFAULT_DAYS)?;
    Ok(Json(
        state.analytics.dashboard_metrics(auth.company_id, days).await?,
    ))
}

pub async fn dead_stock(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<DeadStockItem>>, AppError> {
    Ok(Json(state.analytics.dead_stock(auth.company_id).await?))
}

pub async fn reorder_suggestions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<ReorderSuggestion>>, AppError> {
    Ok(Json(
        state.analytics.reorder_suggestions(auth.company_id).await?,
    ))
}

pub async fn abc_analysis(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<AbcRow>>, AppError> {
    Ok(Json(state.analytics.abc_analysis(auth.company_id).await?))
}

pub async fn supplier_performance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<SupplierPerformanceRow>>, AppError> {
    Ok(Json(
        state.analytics.supplier_performance(auth.company_id).await?,
    ))
}

pub async fn inventory_turnover(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<DaysParams>,
) -> Result<Json<InventoryTurnover>, AppError> {
    let days = params.resolve(DEFAULT_TURNOVER_DAYS)?;
    Ok(Json(
        state.analytics.inventory_turnover(auth.company_id, days).await?,
    ))
}

pub async fn sales_analytics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.analytics.sales_analytics(auth.company_id).await?))
}

pub async fn inventory_analytics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(
        state.analytics.inventory_analytics(auth.company_id).await?,
    ))
}

pub async fn customer_analytics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(
        state.analytics.customer_analytics(auth.company_id).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct VelocityParams {
    days: Option<u32>,
    period: Option<u32>,
    limit: Option<u32>,
}

pub async fn sales_velocity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<VelocityParams>,
) -> Result<Json<Vec<SalesVelocityRow>>, AppError> {
    let days = check_days(params.days.or(params.period).unwrap_or(DEFAULT_DAYS))?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_VELOCITY_LIMIT)
        .clamp(1, MAX_VELOCITY_LIMIT);
    Ok(Json(
        state
            .analytics
            .sales_velocity(auth.company_id, days, limit)
            .await?,
    ))
}

pub async fn gross_margin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<GrossMarginRow>>, AppError> {
    Ok(Json(state.analytics.gross_margin(auth.company_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    sku: Option<String>,
    /// Forecast horizon
    days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuForecast {
    sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_name: Option<String>,
    #[serde(flatten)]
    forecast: DemandForecast,
}

pub async fn forecast(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<ForecastParams>,
) -> Result<Json<SkuForecast>, AppError> {
    let sku = non_blank(params.sku.as_deref())
        .ok_or_else(|| AppError::BadRequest("sku is required".to_string()))?
        .to_string();
    let horizon = check_days(params.days.unwrap_or(DEFAULT_HORIZON_DAYS))?;

    let history = state
        .analytics
        .historical_sales(auth.company_id, &sku)
        .await?;
    let forecast = forecast_demand(&history, Utc::now().date_naive(), horizon);

    Ok(Json(SkuForecast {
        sku,
        product_name: None,
        forecast,
    }))
}

// ============================================================================
// Advanced analyses
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedRequest {
    analysis_type: String,
    days: Option<u32>,
    /// Only used by `demand-forecast`
    sku: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedMetadata {
    analysis_type: &'static str,
    timestamp: DateTime<Utc>,
    company_id: Uuid,
    days: u32,
}

#[derive(Debug, Serialize)]
pub struct AdvancedResponse {
    success: bool,
    data: Value,
    metadata: AdvancedMetadata,
}

pub async fn advanced(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<AdvancedRequest>,
) -> Result<Json<AdvancedResponse>, AppError> {
    let analysis: AnalysisType = req.analysis_type.parse().map_err(AppError::BadRequest)?;
    let days = check_days(req.days.unwrap_or(DEFAULT_ADVANCED_DAYS))?;

    let data = run_analysis(
        &state,
        auth.company_id,
        analysis,
        days,
        non_blank(req.sku.as_deref()),
    )
    .await?;

    info!(company_id = %auth.company_id, analysis = %analysis, days, "Advanced analysis served");

    Ok(Json(AdvancedResponse {
        success: true,
        data,
        metadata: AdvancedMetadata {
            analysis_type: analysis.as_str(),
            timestamp: Utc::now(),
            company_id: auth.company_id,
            days,
        },
    }))
}

async fn line_items(
    state: &AppState,
    company_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<OrderLineItem>, AppError> {
    let items = state.orders.line_items_since(company_id, since).await?;
    debug!(company_id = %company_id, rows = items.len(), "Loaded line items for analysis");
    Ok(items)
}

async fn run_analysis(
    state: &AppState,
    company_id: Uuid,
    analysis: AnalysisType,
    days: u32,
    sku: Option<&str>,
) -> Result<Value, AppError> {
    let since = days_ago(days);
    let now = Utc::now();

    let data = match analysis {
        AnalysisType::AbcAnalysis => {
            let sales = aggregate_by_sku(&line_items(state, company_id, since).await?);
            let items = abc::classify(&sales);
            json!({ "summary": abc::summarize(&items), "items": items })
        }
        AnalysisType::DemandForecast => match sku {
            Some(sku) => {
                let history = state.analytics.historical_sales(company_id, sku).await?;
                json!([SkuForecast {
                    sku: sku.to_string(),
                    product_name: None,
                    forecast: forecast_demand(&history, now.date_naive(), DEFAULT_HORIZON_DAYS),
                }])
            }
            None => {
                let items = line_items(state, company_id, since).await?;
                json!(top_sku_forecasts(&items, now.date_naive()))
            }
        },
        AnalysisType::SalesVelocity => {
            let items = line_items(state, company_id, since).await?;
            json!(velocity::sales_velocity(&items, since, days))
        }
        AnalysisType::GrossMargin => {
            let sales = aggregate_by_sku(&line_items(state, company_id, since).await?);
            json!(margin::gross_margin(&sales))
        }
        AnalysisType::HiddenOpportunities => {
            let (items, inventory) = futures::try_join!(
                line_items(state, company_id, since),
                async { Ok::<_, AppError>(state.inventory.all(company_id).await?) },
            )?;
            let margins = margin::gross_margin(&aggregate_by_sku(&items));
            let velocity = velocity::sales_velocity(&items, since, days);
            let inputs = opportunities::build_inputs(&margins, &velocity, &inventory);
            json!(opportunities::find_opportunities(&inputs))
        }
        AnalysisType::SupplierPerformance => {
            let report = state.analytics.supplier_performance(company_id).await?;
            json!(suppliers::score_suppliers(&report))
        }
        AnalysisType::InventoryTurnover => {
            let (items, inventory) = futures::try_join!(
                line_items(state, company_id, since),
                async { Ok::<_, AppError>(state.inventory.all(company_id).await?) },
            )?;
            json!(turnover::inventory_turnover(
                &aggregate_by_sku(&items),
                &inventory,
                days
            ))
        }
        AnalysisType::CustomerInsights => {
            let buyers = state.customers.with_orders(company_id).await?;
            let insights = customers::segment_customers(&buyers, now);
            json!({ "segments": customers::count_segments(&insights), "customers": insights })
        }
        AnalysisType::ChannelFees => {
            let (orders, fees) = futures::try_join!(
                state.orders.since(company_id, since),
                state.analytics.channel_fees(company_id),
            )?;
            json!(channels::analyze_channels(&orders, &fees, days))
        }
    };

    Ok(data)
}

/// Forecasts for the best selling SKUs in `items`, built from daily totals
fn top_sku_forecasts(items: &[OrderLineItem], today: NaiveDate) -> Vec<SkuForecast> {
    let mut sales = aggregate_by_sku(items);
    sales.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.sku.cmp(&b.sku)));
    sales.truncate(TOP_FORECAST_SKUS);

    sales
        .into_iter()
        .map(|s| {
            let mut daily: HashMap<NaiveDate, i64> = HashMap::new();
            for item in items.iter().filter(|i| i.sku.as_deref() == Some(s.sku.as_str())) {
                if let Some(at) = item.created_at {
                    *daily.entry(at.date_naive()).or_default() += item.quantity;
                }
            }
            let history: Vec<HistoricalSale> = daily
                .into_iter()
                .map(|(sale_date, total_quantity)| HistoricalSale {
                    sale_date,
                    total_quantity,
                })
                .collect();

            SkuForecast {
                forecast: forecast_demand(&history, today, DEFAULT_HORIZON_DAYS),
                sku: s.sku,
                product_name: s.product_name,
            }
        })
        .collect()
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    alerts: Vec<Alert>,
    total: usize,
}

/// Most recent sale per SKU
pub fn last_sales(items: &[OrderLineItem]) -> HashMap<String, DateTime<Utc>> {
    let mut latest: HashMap<String, DateTime<Utc>> = HashMap::new();
    for item in items {
        let (Some(sku), Some(at)) = (item.sku.as_deref(), item.created_at) else {
            continue;
        };
        latest
            .entry(sku.to_string())
            .and_modify(|seen| *seen = (*seen).max(at))
            .or_insert(at);
    }
    latest
}

pub async fn alerts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<AlertsResponse>, AppError> {
    let settings = state.settings.get(auth.company_id).await?;
    let window = u32::try_from(settings.dead_stock_days.max(1)).unwrap_or(1);

    let (inventory, items) = futures::try_join!(
        state.inventory.all(auth.company_id),
        state.orders.line_items_since(auth.company_id, days_ago(window)),
    )?;

    let alerts = derive_alerts(
        &inventory,
        &last_sales(&items),
        i64::from(window),
        Utc::now(),
    );
    Ok(Json(AlertsResponse {
        total: alerts.len(),
        alerts,
    }))
}
