//! Tools the chat model may call, backed by analytics RPCs

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::model::ToolDeclaration;
use crate::analytics::forecast::forecast_demand;
use crate::store::supabase::SupabaseError;
use crate::store::AnalyticsStore;

/// Rows handed back to the model per tool call
const MAX_ROWS: usize = 50;

const DEFAULT_DAYS: u32 = 30;
const DEFAULT_FORECAST_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    DashboardMetrics,
    ReorderSuggestions,
    DeadStock,
    AbcAnalysis,
    SupplierPerformance,
    InventoryTurnover,
    SalesVelocity,
    GrossMargin,
    DemandForecast,
}

impl Tool {
    pub const ALL: [Tool; 9] = [
        Tool::DashboardMetrics,
        Tool::ReorderSuggestions,
        Tool::DeadStock,
        Tool::AbcAnalysis,
        Tool::SupplierPerformance,
        Tool::InventoryTurnover,
        Tool::SalesVelocity,
        Tool::GrossMargin,
        Tool::DemandForecast,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::DashboardMetrics => "get_dashboard_metrics",
            Tool::ReorderSuggestions => "get_reorder_suggestions",
            Tool::DeadStock => "get_dead_stock_report",
            Tool::AbcAnalysis => "get_abc_analysis",
            Tool::SupplierPerformance => "get_supplier_performance",
            Tool::InventoryTurnover => "get_inventory_turnover",
            Tool::SalesVelocity => "get_sales_velocity",
            Tool::GrossMargin => "get_gross_margin",
            Tool::DemandForecast => "get_demand_forecast",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// UI component that renders this tool's result
    pub fn component(self) -> &'static str {
        match self {
            Tool::DashboardMetrics => "dashboardCard",
            Tool::ReorderSuggestions => "reorderList",
            Tool::DeadStock => "deadStockTable",
            Tool::AbcAnalysis => "abcAnalysisTable",
            Tool::SupplierPerformance => "supplierPerformanceTable",
            Tool::InventoryTurnover => "inventoryTurnoverCard",
            Tool::SalesVelocity => "salesVelocityTable",
            Tool::GrossMargin => "grossMarginTable",
            Tool::DemandForecast => "demandForecastChart",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Tool::DashboardMetrics => {
                "Revenue, order count, product count and low stock count for the last N days."
            }
            Tool::ReorderSuggestions => {
                "Variants at or below their reorder point with suggested reorder quantities and suppliers."
            }
            Tool::DeadStock => "Stocked items that have not sold recently, with the capital tied up in them.",
            Tool::AbcAnalysis => "ABC classification of products by share of revenue.",
            Tool::SupplierPerformance => {
                "Supplier report: on-time delivery, lead time, margin and sell-through per supplier."
            }
            Tool::InventoryTurnover => "Inventory turnover ratio and days of inventory over the last N days.",
            Tool::SalesVelocity => "Fastest and slowest selling SKUs by units sold per day.",
            Tool::GrossMargin => "Gross margin and profit per product.",
            Tool::DemandForecast => "Forecast daily demand for one SKU from its sales history.",
        }
    }

    fn parameters(self) -> Value {
        let days = json!({
            "type": "integer",
            "description": "Look-back window in days (1-365)"
        });
        match self {
            Tool::DashboardMetrics | Tool::InventoryTurnover => json!({
                "type": "object",
                "properties": { "days": days }
            }),
            Tool::SalesVelocity => json!({
                "type": "object",
                "properties": {
                    "days": days,
                    "limit": { "type": "integer", "description": "Number of SKUs to return" }
                }
            }),
            Tool::DemandForecast => json!({
                "type": "object",
                "properties": {
                    "sku": { "type": "string", "description": "SKU to forecast" },
                    "days": { "type": "integer", "description": "Days to forecast (1-365)" }
                },
                "required": ["sku"]
            }),
            _ => json!({ "type": "object", "properties": {} }),
        }
    }

    pub fn declaration(self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name(),
            description: self.description(),
            parameters: self.parameters(),
        }
    }

    /// Chart hint for the reply, for tools whose output plots naturally
    pub fn visualization(self, result: &Value) -> Option<Value> {
        match self {
            Tool::DemandForecast => Some(json!({
                "type": "line",
                "data": result.get("forecast").cloned().unwrap_or(Value::Null),
            })),
            Tool::SalesVelocity => Some(json!({ "type": "bar", "data": result })),
            _ => None,
        }
    }
}

pub fn all_declarations() -> Vec<ToolDeclaration> {
    Tool::ALL.into_iter().map(Tool::declaration).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    Unknown(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Store(#[from] SupabaseError),

    #[error("Could not encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

fn days_arg(args: &Value, default: u32) -> Result<u32, ToolError> {
    match args.get("days") {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_f64()
            .map(|d| d.round())
            .filter(|d| (1.0..=365.0).contains(d))
            .map(|d| d as u32)
            .ok_or_else(|| ToolError::InvalidArguments("days must be between 1 and 365".to_string())),
    }
}

fn truncated<T: serde::Serialize>(rows: Vec<T>) -> Result<Value, ToolError> {
    let total = rows.len();
    let rows: Vec<T> = rows.into_iter().take(MAX_ROWS).collect();
    let mut value = json!({ "rows": serde_json::to_value(rows)? });
    if total > MAX_ROWS {
        value["truncated"] = json!(true);
        value["totalRows"] = json!(total);
    }
    Ok(value)
}

/// Runs tools for one company
#[derive(Clone)]
pub struct ToolRunner {
    analytics: AnalyticsStore,
}

impl ToolRunner {
    pub fn new(analytics: AnalyticsStore) -> Self {
        Self { analytics }
    }

    pub async fn run(&self, company_id: Uuid, tool: Tool, args: &Value) -> Result<Value, ToolError> {
        let analytics = &self.analytics;
        match tool {
            Tool::DashboardMetrics => {
                let days = days_arg(args, DEFAULT_DAYS)?;
                Ok(serde_json::to_value(analytics.dashboard_metrics(company_id, days).await?)?)
            }
            Tool::ReorderSuggestions => truncated(analytics.reorder_suggestions(company_id).await?),
            Tool::DeadStock => truncated(analytics.dead_stock(company_id).await?),
            Tool::AbcAnalysis => truncated(analytics.abc_analysis(company_id).await?),
            Tool::SupplierPerformance => truncated(analytics.supplier_performance(company_id).await?),
            Tool::InventoryTurnover => {
                let days = days_arg(args, DEFAULT_DAYS)?;
                Ok(serde_json::to_value(analytics.inventory_turnover(company_id, days).await?)?)
            }
            Tool::SalesVelocity => {
                let days = days_arg(args, DEFAULT_DAYS)?;
                let limit = args
                    .get("limit")
                    .and_then(Value::as_u64)
                    .map_or(10, |l| l.clamp(1, MAX_ROWS as u64) as u32);
                truncated(analytics.sales_velocity(company_id, days, limit).await?)
            }
            Tool::GrossMargin => truncated(analytics.gross_margin(company_id).await?),
            Tool::DemandForecast => {
                let sku = args
                    .get("sku")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ToolError::InvalidArguments("sku is required".to_string()))?;
                let horizon = days_arg(args, DEFAULT_FORECAST_DAYS)?;
                let history = analytics.historical_sales(company_id, sku).await?;
                let forecast = forecast_demand(&history, Utc::now().date_naive(), horizon);
                let mut value = serde_json::to_value(forecast)?;
                value["sku"] = json!(sku);
                Ok(value)
            }
        }
    }

    pub async fn run_named(&self, company_id: Uuid, name: &str, args: &Value) -> Result<(Tool, Value), ToolError> {
        let tool = Tool::from_name(name).ok_or_else(|| ToolError::Unknown(name.to_string()))?;
        let result = self.run(company_id, tool, args).await?;
        Ok((tool, result))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Config;
    use crate::store::SupabaseClient;

    #[test]
    fn names_round_trip_and_are_unique() {
        let mut names: Vec<&str> = Tool::ALL.iter().map(|t| t.name()).collect();
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Tool::ALL.len());
        assert_eq!(Tool::from_name("drop_tables"), None);
    }

    #[test]
    fn days_are_bounded() {
        assert_eq!(days_arg(&json!({}), 30).unwrap(), 30);
        assert_eq!(days_arg(&json!({ "days": 90 }), 30).unwrap(), 90);
        assert_eq!(days_arg(&json!({ "days": 7.0 }), 30).unwrap(), 7);
        assert!(days_arg(&json!({ "days": 0 }), 30).is_err());
        assert!(days_arg(&json!({ "days": 1000 }), 30).is_err());
        assert!(days_arg(&json!({ "days": "ten" }), 30).is_err());
    }

    #[test]
    fn large_results_are_truncated() {
        let rows: Vec<u32> = (0..120).collect();
        let value = truncated(rows).unwrap();
        assert_eq!(value["rows"].as_array().unwrap().len(), MAX_ROWS);
        assert_eq!(value["totalRows"], 120);

        let small = truncated(vec![1, 2, 3]).unwrap();
        assert!(small.get("truncated").is_none());
    }

    #[test]
    fn forecast_declares_required_sku() {
        let declaration = Tool::DemandForecast.declaration();
        assert_eq!(declaration.parameters["required"], json!(["sku"]));
        assert_eq!(all_declarations().len(), 9);
    }

    #[tokio::test]
    async fn forecast_tool_reads_sales_history() {
        let server = MockServer::start().await;
        let today = Utc::now().date_naive();
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_historical_sales_for_sku"))
            .and(body_partial_json(json!({ "p_sku": "MUG-01" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "sale_date": today - chrono::Duration::days(2), "total_quantity": 4 },
                { "sale_date": today, "total_quantity": 4 }
            ])))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&Config::for_tests(&server.uri()));
        let runner = ToolRunner::new(AnalyticsStore::new(client));
        let (tool, value) = runner
            .run_named(Uuid::new_v4(), "get_demand_forecast", &json!({ "sku": "MUG-01", "days": 7 }))
            .await
            .unwrap();

        assert_eq!(tool, Tool::DemandForecast);
        assert_eq!(value["sku"], "MUG-01");
        assert_eq!(value["forecast"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn forecast_requires_sku() {
        let client = SupabaseClient::new(&Config::for_tests("http://127.0.0.1:9"));
        let runner = ToolRunner::new(AnalyticsStore::new(client));
        let err = runner
            .run(Uuid::new_v4(), Tool::DemandForecast, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
