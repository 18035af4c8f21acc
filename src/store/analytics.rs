//! Typed wrappers over the analytics functions that run inside Postgres.
//!
//! Rows keep the database's snake_case field names on the wire; dashboards
//! consume them unchanged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::query::Query;
use super::supabase::{SupabaseClient, SupabaseError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardMetrics {
    /// Cents
    pub total_revenue: i64,
    pub total_orders: i64,
    pub total_products: i64,
    pub low_stock_count: i64,
    /// Remaining fields (period deltas, charts, top sellers) pass through as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadStockItem {
    pub sku: String,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: i64,
    /// Cents
    #[serde(default)]
    pub total_value: i64,
    #[serde(default)]
    pub last_sale_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub days_since_sale: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub variant_id: Uuid,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    pub sku: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    pub current_stock: i64,
    #[serde(default)]
    pub reorder_point: Option<i64>,
    pub suggested_reorder_quantity: i64,
    /// Cents
    #[serde(default)]
    pub unit_cost: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbcRow {
    pub sku: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub revenue: i64,
    #[serde(default)]
    pub cumulative_percentage: f64,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplierPerformanceRow {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    #[serde(default)]
    pub total_profit: i64,
    #[serde(default)]
    pub avg_margin: f64,
    #[serde(default)]
    pub sell_through_rate: f64,
    #[serde(default)]
    pub on_time_delivery_rate: f64,
    #[serde(default)]
    pub average_lead_time_days: f64,
    #[serde(default)]
    pub total_completed_orders: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryTurnover {
    #[serde(default)]
    pub turnover_rate: f64,
    #[serde(default)]
    pub total_cogs: i64,
    #[serde(default)]
    pub average_inventory_value: i64,
    #[serde(default)]
    pub period_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesVelocityRow {
    pub sku: String,
    #[serde(default)]
    pub product_name: Option<String>,
    pub total_quantity: i64,
    #[serde(default)]
    pub total_revenue: i64,
    #[serde(default)]
    pub days_period: i64,
    #[serde(default)]
    pub velocity_per_day: f64,
    #[serde(default)]
    pub revenue_per_day: f64,
    #[serde(default)]
    pub trend: Option<String>,
    #[serde(default)]
    pub performance_category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrossMarginRow {
    pub sku: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub total_revenue: i64,
    #[serde(default)]
    pub total_cost: i64,
    #[serde(default)]
    pub gross_margin: i64,
    #[serde(default)]
    pub gross_margin_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSale {
    pub sale_date: NaiveDate,
    pub total_quantity: i64,
}

/// Fee schedule for one sales channel (`channel_fees` table)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelFee {
    pub channel_name: String,
    /// Fraction of order value, e.g. 0.029
    #[serde(default)]
    pub percentage_fee: f64,
    /// Cents per order
    #[serde(default)]
    pub fixed_fee: i64,
    /// Cents per month
    #[serde(default)]
    pub monthly_fee: i64,
    /// Cents per month
    #[serde(default)]
    pub other_fees: i64,
}

#[derive(Serialize)]
struct CompanyArgs {
    p_company_id: Uuid,
}

#[derive(Serialize)]
struct DaysArgs {
    p_company_id: Uuid,
    p_days: u32,
}

#[derive(Serialize)]
struct VelocityArgs {
    p_company_id: Uuid,
    p_days: u32,
    p_limit: u32,
}

#[derive(Serialize)]
struct SkuArgs<'a> {
    p_company_id: Uuid,
    p_sku: &'a str,
}

/// Analytics RPC operations
#[derive(Clone)]
pub struct AnalyticsStore {
    client: SupabaseClient,
}

impl AnalyticsStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn for_company<R: serde::de::DeserializeOwned>(
        &self,
        function: &str,
        company_id: Uuid,
    ) -> Result<R, SupabaseError> {
        self.client
            .rpc(function, &CompanyArgs { p_company_id: company_id })
            .await
    }

    pub async fn dashboard_metrics(
        &self,
        company_id: Uuid,
        days: u32,
    ) -> Result<DashboardMetrics, SupabaseError> {
        self.client
            .rpc(
                "get_dashboard_metrics",
                &DaysArgs {
                    p_company_id: company_id,
                    p_days: days,
                },
            )
            .await
    }

    pub async fn dead_stock(&self, company_id: Uuid) -> Result<Vec<DeadStockItem>, SupabaseError> {
        self.for_company("get_dead_stock_report", company_id).await
    }

    pub async fn reorder_suggestions(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<ReorderSuggestion>, SupabaseError> {
        self.for_company("get_reorder_suggestions", company_id).await
    }

    pub async fn abc_analysis(&self, company_id: Uuid) -> Result<Vec<AbcRow>, SupabaseError> {
        self.for_company("get_abc_analysis", company_id).await
    }

    pub async fn supplier_performance(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<SupplierPerformanceRow>, SupabaseError> {
        self.for_company("get_supplier_performance_report", company_id)
            .await
    }

    pub async fn inventory_turnover(
        &self,
        company_id: Uuid,
        days: u32,
    ) -> Result<InventoryTurnover, SupabaseError> {
        self.client
            .rpc(
                "get_inventory_turnover",
                &DaysArgs {
                    p_company_id: company_id,
                    p_days: days,
                },
            )
            .await
    }

    pub async fn sales_analytics(&self, company_id: Uuid) -> Result<Value, SupabaseError> {
        self.for_company("get_sales_analytics", company_id).await
    }

    pub async fn inventory_analytics(&self, company_id: Uuid) -> Result<Value, SupabaseError> {
        self.for_company("get_inventory_analytics", company_id).await
    }

    pub async fn customer_analytics(&self, company_id: Uuid) -> Result<Value, SupabaseError> {
        self.for_company("get_customer_analytics", company_id).await
    }

    pub async fn sales_velocity(
        &self,
        company_id: Uuid,
        days: u32,
        limit: u32,
    ) -> Result<Vec<SalesVelocityRow>, SupabaseError> {
        self.client
            .rpc(
                "get_sales_velocity",
                &VelocityArgs {
                    p_company_id: company_id,
                    p_days: days,
                    p_limit: limit,
                },
            )
            .await
    }

    pub async fn gross_margin(&self, company_id: Uuid) -> Result<Vec<GrossMarginRow>, SupabaseError> {
        self.for_company("get_gross_margin_analysis", company_id).await
    }

    pub async fn historical_sales(
        &self,
        company_id: Uuid,
        sku: &str,
    ) -> Result<Vec<HistoricalSale>, SupabaseError> {
        self.client
            .rpc(
                "get_historical_sales_for_sku",
                &SkuArgs {
                    p_company_id: company_id,
                    p_sku: sku,
                },
            )
            .await
    }

    pub async fn channel_fees(&self, company_id: Uuid) -> Result<Vec<ChannelFee>, SupabaseError> {
        let query = Query::for_company(company_id).order("channel_name", false);
        self.client.get("channel_fees", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_keeps_unknown_fields() {
        let metrics: DashboardMetrics = serde_json::from_value(serde_json::json!({
            "total_revenue": 125000,
            "total_orders": 42,
            "total_products": 17,
            "low_stock_count": 3,
            "revenue_change": 12.5,
            "sales_over_time": [{"date": "2024-03-01", "revenue": 5000}]
        }))
        .unwrap();

        assert_eq!(metrics.total_orders, 42);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["revenue_change"], 12.5);
        assert_eq!(json["total_revenue"], 125000);
        assert!(json["sales_over_time"].is_array());
    }

    #[test]
    fn reorder_suggestion_tolerates_missing_supplier() {
        let row: ReorderSuggestion = serde_json::from_value(serde_json::json!({
            "variant_id": Uuid::new_v4(),
            "sku": "CANDLE-L",
            "current_stock": 2,
            "suggested_reorder_quantity": 40
        }))
        .unwrap();

        assert!(row.supplier_id.is_none());
        assert_eq!(row.suggested_reorder_quantity, 40);
    }
}
