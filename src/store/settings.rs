//! Per-company business settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::query::Query;
use super::supabase::{SupabaseClient, SupabaseError};

pub const DEFAULT_DEAD_STOCK_DAYS: i32 = 90;

/// Row of `company_settings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct CompanySettings {
    pub company_id: Uuid,
    pub dead_stock_days: i32,
    pub fast_moving_days: i32,
    pub overstock_multiplier: f64,
    /// Cents
    pub high_value_threshold: i64,
    pub currency: String,
    pub timezone: String,
    pub tax_rate: f64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CompanySettings {
    /// Values used until a company saves its own
    pub fn defaults(company_id: Uuid) -> Self {
        Self {
            company_id,
            dead_stock_days: DEFAULT_DEAD_STOCK_DAYS,
            fast_moving_days: 30,
            overstock_multiplier: 3.0,
            high_value_threshold: 100_000,
            currency: "USD".to_string(),
            timezone: "UTC".to_string(),
            tax_rate: 0.0,
            updated_at: None,
        }
    }
}

/// Settings store operations
#[derive(Clone)]
pub struct SettingsStore {
    client: SupabaseClient,
}

impl SettingsStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Stored settings, or the defaults when the company has none yet
    pub async fn get(&self, company_id: Uuid) -> Result<CompanySettings, SupabaseError> {
        let query = Query::for_company(company_id);
        let settings: Option<CompanySettings> =
            self.client.get_one("company_settings", &query).await?;
        Ok(settings.unwrap_or_else(|| CompanySettings::defaults(company_id)))
    }

    pub async fn save(&self, settings: &CompanySettings) -> Result<CompanySettings, SupabaseError> {
        let row = CompanySettings {
            updated_at: Some(Utc::now()),
            ..settings.clone()
        };
        self.client
            .upsert("company_settings", &row_json(&row), "company_id")
            .await?;
        Ok(row)
    }
}

/// Database column names for an upsert; the struct itself serializes camelCase
fn row_json(settings: &CompanySettings) -> serde_json::Value {
    serde_json::json!({
        "company_id": settings.company_id,
        "dead_stock_days": settings.dead_stock_days,
        "fast_moving_days": settings.fast_moving_days,
        "overstock_multiplier": settings.overstock_multiplier,
        "high_value_threshold": settings.high_value_threshold,
        "currency": settings.currency,
        "timezone": settings.timezone,
        "tax_rate": settings.tax_rate,
        "updated_at": settings.updated_at,
    })
}
