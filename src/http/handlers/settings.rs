//! Company settings

use axum::extract::{Extension, State};
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::app::AppState;
use crate::http::error::AppError;
use crate::http::extract::Json;
use crate::http::middleware::AuthenticatedUser;
use crate::store::settings::CompanySettings;

fn currency_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(ValidationError::new("currency must be a 3 letter code"))
    }
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[validate(range(min = 1, max = 730, message = "deadStockDays must be between 1 and 730"))]
    dead_stock_days: Option<i32>,
    #[validate(range(min = 1, max = 365, message = "fastMovingDays must be between 1 and 365"))]
    fast_moving_days: Option<i32>,
    #[validate(range(min = 1.0, max = 10.0, message = "overstockMultiplier must be between 1 and 10"))]
    overstock_multiplier: Option<f64>,
    #[validate(range(min = 0, message = "highValueThreshold cannot be negative"))]
    high_value_threshold: Option<i64>,
    #[validate(custom = "currency_code")]
    currency: Option<String>,
    #[validate(length(min = 1, max = 64, message = "timezone must be 1 to 64 characters"))]
    timezone: Option<String>,
    #[validate(range(min = 0.0, max = 1.0, message = "taxRate must be between 0 and 1"))]
    tax_rate: Option<f64>,
}

impl SettingsUpdate {
    fn apply(self, current: CompanySettings) -> CompanySettings {
        CompanySettings {
            dead_stock_days: self.dead_stock_days.unwrap_or(current.dead_stock_days),
            fast_moving_days: self.fast_moving_days.unwrap_or(current.fast_moving_days),
            overstock_multiplier: self
                .overstock_multiplier
                .unwrap_or(current.overstock_multiplier),
            high_value_threshold: self
                .high_value_threshold
                .unwrap_or(current.high_value_threshold),
            currency: self
                .currency
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or(current.currency),
            timezone: self.timezone.unwrap_or(current.timezone),
            tax_rate: self.tax_rate.unwrap_or(current.tax_rate),
            ..current
        }
    }
}

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<CompanySettings>, AppError> {
    Ok(Json(state.settings.get(auth.company_id).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<CompanySettings>, AppError> {
    auth.require_manager()?;
    update.validate()?;

    let current = state.settings.get(auth.company_id).await?;
    let saved = state.settings.save(&update.apply(current)).await?;

    info!(company_id = %auth.company_id, user_id = %auth.user_id, "Company settings updated");
    Ok(Json(saved))
}
