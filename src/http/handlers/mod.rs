//! Request handlers, one module per resource

pub mod analytics;
pub mod chat;
pub mod customers;
pub mod files;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod purchase_orders;
pub mod settings;
pub mod suppliers;

use serde::{Deserialize, Serialize};

use crate::http::error::AppError;
use crate::store::query::Pagination;

pub const MAX_DAYS: u32 = 365;

/// Paginated list body shared by every list endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> ListResponse<T> {
    pub fn new((items, total_count): (Vec<T>, u64), page: Pagination) -> Self {
        Self {
            items,
            total_count,
            page: page.page,
            limit: page.limit,
        }
    }
}

/// `query`, `page` and `limit`
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub query: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    pub fn search(&self) -> Option<&str> {
        non_blank(self.query.as_deref())
    }
}

pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Reporting window; `period` is accepted as an alias for `days`
#[derive(Debug, Default, Deserialize)]
pub struct DaysParams {
    pub days: Option<u32>,
    pub period: Option<u32>,
}

impl DaysParams {
    pub fn resolve(&self, default: u32) -> Result<u32, AppError> {
        check_days(self.days.or(self.period).unwrap_or(default))
    }
}

pub fn check_days(days: u32) -> Result<u32, AppError> {
    if (1..=MAX_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(AppError::Validation(format!(
            "days must be between 1 and {}",
            MAX_DAYS
        )))
    }
}
