//! Supabase REST API client using service_role key

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::Config;

use super::query::Query;

/// Supabase client for server-side database operations
/// Uses service_role key which bypasses RLS, so callers scope every query
/// with `Query::for_company`.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            service_role_key: config.supabase_service_role_key.clone(),
        }
    }

    /// Get the REST API URL for a table or view
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    /// Attach service-role credentials
    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Content-Type", "application/json")
    }

    /// Fetch all rows matching the query
    pub async fn get<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, SupabaseError> {
        let response = self
            .authed(self.client.get(self.rest_url(table)))
            .query(query.pairs())
            .send()
            .await?;

        let response = ensure_success(response).await?;
        response.json().await.map_err(SupabaseError::Parse)
    }

    /// Fetch a page of rows together with the exact total row count
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<(Vec<T>, u64), SupabaseError> {
        let response = self
            .authed(self.client.get(self.rest_url(table)))
            .header("Prefer", "count=exact")
            .query(query.pairs())
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let total = response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        let rows: Vec<T> = response.json().await.map_err(SupabaseError::Parse)?;
        let total = total.unwrap_or(rows.len() as u64);
        Ok((rows, total))
    }

    /// Fetch a single row, `None` when nothing matches
    pub async fn get_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Option<T>, SupabaseError> {
        let response = self
            .authed(self.client.get(self.rest_url(table)))
            .header("Accept", "application/vnd.pgrst.object+json")
            .query(query.pairs())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            // No rows found
            return Ok(None);
        }

        let response = ensure_success(response).await?;
        response.json().await.map(Some).map_err(SupabaseError::Parse)
    }

    /// Insert one row and return its representation
    pub async fn insert<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        table: &str,
        data: &T,
    ) -> Result<R, SupabaseError> {
        let response = self
            .authed(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(data)
            .send()
            .await?;

        let response = ensure_success(response).await?;

        // PostgREST returns an array, get first element
        let results: Vec<R> = response.json().await.map_err(SupabaseError::Parse)?;
        results
            .into_iter()
            .next()
            .ok_or(SupabaseError::NoRowReturned)
    }

    /// Insert many rows in one request
    pub async fn insert_many<T: Serialize>(
        &self,
        table: &str,
        rows: &[T],
    ) -> Result<(), SupabaseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let response = self
            .authed(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    /// Upsert (insert or update on conflict)
    pub async fn upsert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        data: &T,
        on_conflict: &str,
    ) -> Result<(), SupabaseError> {
        let response = self
            .authed(self.client.post(self.rest_url(table)))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", on_conflict)])
            .json(data)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    /// Update matching rows and return them
    pub async fn update<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
        data: &T,
    ) -> Result<Vec<R>, SupabaseError> {
        let response = self
            .authed(self.client.patch(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .query(query.pairs())
            .json(data)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        response.json().await.map_err(SupabaseError::Parse)
    }

    /// Delete matching rows, returning how many were removed
    pub async fn delete(&self, table: &str, query: &Query) -> Result<usize, SupabaseError> {
        let response = self
            .authed(self.client.delete(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .query(query.pairs())
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let rows: Vec<serde_json::Value> = response.json().await.map_err(SupabaseError::Parse)?;
        Ok(rows.len())
    }

    /// Call a Postgres function through `/rpc`
    pub async fn rpc<A: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        function: &str,
        args: &A,
    ) -> Result<R, SupabaseError> {
        let response = self
            .authed(self.client.post(self.rpc_url(function)))
            .json(args)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        response.json().await.map_err(SupabaseError::Parse)
    }

    /// Call a Postgres function whose result is not needed (void functions
    /// answer 204 with an empty body)
    pub async fn rpc_void<A: Serialize + ?Sized>(
        &self,
        function: &str,
        args: &A,
    ) -> Result<(), SupabaseError> {
        let response = self
            .authed(self.client.post(self.rpc_url(function)))
            .json(args)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, SupabaseError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(SupabaseError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Total row count from a PostgREST `Content-Range` header (`0-24/3573`)
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

/// Error object returned by PostgREST
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostgrestError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Supabase errors
#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("No row returned from insert")]
    NoRowReturned,
}

impl SupabaseError {
    /// Decoded PostgREST error body, if the API returned one
    pub fn postgrest_error(&self) -> Option<PostgrestError> {
        match self {
            SupabaseError::Api { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SupabaseError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Unique constraint violation
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
            || self
                .postgrest_error()
                .and_then(|e| e.code)
                .is_some_and(|code| code == "23505")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-24/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn decodes_postgrest_error_body() {
        let err = SupabaseError::Api {
            status: 409,
            body: r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":"Key (company_id, sku) already exists.","hint":null}"#.to_string(),
        };

        let decoded = err.postgrest_error().unwrap();
        assert_eq!(decoded.code.as_deref(), Some("23505"));
        assert!(decoded.details.unwrap().contains("sku"));
        assert!(err.is_conflict());
    }

    #[test]
    fn non_json_body_has_no_postgrest_error() {
        let err = SupabaseError::Api {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        assert!(err.postgrest_error().is_none());
        assert!(!err.is_conflict());
    }
}
