//! Connected sales platforms and webhook bookkeeping

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::query::Query;
use super::supabase::{SupabaseClient, SupabaseError};

#[derive(Debug, Clone, Deserialize)]
pub struct Integration {
    pub id: Uuid,
    pub company_id: Uuid,
}

#[derive(Serialize)]
struct WebhookEvent<'a> {
    integration_id: Uuid,
    webhook_id: &'a str,
}

#[derive(Serialize)]
struct RecordOrderArgs<'a, T> {
    p_company_id: Uuid,
    p_platform: &'a str,
    p_order_payload: &'a T,
}

/// Integration store operations. These run for unauthenticated webhook
/// calls, so lookups are keyed by shop rather than by company.
#[derive(Clone)]
pub struct IntegrationStore {
    client: SupabaseClient,
}

impl IntegrationStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn find_by_shop(
        &self,
        platform: &str,
        shop_domain: &str,
    ) -> Result<Option<Integration>, SupabaseError> {
        let query = Query::new()
            .eq("platform", platform)
            .eq("shop_domain", shop_domain)
            .eq("is_active", true);
        self.client.get_one("integrations", &query).await
    }

    /// Record a delivery id. Returns false when it was already seen.
    pub async fn record_webhook(
        &self,
        integration_id: Uuid,
        webhook_id: &str,
    ) -> Result<bool, SupabaseError> {
        let event = WebhookEvent {
            integration_id,
            webhook_id,
        };
        match self.client.insert_many("webhook_events", &[event]).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_conflict() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Forget a delivery id so a retry of a failed delivery is processed again
    pub async fn release_webhook(
        &self,
        integration_id: Uuid,
        webhook_id: &str,
    ) -> Result<(), SupabaseError> {
        let query = Query::new()
            .eq("integration_id", integration_id)
            .eq("webhook_id", webhook_id);
        self.client.delete("webhook_events", &query).await.map(|_| ())
    }

    /// Create or update the order, its customer and line items, adjusting stock
    pub async fn record_order<T: Serialize>(
        &self,
        company_id: Uuid,
        platform: &str,
        order: &T,
    ) -> Result<(), SupabaseError> {
        self.client
            .rpc_void(
                "record_order_from_platform",
                &RecordOrderArgs {
                    p_company_id: company_id,
                    p_platform: platform,
                    p_order_payload: order,
                },
            )
            .await
    }
}
