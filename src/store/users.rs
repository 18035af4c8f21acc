//! Company membership lookup for authenticated users

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

use super::query::Query;
use super::supabase::{SupabaseClient, SupabaseError};

const MEMBERSHIP_TTL: Duration = Duration::from_secs(300);

/// Row from the `users` table linking an auth user to a company
#[derive(Debug, Clone, Deserialize)]
pub struct Membership {
    pub company_id: Uuid,
    #[serde(default)]
    pub role: Option<String>,
}

/// Membership store with a short-lived in-process cache
#[derive(Clone)]
pub struct UserStore {
    client: SupabaseClient,
    cache: Arc<DashMap<Uuid, (Membership, Instant)>>,
}

impl UserStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self {
            client,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Company membership for an auth user, `None` if the user has no company
    pub async fn membership(&self, user_id: Uuid) -> Result<Option<Membership>, SupabaseError> {
        if let Some(entry) = self.cache.get(&user_id) {
            let (membership, cached_at) = entry.value();
            if cached_at.elapsed() < MEMBERSHIP_TTL {
                return Ok(Some(membership.clone()));
            }
        }

        // Users are looked up by their own id, before any company is known
        let query = Query::new()
            .eq("id", user_id)
            .is_null("deleted_at")
            .select("company_id,role");
        let found: Option<Membership> = self.client.get_one("users", &query).await?;

        match &found {
            Some(membership) => {
                self.cache
                    .insert(user_id, (membership.clone(), Instant::now()));
            }
            None => {
                self.cache.remove(&user_id);
            }
        }

        Ok(found)
    }

    /// Remove cache entries past their TTL, returning how many were dropped
    pub fn evict_expired(&self) -> usize {
        let before = self.cache.len();
        self.cache
            .retain(|_, (_, cached_at)| cached_at.elapsed() < MEMBERSHIP_TTL);
        before.saturating_sub(self.cache.len())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Config;

    fn membership(company_id: Uuid) -> Membership {
        Membership {
            company_id,
            role: Some("Admin".to_string()),
        }
    }

    #[tokio::test]
    async fn memberships_are_cached() {
        let server = MockServer::start().await;
        let company = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "company_id": company, "role": "Admin" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = UserStore::new(SupabaseClient::new(&Config::for_tests(&server.uri())));
        let user = Uuid::new_v4();
        for _ in 0..2 {
            let found = store.membership(user).await.unwrap();
            assert_eq!(found.map(|m| m.company_id), Some(company));
        }
    }

    #[test]
    fn expired_entries_are_evicted() {
        let store = UserStore::new(SupabaseClient::new(&Config::for_tests("http://localhost:1")));
        let fresh = Uuid::new_v4();
        let stale = Uuid::new_v4();
        store
            .cache
            .insert(fresh, (membership(Uuid::new_v4()), Instant::now()));
        if let Some(old) = Instant::now().checked_sub(MEMBERSHIP_TTL + Duration::from_secs(1)) {
            store
                .cache
                .insert(stale, (membership(Uuid::new_v4()), old));
            assert_eq!(store.evict_expired(), 1);
        }

        assert!(store.cache.contains_key(&fresh));
        assert!(!store.cache.contains_key(&stale));
    }
}
