//! Application state shared across routes

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::ai::{ChatService, GeminiClient, LanguageModel, ToolRunner};
use crate::config::Config;
use crate::export::Exporter;
use crate::import::Importer;
use crate::store::{
    AnalyticsStore, ConversationStore, CustomerStore, IntegrationStore, InventoryStore, OrderStore,
    ProductStore, PurchaseOrderStore, SettingsStore, SupabaseClient, SupplierStore, UserStore,
};
use crate::util::rate_limit::RateLimits;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_store: UserStore,
    pub inventory: InventoryStore,
    pub products: ProductStore,
    pub suppliers: SupplierStore,
    pub customers: CustomerStore,
    pub orders: OrderStore,
    pub purchase_orders: PurchaseOrderStore,
    pub analytics: AnalyticsStore,
    pub settings: SettingsStore,
    pub conversations: ConversationStore,
    pub integrations: IntegrationStore,
    pub chat: ChatService,
    pub importer: Importer,
    pub exporter: Exporter,
    pub rate_limits: RateLimits,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let model: Option<Arc<dyn LanguageModel>> = match config.google_api_key.as_deref() {
            Some(key) => {
                info!(model = %config.ai_model, "AI chat enabled");
                Some(Arc::new(GeminiClient::new(&config.ai_base_url, key, &config.ai_model)))
            }
            None => {
                warn!("GOOGLE_API_KEY not set, AI chat is disabled");
                None
            }
        };
        Self::with_model(config, model)
    }

    /// Build state around a specific language model
    pub fn with_model(config: Config, model: Option<Arc<dyn LanguageModel>>) -> Self {
        let config = Arc::new(config);

        let supabase = SupabaseClient::new(&config);

        let user_store = UserStore::new(supabase.clone());
        let inventory = InventoryStore::new(supabase.clone());
        let products = ProductStore::new(supabase.clone());
        let suppliers = SupplierStore::new(supabase.clone());
        let customers = CustomerStore::new(supabase.clone());
        let orders = OrderStore::new(supabase.clone());
        let purchase_orders = PurchaseOrderStore::new(supabase.clone());
        let analytics = AnalyticsStore::new(supabase.clone());
        let settings = SettingsStore::new(supabase.clone());
        let conversations = ConversationStore::new(supabase.clone());
        let integrations = IntegrationStore::new(supabase);

        let chat = ChatService::new(
            model,
            conversations.clone(),
            ToolRunner::new(analytics.clone()),
        );
        let importer = Importer::new(products.clone(), suppliers.clone());
        let exporter = Exporter::new(
            inventory.clone(),
            suppliers.clone(),
            orders.clone(),
            analytics.clone(),
        );

        let rate_limits = RateLimits::new(
            config.ai_rate_limit_per_minute,
            config.import_rate_limit_per_minute,
        );

        Self {
            config,
            user_store,
            inventory,
            products,
            suppliers,
            customers,
            orders,
            purchase_orders,
            analytics,
            settings,
            conversations,
            integrations,
            chat,
            importer,
            exporter,
            rate_limits,
        }
    }

    /// Evict idle per-user entries so the in-process maps stay bounded
    pub fn sweep_caches(&self) -> usize {
        self.rate_limits.retain_recent();
        self.user_store.evict_expired()
    }

    /// Run `sweep_caches` on a fixed period for the life of the process
    pub fn spawn_housekeeping(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let evicted = state.sweep_caches();
                debug!(
                    evicted_memberships = evicted,
                    rate_limited_users = state.rate_limits.tracked_keys(),
                    "Swept in-process caches"
                );
            }
        })
    }
}
