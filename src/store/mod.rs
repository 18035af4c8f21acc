//! Data store modules for Supabase integration

pub mod analytics;
pub mod conversations;
pub mod customers;
pub mod integrations;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod purchase_orders;
pub mod query;
pub mod settings;
pub mod supabase;
pub mod suppliers;
pub mod users;

pub use analytics::AnalyticsStore;
pub use conversations::ConversationStore;
pub use customers::CustomerStore;
pub use integrations::IntegrationStore;
pub use inventory::InventoryStore;
pub use orders::OrderStore;
pub use products::ProductStore;
pub use purchase_orders::PurchaseOrderStore;
pub use settings::SettingsStore;
pub use supabase::SupabaseClient;
pub use suppliers::SupplierStore;
pub use users::UserStore;
