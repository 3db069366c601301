pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

use {
    adapters::{creem_client::CreemClient, stripe_client::StripeClient},
    std::sync::Arc,
};

/// Built once at startup and cloned into handlers — provider clients are
/// plain dependencies, not lazy module-level singletons.
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub creem_webhook_secret: Arc<str>,
    pub stripe_webhook_secret: Arc<str>,
    pub creem: Arc<CreemClient>,
    pub stripe: Arc<StripeClient>,
}
