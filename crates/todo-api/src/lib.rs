pub mod auth;
pub mod db;
pub mod error;
pub mod graphql;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod routes;
pub mod uploads;

use shared::{Config, TokenService};

use crate::db::Store;
use crate::graphql::ApiSchema;
use crate::payments::PaymentClient;
use crate::uploads::ImageStore;

/// Everything a request handler needs, constructed once at startup and
/// cloned into handlers. There is no process-global state.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: TokenService,
    pub images: ImageStore,
    pub payments: PaymentClient,
    pub schema: ApiSchema,
}

impl AppState {
    pub fn new(
        store: Store,
        tokens: TokenService,
        images: ImageStore,
        payments: PaymentClient,
    ) -> Self {
        let schema = graphql::build_schema(store.clone());
        Self { store, tokens, images, payments, schema }
    }

    pub async fn from_config(config: &Config) -> Result<Self, sqlx::Error> {
        let store = Store::connect(&config.database_url).await?;
        store.migrate().await?;
        Ok(Self::new(
            store,
            TokenService::new(&config.jwt_secret),
            ImageStore::new(&config.uploads_dest),
            PaymentClient::new(&config.stripe_secret_key),
        ))
    }
}
