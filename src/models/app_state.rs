use crate::clients::paystack::PaystackClient;
use crate::config::app_config::AppConfig;
use diesel::r2d2::{self, ConnectionManager};
use diesel::PgConnection;
use eyre::Result;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub paystack: PaystackClient,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Result<Arc<Self>> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;

        let paystack = PaystackClient::new(
            http,
            &config.paystack.api_url,
            config.paystack.secret_key.clone(),
        )?;

        Ok(Arc::new(Self { db, paystack, config }))
    }
}
