use eyre::{eyre, Report};
use secrecy::SecretString;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PaystackInfo {
    pub secret_key: SecretString,
    pub api_url: String,
    pub webhook_secret: SecretString,
}

impl PaystackInfo {
    pub fn from_env() -> Result<Self, Report> {
        Ok(Self {
            secret_key: SecretString::new(
                env::var("PAYSTACK_SECRET_KEY")
                    .map_err(|_| eyre!("PAYSTACK_SECRET_KEY must be set"))?
                    .into(),
            ),
            api_url: env::var("PAYSTACK_API_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".into()),
            webhook_secret: SecretString::new(
                env::var("PAYSTACK_WEBHOOK_SECRET")
                    .map_err(|_| eyre!("PAYSTACK_WEBHOOK_SECRET must be set"))?
                    .into(),
            ),
        })
    }
}

#[derive(Debug, Clone)]
pub struct JwtInfo {
    pub secret: SecretString,
}

impl JwtInfo {
    pub fn from_env() -> Result<Self, Report> {
        let secret = env::var("JWT_SECRET").map_err(|_| eyre!("JWT_SECRET must be set"))?;
        if secret.len() < 32 {
            return Err(eyre!("JWT_SECRET must be at least 32 characters long"));
        }
        Ok(Self {
            secret: SecretString::new(secret.into()),
        })
    }
}

/// Bounded fallback loop used when no webhook reaches us: poll every few
/// seconds for as long as a checkout popup plausibly stays open.
#[derive(Debug, Clone)]
pub struct SettlementInfo {
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub reconciliation_sweep_interval: Duration,
    pub reconciliation_max_attempts: i32,
    pub default_rental_hours: i64,
}

impl SettlementInfo {
    pub fn from_env() -> Result<Self, Report> {
        Ok(Self {
            poll_interval: Duration::from_secs(
                env::var("SETTLEMENT_POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| "3".into())
                    .parse()?,
            ),
            poll_timeout: Duration::from_secs(
                env::var("SETTLEMENT_POLL_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "300".into())
                    .parse()?,
            ),
            reconciliation_sweep_interval: Duration::from_secs(
                env::var("RECONCILIATION_SWEEP_SECS")
                    .unwrap_or_else(|_| "60".into())
                    .parse()?,
            ),
            reconciliation_max_attempts: env::var("RECONCILIATION_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            default_rental_hours: env::var("DEFAULT_RENTAL_HOURS")
                .unwrap_or_else(|_| "48".into())
                .parse()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_url: String,
    pub jwt: JwtInfo,
    pub paystack: PaystackInfo,
    pub settlement: SettlementInfo,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Report> {
        Ok(Self {
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8080".into()),
            jwt: JwtInfo::from_env()?,
            paystack: PaystackInfo::from_env()?,
            settlement: SettlementInfo::from_env()?,
        })
    }
}
