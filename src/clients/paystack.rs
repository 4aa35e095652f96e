use crate::error::ApiError;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, warn};
use uuid::Uuid;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct PaystackClient {
    http: Client,
    base_url: Url,
    secret_key: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct InitializedCheckout {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Subset of Paystack's transaction verification payload the settlement
/// core cares about.
#[derive(Debug, Deserialize)]
pub struct VerifiedTransaction {
    pub status: String,
    pub reference: String,
    pub amount: i64,
    pub currency: String,
}

impl VerifiedTransaction {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn is_declared_failure(&self) -> bool {
        matches!(self.status.as_str(), "failed" | "abandoned" | "reversed")
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

impl PaystackClient {
    pub fn new(http: Client, base_url: &str, secret_key: SecretString) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|_| ApiError::Internal("Invalid Paystack base URL".into()))?;

        Ok(Self {
            http,
            base_url,
            secret_key,
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(path.split('/'));
        }
        url
    }

    /// POST with a bounded retry on transport failures only. A response from
    /// Paystack, success or rejection, is definitive and never retried.
    async fn post_with_retry(&self, url: Url, body: &Value) -> Result<reqwest::Response, ApiError> {
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self
                .http
                .post(url.clone())
                .bearer_auth(self.secret_key.expose_secret())
                .json(body)
                .send()
                .await
            {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    warn!(
                        "Paystack request to {} failed (attempt {}/{}): {}",
                        url.path(),
                        attempt,
                        MAX_ATTEMPTS,
                        e
                    );
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    }
                }
            }
        }
        Err(ApiError::Provider(format!(
            "Paystack unreachable: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<T, ApiError> {
        let status = resp.status();
        let body: Envelope<T> = resp.json().await.map_err(|e| {
            error!("Invalid Paystack {} response: {}", context, e);
            ApiError::Provider(format!("Invalid Paystack {} response", context))
        })?;

        if !status.is_success() || !body.status {
            return Err(ApiError::Provider(format!(
                "Paystack {} rejected: {}",
                context, body.message
            )));
        }

        body.data
            .ok_or_else(|| ApiError::Provider(format!("Paystack {} response missing data", context)))
    }

    pub async fn initialize_transaction(
        &self,
        email: &str,
        amount_kobo: i64,
        reference: Uuid,
        callback_url: &str,
        metadata: &Value,
    ) -> Result<InitializedCheckout, ApiError> {
        let url = self.endpoint("transaction/initialize");
        let body = serde_json::json!({
            "email": email,
            "amount": amount_kobo,
            "currency": "NGN",
            "reference": reference.to_string(),
            "callback_url": callback_url,
            "metadata": metadata,
        });

        let resp = self.post_with_retry(url, &body).await?;
        Self::parse(resp, "initialize").await
    }

    pub async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<VerifiedTransaction, ApiError> {
        let url = self.endpoint(&format!("transaction/verify/{}", reference));

        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self
                .http
                .get(url.clone())
                .bearer_auth(self.secret_key.expose_secret())
                .send()
                .await
            {
                Ok(resp) => return Self::parse(resp, "verify").await,
                Err(e) => {
                    warn!(
                        "Paystack verify failed (attempt {}/{}): {}",
                        attempt, MAX_ATTEMPTS, e
                    );
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    }
                }
            }
        }
        Err(ApiError::Provider(format!(
            "Paystack unreachable: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Full refund when `amount_kobo` is `None`, partial otherwise.
    pub async fn refund(
        &self,
        transaction_reference: &str,
        amount_kobo: Option<i64>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint("refund");
        let mut body = serde_json::json!({ "transaction": transaction_reference });
        if let Some(amount) = amount_kobo {
            body["amount"] = Value::from(amount);
        }

        let resp = self.post_with_retry(url, &body).await?;
        let _: Value = Self::parse(resp, "refund").await?;
        Ok(())
    }
}

/// Paystack signs webhook bodies with HMAC-SHA512 of the raw payload using the
/// account secret; comparison is constant-time.
pub fn verify_signature(secret: &str, payload: &[u8], actual_signature: &str) -> Result<(), ApiError> {
    use hmac::{Hmac, Mac};
    use sha2::Sha512;
    use subtle::ConstantTimeEq;

    type HmacSha512 = Hmac<Sha512>;

    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::Token("Invalid webhook secret".into()))?;

    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if expected
        .as_bytes()
        .ct_eq(actual_signature.as_bytes())
        .unwrap_u8()
        != 1
    {
        return Err(ApiError::BadRequest("Invalid Paystack signature".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip() {
        use hmac::{Hmac, Mac};
        use sha2::Sha512;

        let secret = "sk_test_secret";
        let payload = br#"{"event":"charge.success"}"#;

        let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_signature(secret, payload, &signature).is_ok());
    }

    #[test]
    fn signature_rejects_tampered_payload() {
        use hmac::{Hmac, Mac};
        use sha2::Sha512;

        let secret = "sk_test_secret";
        let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(br#"{"event":"charge.success","data":{"amount":5000}}"#);
        let signature = hex::encode(mac.finalize().into_bytes());

        let tampered = br#"{"event":"charge.success","data":{"amount":900000}}"#;
        assert!(verify_signature(secret, tampered, &signature).is_err());
    }

    #[test]
    fn signature_rejects_wrong_secret() {
        use hmac::{Hmac, Mac};
        use sha2::Sha512;

        let mut mac = Hmac::<Sha512>::new_from_slice(b"other_secret").unwrap();
        mac.update(b"payload");
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_signature("sk_test_secret", b"payload", &signature).is_err());
    }

    #[test]
    fn verified_transaction_status_mapping() {
        let tx = VerifiedTransaction {
            status: "success".into(),
            reference: "r".into(),
            amount: 5000,
            currency: "NGN".into(),
        };
        assert!(tx.is_success());
        assert!(!tx.is_declared_failure());

        let tx = VerifiedTransaction {
            status: "abandoned".into(),
            ..tx
        };
        assert!(!tx.is_success());
        assert!(tx.is_declared_failure());
    }
}
