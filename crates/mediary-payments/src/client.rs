//! Payment processor client
//!
//! Thin wrapper over the processor's REST API. Every call carries the API
//! key as a query parameter; non-2xx responses surface as
//! [`ApiError::Response`] with whatever message body the processor sent.

use mediary_types::Currency;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::PaymentsConfig;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The processor rejected the call
    #[error("payment API returned {status}: {message}")]
    Response { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Client for the upstream payment processor.
#[derive(Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    config: PaymentsConfig,
}

impl PaymentClient {
    pub fn new(config: PaymentsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Ask the processor for a deposit address to receive `amount`.
    /// `callback` is hit by the processor when the deposit confirms.
    pub async fn request_payment(
        &self,
        currency: Currency,
        amount: Decimal,
        callback: Option<&str>,
    ) -> ApiResult<Value> {
        let payload = request_payment_payload(currency, amount, callback);
        self.call(Method::POST, "/payments/request", Some(payload))
            .await
    }

    /// Tell the processor to pay `amount` out to `address`. With
    /// `includes_fee` the network fee comes out of the amount itself.
    pub async fn send_payment(
        &self,
        currency: Currency,
        address: &str,
        amount: Decimal,
        includes_fee: bool,
    ) -> ApiResult<Value> {
        let payload = send_payment_payload(currency, address, amount, includes_fee);
        self.call(Method::POST, "/payments/send", Some(payload)).await
    }

    /// Current processor-side balance for a currency.
    pub async fn check_balance(&self, currency: Currency) -> ApiResult<Value> {
        let path = format!("/balance/{}", currency.code());
        self.call(Method::GET, &path, None).await
    }

    /// Rotate the processor session.
    pub async fn refresh_auth(&self) -> ApiResult<Value> {
        self.call(Method::POST, "/auth/refresh", None).await
    }

    async fn call(&self, method: Method, path: &str, payload: Option<Value>) -> ApiResult<Value> {
        let url = format!("{}{}", self.config.api_root.trim_end_matches('/'), path);

        debug!(%method, %url, "payment API call");

        let mut request = self
            .http
            .request(method, &url)
            .query(&[("api_key", self.config.api_key.as_str())]);

        if let Some(body) = payload {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Some endpoints answer with bare strings rather than JSON.
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if status.is_success() {
            Ok(body)
        } else {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());

            Err(ApiError::Response {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn request_payment_payload(currency: Currency, amount: Decimal, callback: Option<&str>) -> Value {
    let mut payload = json!({
        "currency": currency.code(),
        "amount": amount.to_string(),
    });
    if let Some(callback) = callback {
        payload["callback"] = Value::String(callback.to_string());
    }
    payload
}

fn send_payment_payload(
    currency: Currency,
    address: &str,
    amount: Decimal,
    includes_fee: bool,
) -> Value {
    json!({
        "currency": currency.code(),
        "address": address,
        "amount": amount.to_string(),
        "includes_fee": includes_fee,
    })
}
