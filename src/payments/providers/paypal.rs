//! PayPal REST (v1 payments) provider
//!
//! Creates a `sale` payment with the `paypal` payment method. The payer still
//! has to approve it at the `approval_url` link in the response; executing the
//! approved payment is not part of this flow.

use crate::config::{self, ConfigSource, ProcessEnv};
use crate::payments::client::{GatewayClient, TokenGrant};
use crate::payments::error::PaymentResult;
use crate::payments::traits::PaymentGateway;
use crate::payments::types::{AccessToken, Credentials, Provider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.sandbox.paypal.com";
pub const TOKEN_PATH: &str = "/v1/oauth2/token";
pub const PAYMENT_PATH: &str = "/v1/payments/payment";

const DEFAULT_REDIRECT_URL: &str = "http://localhost:5173/";

/// PayPal provider configuration
#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub credentials: Credentials,
    pub base_url: String,
    pub return_url: String,
    pub cancel_url: String,
    /// Currency used when a request does not name one
    pub currency: String,
    pub description: String,
    pub timeout: Option<Duration>,
}

impl PaypalConfig {
    /// Create config from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl ConfigSource) -> PaymentResult<Self> {
        let config = Self {
            credentials: Credentials::new(
                config::required(source, "PAYPAL_CLIENT_ID")?,
                config::required(source, "PAYPAL_SECRET")?,
            ),
            base_url: config::optional_or(source, "PAYPAL_BASE_URL", DEFAULT_BASE_URL),
            return_url: config::optional_or(source, "PAYPAL_RETURN_URL", DEFAULT_REDIRECT_URL),
            cancel_url: config::optional_or(source, "PAYPAL_CANCEL_URL", DEFAULT_REDIRECT_URL),
            currency: config::optional_or(source, "PAYPAL_CURRENCY", "USD"),
            description: config::optional_or(
                source,
                "PAYPAL_DESCRIPTION",
                "Payment for Movie Tickets",
            ),
            timeout: config::timeout(source, "PAYPAL_TIMEOUT_SECS")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PaymentResult<()> {
        config::validate_url("PAYPAL_BASE_URL", &self.base_url)?;
        config::validate_url("PAYPAL_RETURN_URL", &self.return_url)?;
        config::validate_url("PAYPAL_CANCEL_URL", &self.cancel_url)?;
        Ok(())
    }

    /// A request carrying this config's defaults for `total`.
    pub fn request(&self, total: impl Into<String>) -> PaypalPaymentRequest {
        PaypalPaymentRequest {
            total: total.into(),
            currency: self.currency.clone(),
            description: self.description.clone(),
        }
    }
}

/// Per-invocation payment input. `total` is passed through as PayPal's
/// decimal string, e.g. `"10.00"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaypalPaymentRequest {
    pub total: String,
    pub currency: String,
    pub description: String,
}

/// Body of `POST /v1/payments/payment`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaypalPaymentPayload {
    pub intent: String,
    pub payer: Payer,
    pub transactions: Vec<Transaction>,
    pub redirect_urls: RedirectUrls,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payer {
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub amount: Amount,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Amount {
    pub total: String,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectUrls {
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(default)]
    pub method: Option<String>,
}

/// The parts of a created payment the caller acts on
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PaypalPayment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl PaypalPayment {
    pub fn from_body(body: &Value) -> Option<Self> {
        serde_json::from_value(body.clone()).ok()
    }

    /// Where the payer approves the payment
    pub fn approval_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "approval_url")
            .map(|link| link.href.as_str())
    }
}

/// PayPal payment-create gateway
pub struct PaypalGateway {
    config: PaypalConfig,
    client: GatewayClient,
}

impl PaypalGateway {
    pub fn new(config: PaypalConfig) -> PaymentResult<Self> {
        let client = GatewayClient::new(Provider::Paypal, config.timeout)?;
        Ok(Self { config, client })
    }

    /// Create gateway from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(PaypalConfig::from_env()?)
    }

    pub fn config(&self) -> &PaypalConfig {
        &self.config
    }
}

#[async_trait]
impl PaymentGateway for PaypalGateway {
    type Request = PaypalPaymentRequest;
    type Payload = PaypalPaymentPayload;

    fn provider(&self) -> Provider {
        Provider::Paypal
    }

    async fn acquire_token(&self) -> PaymentResult<AccessToken> {
        self.client
            .fetch_token(
                &config::endpoint(&self.config.base_url, TOKEN_PATH),
                &self.config.credentials,
                TokenGrant::FormBody,
            )
            .await
    }

    fn build_payload(&self, request: &PaypalPaymentRequest) -> PaypalPaymentPayload {
        PaypalPaymentPayload {
            intent: "sale".to_string(),
            payer: Payer {
                payment_method: "paypal".to_string(),
            },
            transactions: vec![Transaction {
                amount: Amount {
                    total: request.total.clone(),
                    currency: request.currency.clone(),
                },
                description: request.description.clone(),
            }],
            redirect_urls: RedirectUrls {
                return_url: self.config.return_url.clone(),
                cancel_url: self.config.cancel_url.clone(),
            },
        }
    }

    async fn submit(
        &self,
        token: &AccessToken,
        payload: &PaypalPaymentPayload,
    ) -> PaymentResult<Value> {
        if let Some(tx) = payload.transactions.first() {
            info!(
                "Creating PayPal payment: {} {}",
                tx.amount.total, tx.amount.currency
            );
        }

        let body = self
            .client
            .post_json(
                &config::endpoint(&self.config.base_url, PAYMENT_PATH),
                token,
                payload,
            )
            .await?;

        match PaypalPayment::from_body(&body) {
            Some(payment) => {
                info!(
                    "PayPal payment created: id={} state={}",
                    payment.id.as_deref().unwrap_or("-"),
                    payment.state.as_deref().unwrap_or("-")
                );
                match payment.approval_url() {
                    Some(url) => info!("PayPal approval URL: {}", url),
                    None => warn!("PayPal response had no approval_url link"),
                }
            }
            None => info!("PayPal payment response: {}", body),
        }

        Ok(body)
    }
}
