//! M-Pesa (Safaricom Daraja) STK Push provider
//!
//! Sends a Lipa na M-Pesa Online prompt to the payer's phone. The flow is the
//! usual two calls: a client-credentials token from `/oauth/v1/generate`
//! followed by `/mpesa/stkpush/v1/processrequest`.

use crate::config::{self, ConfigSource, ProcessEnv};
use crate::payments::client::{GatewayClient, TokenGrant};
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::traits::PaymentGateway;
use crate::payments::types::{AccessToken, Credentials, Provider, Secret};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
pub const TOKEN_PATH: &str = "/oauth/v1/generate";
pub const STK_PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";
pub const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

/// M-Pesa provider configuration
#[derive(Debug, Clone)]
pub struct MpesaConfig {
    /// Daraja consumer key/secret
    pub credentials: Credentials,
    pub base_url: String,
    /// Paybill/till number receiving the payment
    pub business_shortcode: String,
    /// Lipa na M-Pesa Online passkey
    pub passkey: Secret,
    /// Where Safaricom posts the transaction result
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
    pub timeout: Option<Duration>,
}

impl MpesaConfig {
    /// Create config from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl ConfigSource) -> PaymentResult<Self> {
        let config = Self {
            credentials: Credentials::new(
                config::required(source, "CONSUMER_KEY")?,
                config::required(source, "CONSUMER_SECRET")?,
            ),
            base_url: config::optional_or(source, "MPESA_BASE_URL", DEFAULT_BASE_URL),
            business_shortcode: config::required(source, "BUSINESS_SHORTCODE")?,
            passkey: Secret::new(config::required(source, "PASSKEY")?),
            callback_url: config::required(source, "CALLBACK_URL")?,
            account_reference: config::optional_or(
                source,
                "MPESA_ACCOUNT_REFERENCE",
                "MoviePayment",
            ),
            transaction_desc: config::optional_or(
                source,
                "MPESA_TRANSACTION_DESC",
                "Payment for movie access",
            ),
            timeout: config::timeout(source, "MPESA_TIMEOUT_SECS")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PaymentResult<()> {
        config::validate_url("MPESA_BASE_URL", &self.base_url)?;
        config::validate_url("CALLBACK_URL", &self.callback_url)?;
        if self.business_shortcode.trim().is_empty() {
            return Err(PaymentError::config("BUSINESS_SHORTCODE cannot be empty"));
        }
        if self.passkey.is_empty() {
            return Err(PaymentError::config("PASSKEY cannot be empty"));
        }
        Ok(())
    }
}

/// `YYYYMMDDHHMMSS`, the only timestamp shape Daraja accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpesaTimestamp(String);

impl MpesaTimestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format("%Y%m%d%H%M%S").to_string())
    }

    /// Accepts exactly 14 ASCII digits.
    pub fn parse(raw: &str) -> PaymentResult<Self> {
        if raw.len() == 14 && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(PaymentError::config(format!(
                "timestamp must be 14 digits (YYYYMMDDHHMMSS), got {:?}",
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MpesaTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// STK Push password: `base64(shortcode + passkey + timestamp)`
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &MpesaTimestamp) -> String {
    STANDARD.encode(format!("{}{}{}", shortcode, passkey, timestamp.as_str()))
}

/// Per-invocation STK Push input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StkPushRequest {
    /// MSISDN in the form Daraja expects, e.g. `2547XXXXXXXX`. Not validated.
    pub phone_number: String,
    /// Sent as-is; Daraja decides whether it is acceptable.
    pub amount: Number,
}

impl StkPushRequest {
    pub fn new(phone_number: impl Into<String>, amount: impl Into<Number>) -> Self {
        Self {
            phone_number: phone_number.into(),
            amount: amount.into(),
        }
    }
}

/// Read any JSON number (`100`, `-5`, `10.5`) as an STK Push amount.
pub fn parse_amount(raw: &str) -> PaymentResult<Number> {
    serde_json::from_str(raw.trim())
        .map_err(|_| PaymentError::config(format!("amount must be a number, got {:?}", raw)))
}

/// Body of `POST /mpesa/stkpush/v1/processrequest`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    pub amount: Number,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

/// Synchronous acknowledgement returned by the STK Push endpoint
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StkPushAcknowledgement {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: Option<String>,
    #[serde(rename = "ResponseCode", default)]
    pub response_code: Option<String>,
    #[serde(rename = "ResponseDescription", default)]
    pub response_description: Option<String>,
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: Option<String>,
}

impl StkPushAcknowledgement {
    pub fn from_body(body: &Value) -> Option<Self> {
        serde_json::from_value(body.clone()).ok()
    }

    /// `ResponseCode == "0"`: the prompt was sent to the phone.
    pub fn is_accepted(&self) -> bool {
        self.response_code.as_deref() == Some("0")
    }
}

/// M-Pesa STK Push gateway
pub struct MpesaGateway {
    config: MpesaConfig,
    client: GatewayClient,
}

impl MpesaGateway {
    pub fn new(config: MpesaConfig) -> PaymentResult<Self> {
        let client = GatewayClient::new(Provider::Mpesa, config.timeout)?;
        Ok(Self { config, client })
    }

    /// Create gateway from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(MpesaConfig::from_env()?)
    }

    pub fn config(&self) -> &MpesaConfig {
        &self.config
    }

    /// Build the payload for a fixed timestamp. [`PaymentGateway::build_payload`]
    /// calls this with the current time.
    pub fn build_payload_at(
        &self,
        request: &StkPushRequest,
        timestamp: &MpesaTimestamp,
    ) -> StkPushPayload {
        let shortcode = &self.config.business_shortcode;

        StkPushPayload {
            business_short_code: shortcode.clone(),
            password: stk_password(shortcode, self.config.passkey.expose(), timestamp),
            timestamp: timestamp.to_string(),
            transaction_type: TRANSACTION_TYPE.to_string(),
            amount: request.amount.clone(),
            party_a: request.phone_number.clone(),
            party_b: shortcode.clone(),
            phone_number: request.phone_number.clone(),
            callback_url: self.config.callback_url.clone(),
            account_reference: self.config.account_reference.clone(),
            transaction_desc: self.config.transaction_desc.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for MpesaGateway {
    type Request = StkPushRequest;
    type Payload = StkPushPayload;

    fn provider(&self) -> Provider {
        Provider::Mpesa
    }

    async fn acquire_token(&self) -> PaymentResult<AccessToken> {
        self.client
            .fetch_token(
                &config::endpoint(&self.config.base_url, TOKEN_PATH),
                &self.config.credentials,
                TokenGrant::Query,
            )
            .await
    }

    fn build_payload(&self, request: &StkPushRequest) -> StkPushPayload {
        self.build_payload_at(request, &MpesaTimestamp::now())
    }

    async fn submit(&self, token: &AccessToken, payload: &StkPushPayload) -> PaymentResult<Value> {
        info!(
            "Sending M-Pesa STK push: amount={} shortcode={} reference={}",
            payload.amount, payload.business_short_code, payload.account_reference
        );

        let body = self
            .client
            .post_json(
                &config::endpoint(&self.config.base_url, STK_PUSH_PATH),
                token,
                payload,
            )
            .await?;

        match StkPushAcknowledgement::from_body(&body) {
            Some(ack) => info!(
                "STK push response: code={} checkout_request_id={} description={}",
                ack.response_code.as_deref().unwrap_or("-"),
                ack.checkout_request_id.as_deref().unwrap_or("-"),
                ack.response_description.as_deref().unwrap_or("-"),
            ),
            None => info!("STK push response: {}", body),
        }

        Ok(body)
    }
}
