//! HTTP plumbing shared by the gateway providers
//!
//! Each provider owns one [`GatewayClient`]. It performs the OAuth2
//! client-credentials exchange and the bearer-authenticated JSON submission,
//! mapping every failure into the provider's [`PaymentError`] variant. No
//! retries: one call per step.

use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::{AccessToken, Credentials, Provider};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

const GRANT_CLIENT_CREDENTIALS: &str = "grant_type=client_credentials";

/// How the `grant_type` parameter reaches the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenGrant {
    /// `GET` with `?grant_type=client_credentials` (M-Pesa)
    Query,
    /// `POST` with a form-encoded body (PayPal)
    FormBody,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<Value>,
}

pub struct GatewayClient {
    provider: Provider,
    http: Client,
}

impl GatewayClient {
    /// Build a client. `timeout` of `None` means calls wait indefinitely.
    pub fn new(provider: Provider, timeout: Option<Duration>) -> PaymentResult<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            "djmovie-pay/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder.build().map_err(|e| {
            PaymentError::config(format!("Failed to create HTTP client for {}: {}", provider, e))
        })?;

        Ok(Self { provider, http })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Exchange client credentials for a bearer token.
    pub async fn fetch_token(
        &self,
        token_url: &str,
        credentials: &Credentials,
        grant: TokenGrant,
    ) -> PaymentResult<AccessToken> {
        debug!("Requesting {} access token from {}", self.provider, token_url);

        let request = match grant {
            TokenGrant::Query => self
                .http
                .get(format!("{}?{}", token_url, GRANT_CLIENT_CREDENTIALS)),
            TokenGrant::FormBody => self
                .http
                .post(token_url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(GRANT_CLIENT_CREDENTIALS),
        };

        let response = request
            .header(AUTHORIZATION, credentials.basic_auth_header())
            .send()
            .await
            .map_err(|e| {
                error!("Error getting {} access token: {}", self.provider, e);
                PaymentError::auth_transport(self.provider, &e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(
                "Error reading {} token response (HTTP {}): {}",
                self.provider, status, e
            );
            PaymentError::auth_body_read(self.provider, status.as_u16(), &e)
        })?;

        if !status.is_success() {
            error!(
                "Error getting {} access token: HTTP {}: {}",
                self.provider, status, body
            );
            return Err(PaymentError::auth_rejected(self.provider, status.as_u16(), body));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse {} token response: {}", self.provider, e);
            PaymentError::malformed_token(self.provider, body.clone())
        })?;

        match parsed.access_token {
            Some(token) if !token.is_empty() => {
                let expires_in = parsed.expires_in.as_ref().and_then(parse_expires_in);
                info!(
                    "{} access token acquired (expires_in={:?})",
                    self.provider, expires_in
                );
                Ok(AccessToken::new(token, expires_in))
            }
            _ => {
                error!("{} token response had no access_token: {}", self.provider, body);
                Err(PaymentError::malformed_token(self.provider, body))
            }
        }
    }

    /// POST a JSON payload with the bearer token; any 2xx body comes back as-is.
    pub async fn post_json<T>(
        &self,
        url: &str,
        token: &AccessToken,
        payload: &T,
    ) -> PaymentResult<Value>
    where
        T: Serialize + ?Sized,
    {
        debug!("Submitting {} payment request to {}", self.provider, url);

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, token.bearer_header())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!("Error submitting {} payment: {}", self.provider, e);
                PaymentError::submission_transport(self.provider, &e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(
                "Error reading {} payment response (HTTP {}): {}",
                self.provider, status, e
            );
            PaymentError::submission_body_read(self.provider, status.as_u16(), &e)
        })?;

        if !status.is_success() {
            error!(
                "{} rejected payment request: HTTP {}: {}",
                self.provider, status, body
            );
            return Err(PaymentError::submission_rejected(
                self.provider,
                status.as_u16(),
                body,
            ));
        }

        Ok(serde_json::from_str(&body).unwrap_or_else(|_| Value::String(body)))
    }
}

/// M-Pesa reports `expires_in` as a string, PayPal as a number.
fn parse_expires_in(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
