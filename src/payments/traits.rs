//! Payment gateway trait definitions
//!
//! Defines the three steps every gateway exposes so the flow driver can run
//! them in order.

use crate::payments::error::PaymentResult;
use crate::payments::types::{AccessToken, Provider};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Trait for payment gateway implementations
///
/// Both M-Pesa and PayPal implement this trait. The steps are independent so
/// each one can be exercised on its own; [`crate::payments::flow::run`] wires
/// them into a single-shot initiation.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Per-invocation input (payer, amount, ...)
    type Request: Send + Sync;

    /// Provider-shaped JSON body
    type Payload: Serialize + Send + Sync;

    fn provider(&self) -> Provider;

    /// Exchange the configured client credentials for a bearer token
    async fn acquire_token(&self) -> PaymentResult<AccessToken>;

    /// Build the provider payload for `request`, stamped with the current time
    /// where the provider needs one.
    fn build_payload(&self, request: &Self::Request) -> Self::Payload;

    /// POST the payload to the transaction endpoint and return the raw body
    async fn submit(&self, token: &AccessToken, payload: &Self::Payload) -> PaymentResult<Value>;
}
