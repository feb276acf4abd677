//! Single-shot payment initiation
//!
//! `START → TOKEN_ACQUIRED → PAYLOAD_BUILT → SUBMITTED → {SUCCESS | FAILED}`.
//! A flow never resumes after it fails and never acquires a second token.

use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::traits::PaymentGateway;
use crate::payments::types::Provider;
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Start,
    TokenAcquired,
    PayloadBuilt,
    Submitted,
    Success,
    Failed,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Success | FlowState::Failed)
    }

    pub fn can_transition_to(self, next: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, next),
            (Start, TokenAcquired)
                | (Start, Failed)
                | (TokenAcquired, PayloadBuilt)
                | (PayloadBuilt, Submitted)
                | (PayloadBuilt, Failed)
                | (Submitted, Success)
                | (Submitted, Failed)
        )
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Start => "START",
            FlowState::TokenAcquired => "TOKEN_ACQUIRED",
            FlowState::PayloadBuilt => "PAYLOAD_BUILT",
            FlowState::Submitted => "SUBMITTED",
            FlowState::Success => "SUCCESS",
            FlowState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Records the states a flow passes through and rejects illegal moves.
#[derive(Debug)]
pub struct FlowTracker {
    provider: Provider,
    states: Vec<FlowState>,
}

impl FlowTracker {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            states: vec![FlowState::Start],
        }
    }

    pub fn current(&self) -> FlowState {
        // `states` always starts with `Start`
        self.states.last().copied().unwrap_or(FlowState::Start)
    }

    /// Move to `next`. Returns `false` (and stays put) if the move is illegal.
    pub fn advance(&mut self, next: FlowState) -> bool {
        let current = self.current();
        if !current.can_transition_to(next) {
            error!(
                "{} flow: illegal transition {} -> {}",
                self.provider, current, next
            );
            return false;
        }
        debug!("{} flow: {} -> {}", self.provider, current, next);
        self.states.push(next);
        true
    }

    pub fn states(&self) -> &[FlowState] {
        &self.states
    }

    fn finish(self, outcome: PaymentResult<Value>) -> FlowReport {
        FlowReport {
            provider: self.provider,
            states: self.states,
            outcome,
        }
    }
}

/// Outcome of one flow invocation. Never persisted.
#[derive(Debug)]
pub struct FlowReport {
    pub provider: Provider,
    pub states: Vec<FlowState>,
    pub outcome: PaymentResult<Value>,
}

impl FlowReport {
    pub fn final_state(&self) -> FlowState {
        self.states.last().copied().unwrap_or(FlowState::Start)
    }

    pub fn is_success(&self) -> bool {
        self.final_state() == FlowState::Success
    }

    pub fn error(&self) -> Option<&PaymentError> {
        self.outcome.as_ref().err()
    }
}

/// Run acquire → build → submit once against `gateway`.
pub async fn run<G: PaymentGateway>(gateway: &G, request: &G::Request) -> FlowReport {
    let provider = gateway.provider();
    let mut tracker = FlowTracker::new(provider);
    info!("Starting {} payment flow", provider);

    let token = match gateway.acquire_token().await {
        Ok(token) => token,
        Err(e) => {
            error!("{} flow aborted before submission: {}", provider, e);
            tracker.advance(FlowState::Failed);
            return tracker.finish(Err(e));
        }
    };
    tracker.advance(FlowState::TokenAcquired);

    let payload = gateway.build_payload(request);
    tracker.advance(FlowState::PayloadBuilt);

    let outcome = gateway.submit(&token, &payload).await;
    match &outcome {
        Ok(_) => {
            tracker.advance(FlowState::Submitted);
            tracker.advance(FlowState::Success);
            info!("{} payment flow succeeded", provider);
        }
        Err(e) => {
            // A response (even a rejection) means the request left the process.
            if e.status().is_some() || e.body().is_some() {
                tracker.advance(FlowState::Submitted);
            }
            tracker.advance(FlowState::Failed);
            error!("{} payment flow failed: {}", provider, e);
        }
    }

    tracker.finish(outcome)
}
