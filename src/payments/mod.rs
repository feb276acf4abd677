//! Payment gateway integration module
//!
//! Single-shot payment initiation against M-Pesa STK Push and PayPal:
//! acquire a token, build the provider payload, submit it once.

pub mod client;
pub mod error;
pub mod flow;
pub mod providers;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, PaymentError, PaymentResult};
pub use flow::{FlowReport, FlowState};
pub use traits::PaymentGateway;
