//! Payment gateway implementations
//!
//! Concrete implementations of the PaymentGateway trait for each provider.

pub mod mpesa;
pub mod paypal;

pub use mpesa::MpesaGateway;
pub use paypal::PaypalGateway;
