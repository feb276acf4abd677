//! Payment initiation for the DJ movie catalog.
//!
//! Each invocation runs one provider flow end to end; nothing is persisted.

pub mod config;
pub mod payments;
