//! Lorem provider module
//!
//! Offline provider for development and tests; needs no credentials.

mod provider;

pub use provider::LoremProvider;
