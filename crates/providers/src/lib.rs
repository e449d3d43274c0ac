//! Completion provider implementations for the JTRADE auto-responder.
//!
//! All providers implement the `responder_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
