//! Voxroute - confidence-gated intent routing for voice assistants
//!
//! A transcribed utterance is classified once, gated on the classifier's
//! confidence, and handed to exactly one domain handler: navigation, medical
//! extraction, or a registry of external data tools. Everything else falls
//! back to general conversation. Every outcome is a flat JSON
//! [`HandlerResponse`](domain::HandlerResponse).

pub mod classifier;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod router;
pub mod store;
pub mod tools;

pub use error::{Result, RouterError};
pub use router::{MasterRouter, RouterSettings};
