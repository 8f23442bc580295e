//! Domain types for voxroute
//!
//! This module contains the core value types that flow through routing:
//! - Intent / ClassificationResult: what the classifier says about an utterance
//! - MedicalRecord / Organ: structured output of medical extraction
//! - HandlerResponse: the single type that leaves the router

pub mod intent;
pub mod medical;
pub mod response;

pub use intent::{ClassificationResult, Intent, RoutingHints};
pub use medical::{MedicalRecord, Organ};
pub use response::{
    ConversationResult, ErrorKind, ErrorResult, FallbackReason, FieldIssue, HandlerResponse, MedicalResult,
    NavigationResult, TOOL_DATA_KEY, ToolResult,
};
