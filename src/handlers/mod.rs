//! Domain handlers
//!
//! Each handler validates its own input against the [`DomainStore`](crate::store::DomainStore)
//! and always answers with a [`HandlerResponse`](crate::domain::HandlerResponse).

mod general;
mod medical;
mod navigation;

pub use general::{GeneralToolsHandler, validate_params};
pub use medical::{FUZZY_SITE_THRESHOLD, MedicalHandler};
pub use navigation::{BrowserLauncher, NavigationHandler, RecordingLauncher, SystemBrowser};
