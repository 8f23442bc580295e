//! General tool system - registry definitions, catalog loading, provider
//! seams, and payload normalization

mod catalog;
mod definition;
mod normalize;
mod provider;

pub use catalog::{ToolCatalog, placeholders};
pub use definition::{DEFAULT_TOOL_TIMEOUT_MS, HttpMethod, ParamSpec, ResponseKind, Tool};
pub use normalize::{RESOLVED_LOCATION_KEY, normalize, wmo_description};
pub use provider::{
    DataProvider, Geocoder, HttpDataProvider, MockProvider, ResolvedPlace, fill_template, param_to_string,
};
