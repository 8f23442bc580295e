//! Domain configuration store
//!
//! Read-only data the handlers validate against: known pages, the medical
//! vocabulary, and the general tool registry. Built once, validated, then
//! shared behind an `Arc` and never mutated.
//!
//! # Example
//!
//! ```ignore
//! use voxroute::store::DomainStore;
//!
//! let store = DomainStore::builtin();
//! assert!(store.pages.lookup("home").is_some());
//! ```

mod medical;
mod pages;

pub use medical::{MedicalVocabulary, Term};
pub use pages::{PageEntry, PageMap};

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::tools::ToolCatalog;

/// All static domain data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainStore {
    pub pages: PageMap,
    pub medical: MedicalVocabulary,
    pub tools: ToolCatalog,
}

impl Default for DomainStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DomainStore {
    /// Built-in pages, GI vocabulary, and public-API tools
    pub fn builtin() -> Self {
        Self {
            pages: PageMap::builtin(),
            medical: MedicalVocabulary::builtin(),
            tools: ToolCatalog::builtin(),
        }
    }

    /// Load from YAML; sections left out keep their built-in values
    pub fn from_yaml(content: &str) -> Result<Self> {
        let store: Self = serde_yaml::from_str(content)
            .map_err(|e| RouterError::Config(format!("Failed to parse domain store: {}", e)))?;
        store.validate()?;
        Ok(store)
    }

    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RouterError::Config(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        let store = Self::from_yaml(&content)?;
        log::info!("Loaded domain store from: {}", path.as_ref().display());
        Ok(store)
    }

    pub fn validate(&self) -> Result<()> {
        self.pages.validate()?;
        self.medical.validate()?;
        self.tools.validate()?;
        Ok(())
    }

    /// Freeze for sharing between handlers
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
