//! Structured clinical record produced by medical extraction

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Organ class of the gastrointestinal tract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Organ {
    #[serde(rename = "Upper GIT")]
    UpperGit,
    #[serde(rename = "Lower GIT")]
    LowerGit,
}

impl Organ {
    pub const ALL: [Organ; 2] = [Organ::UpperGit, Organ::LowerGit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Organ::UpperGit => "Upper GIT",
            Organ::LowerGit => "Lower GIT",
        }
    }

    /// Parse the display name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "upper git" | "upper gi" | "upper" => Some(Organ::UpperGit),
            "lower git" | "lower gi" | "lower" => Some(Organ::LowerGit),
            _ => None,
        }
    }
}

impl std::fmt::Display for Organ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clinical record. `site`, when set, belongs to `organ`'s valid-site list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub organ: Organ,
    pub site: Option<String>,
    pub procedure_types: BTreeSet<String>,
    pub test_types: BTreeSet<String>,
}

impl MedicalRecord {
    pub fn new(organ: Organ) -> Self {
        Self {
            organ,
            site: None,
            procedure_types: BTreeSet::new(),
            test_types: BTreeSet::new(),
        }
    }
}
