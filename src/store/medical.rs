//! Medical vocabulary - valid anatomical sites per organ plus the keyword
//! lists the extractor matches against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Organ;
use crate::error::{Result, RouterError};

/// A canonical term with the spellings that map onto it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Generic terms lose to a more specific match (e.g. "Gastric" vs "Antrum")
    #[serde(default)]
    pub generic: bool,
}

impl Term {
    pub fn new(name: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            generic: false,
        }
    }

    fn generic(mut self) -> Self {
        self.generic = true;
        self
    }

    /// Canonical name followed by aliases
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(|a| a.as_str()))
    }
}

/// Vocabulary consumed by the medical extraction handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalVocabulary {
    pub sites: BTreeMap<Organ, Vec<Term>>,
    #[serde(default)]
    pub organ_keywords: BTreeMap<Organ, Vec<String>>,
    #[serde(default)]
    pub procedures: Vec<Term>,
    #[serde(default)]
    pub tests: Vec<Term>,
    #[serde(default)]
    pub default_procedure: Option<String>,
    #[serde(default)]
    pub default_test: Option<String>,
}

impl MedicalVocabulary {
    /// Valid site names for an organ, in configured order
    pub fn valid_sites(&self, organ: Organ) -> Vec<&str> {
        self.sites
            .get(&organ)
            .map(|terms| terms.iter().map(|t| t.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Exact (case-insensitive) membership check
    pub fn is_valid_site(&self, organ: Organ, site: &str) -> bool {
        self.sites
            .get(&organ)
            .is_some_and(|terms| terms.iter().any(|t| t.name.eq_ignore_ascii_case(site.trim())))
    }

    /// Reject empty lists and sites listed under both organs
    pub fn validate(&self) -> Result<()> {
        for organ in Organ::ALL {
            if self.valid_sites(organ).is_empty() {
                return Err(RouterError::Config(format!("no valid sites configured for {}", organ)));
            }
        }
        for site in self.valid_sites(Organ::UpperGit) {
            if self.is_valid_site(Organ::LowerGit, site) {
                return Err(RouterError::Config(format!(
                    "site '{}' is listed under both organs",
                    site
                )));
            }
        }
        Ok(())
    }

    /// Built-in GI vocabulary
    pub fn builtin() -> Self {
        let upper = vec![
            Term::new("Oesophagus", &["esophagus", "oesophageal", "esophageal", "gullet"]),
            Term::new(
                "Cardio-oesophageal junction",
                &[
                    "gastro-oesophageal junction",
                    "gastroesophageal junction",
                    "oesophagogastric junction",
                    "cardia",
                    "goj",
                    "gej",
                ],
            ),
            Term::new("Fundus", &["fundal"]),
            Term::new("Gastric", &["stomach"]).generic(),
            Term::new("Body", &["gastric body", "body of stomach"]),
            Term::new("Antrum", &["antral", "gastric antrum"]),
            Term::new("Pylorus", &["pyloric"]),
            Term::new(
                "Duodenum 1st part",
                &["d1", "duodenal bulb", "first part of duodenum", "duodenum first part"],
            ),
            Term::new(
                "Duodenum 2nd part",
                &["d2", "second part of duodenum", "duodenum second part"],
            ),
            Term::new("Small Bowel Biopsy", &["small bowel", "small intestine", "jejunum"]),
        ];

        let lower = vec![
            Term::new("Caecum", &["cecum", "caecal", "cecal"]),
            Term::new("Ascending colon", &[]),
            Term::new("Hepatic flexure", &[]),
            Term::new("Transverse colon", &[]),
            Term::new("Splenic flexure", &[]),
            Term::new("Descending colon", &[]),
            Term::new("Sigmoid colon", &["sigmoid"]),
            Term::new("Rectum", &["rectal"]),
            Term::new("Ileo-caecal valve", &["ileocaecal valve", "ileocecal valve"]),
            Term::new("Terminal ileum", &["terminal ileal", "ileum"]),
            Term::new(
                "Random colon, no rectum",
                &["random colon without rectum", "random colonic no rectum"],
            ),
            Term::new("Random colon with rectum", &["random colonic with rectum"]),
        ];

        let mut sites = BTreeMap::new();
        sites.insert(Organ::UpperGit, upper);
        sites.insert(Organ::LowerGit, lower);

        let mut organ_keywords = BTreeMap::new();
        organ_keywords.insert(
            Organ::UpperGit,
            [
                "upper git",
                "upper gi",
                "upper gastrointestinal",
                "upper endoscopy",
                "gastroscopy",
                "ogd",
                "egd",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        organ_keywords.insert(
            Organ::LowerGit,
            [
                "lower git",
                "lower gi",
                "lower gastrointestinal",
                "colonoscopy",
                "sigmoidoscopy",
                "large bowel",
                "lg bowel",
                "colonic",
                "colon",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );

        Self {
            sites,
            organ_keywords,
            procedures: vec![
                Term::new("Biopsy", &["biopsies", "bx", "sample", "samples", "specimen"]),
                Term::new("Polypectomy", &["polyp", "polyps"]),
                Term::new("Brushings", &["brushing", "brush"]),
                Term::new("Endoscopic mucosal resection", &["emr", "mucosal resection"]),
                Term::new("Aspirate", &["aspiration"]),
            ],
            tests: vec![
                Term::new("Histopathology", &["histology", "hpe", "histopath"]),
                Term::new("Microbiology/Culture", &["culture", "microbiology", "c s"]),
                Term::new("Cytology", &["cytological"]),
                Term::new(
                    "Rapid urease test",
                    &["rapid urease", "urease", "clo test", "h pylori", "helicobacter"],
                ),
            ],
            default_procedure: Some("Biopsy".to_string()),
            default_test: Some("Histopathology".to_string()),
        }
    }
}

impl Default for MedicalVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let vocab = MedicalVocabulary::builtin();
        assert!(vocab.validate().is_ok());
        assert_eq!(vocab.valid_sites(Organ::UpperGit).len(), 10);
        assert_eq!(vocab.valid_sites(Organ::LowerGit).len(), 12);
    }

    #[test]
    fn test_membership_is_per_organ() {
        let vocab = MedicalVocabulary::builtin();
        assert!(vocab.is_valid_site(Organ::UpperGit, "Antrum"));
        assert!(vocab.is_valid_site(Organ::UpperGit, "antrum"));
        assert!(!vocab.is_valid_site(Organ::LowerGit, "Antrum"));
        assert!(vocab.is_valid_site(Organ::LowerGit, "Sigmoid colon"));
        assert!(!vocab.is_valid_site(Organ::UpperGit, "Sigmoid colon"));
    }

    #[test]
    fn test_validate_rejects_shared_site() {
        let mut vocab = MedicalVocabulary::builtin();
        vocab
            .sites
            .get_mut(&Organ::LowerGit)
            .unwrap()
            .push(Term::new("Antrum", &[]));
        assert!(matches!(vocab.validate(), Err(RouterError::Config(_))));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let vocab = MedicalVocabulary::builtin();
        let yaml = serde_yaml::to_string(&vocab).unwrap();
        let parsed: MedicalVocabulary = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.valid_sites(Organ::UpperGit), vocab.valid_sites(Organ::UpperGit));
        assert!(parsed.sites[&Organ::UpperGit][3].generic);
    }
}
