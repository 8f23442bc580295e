//! Medical extraction handler
//!
//! Keyword extraction over normalized word tokens. Matching runs in passes,
//! each pass consuming the tokens it matched so later passes cannot reuse
//! them:
//!
//! 1. exact site spellings, longest first
//! 2. organ keywords
//! 3. procedure and test spellings
//! 4. Jaro-Winkler site matching on what is left, only if pass 1 found nothing
//!
//! Identical text and vocabulary always give the identical record.

use std::cmp::Reverse;
use std::sync::Arc;

use log::debug;

use crate::domain::{FieldIssue, HandlerResponse, MedicalRecord, MedicalResult, Organ};
use crate::error::{Result, RouterError};
use crate::store::{DomainStore, Term};

/// Minimum Jaro-Winkler similarity for a typo'd site to count
pub const FUZZY_SITE_THRESHOLD: f64 = 0.90;

/// Shortest window (in characters) considered for fuzzy matching
const FUZZY_MIN_CHARS: usize = 4;

/// Extracts a [`MedicalRecord`] from dictated text
pub struct MedicalHandler {
    store: Arc<DomainStore>,
}

impl MedicalHandler {
    pub fn new(store: Arc<DomainStore>) -> Self {
        Self { store }
    }

    pub fn handle(&self, text: &str) -> HandlerResponse {
        match self.extract(text) {
            Ok(result) => HandlerResponse::Medical(result),
            Err(e) => e.into(),
        }
    }

    /// Extract and validate a record
    pub fn extract(&self, text: &str) -> Result<MedicalResult> {
        let vocab = &self.store.medical;
        let mut tokens = Tokens::new(text);

        let site_spellings = spellings(
            Organ::ALL
                .iter()
                .flat_map(|organ| vocab.sites.get(organ).into_iter().flatten().map(move |t| (*organ, t))),
        );

        let exact_sites = tokens.take_all(&site_spellings);
        let organ_hits = tokens.take_all(&keyword_spellings(vocab.organ_keywords.iter()));
        let procedures = tokens.take_all(&spellings(vocab.procedures.iter().map(|t| ((), t))));
        let tests = tokens.take_all(&spellings(vocab.tests.iter().map(|t| ((), t))));

        let explicit_organ = organ_hits.iter().min_by_key(|(pos, _)| *pos).map(|(_, organ)| *organ);

        // A site of the stated organ wins over an earlier site of the other one
        let site = match best_site(&exact_sites, explicit_organ).or_else(|| best_site(&exact_sites, None)) {
            Some(hit) => Some(hit),
            None => tokens.fuzzy(&site_spellings),
        };

        let organ = explicit_organ.or(site.map(|(organ, _)| organ)).ok_or_else(|| {
            RouterError::validation("organ", "could not determine organ (Upper GIT or Lower GIT) from the text")
        })?;

        let mut record = MedicalRecord::new(organ);
        let mut issues = Vec::new();

        match site {
            Some((site_organ, term)) if site_organ == organ => record.site = Some(term.name.clone()),
            Some((site_organ, term)) => {
                debug!("Dropping cross-organ site {} ({}) for {}", term.name, site_organ, organ);
                issues.push(FieldIssue::new(
                    "site",
                    format!("'{}' is a {} site, not valid for {}", term.name, site_organ, organ),
                ));
            }
            None => issues.push(FieldIssue::new("site", format!("no recognised {} site in the text", organ))),
        }

        record.procedure_types = procedures.into_iter().map(|(_, (_, t))| t.name.clone()).collect();
        record.test_types = tests.into_iter().map(|(_, (_, t))| t.name.clone()).collect();

        if record.site.is_some() {
            if record.procedure_types.is_empty()
                && let Some(default) = &vocab.default_procedure
            {
                record.procedure_types.insert(default.clone());
            }
            if record.test_types.is_empty()
                && let Some(default) = &vocab.default_test
            {
                record.test_types.insert(default.clone());
            }
        }

        Ok(MedicalResult::new(record, issues))
    }
}

/// Most specific exact site hit, earliest first, optionally of one organ only
fn best_site<'a>(hits: &[(usize, (Organ, &'a Term))], organ: Option<Organ>) -> Option<(Organ, &'a Term)> {
    hits.iter()
        .filter(|(_, (site_organ, _))| organ.is_none_or(|wanted| *site_organ == wanted))
        .min_by_key(|(pos, (_, term))| (term.generic, *pos))
        .map(|(_, hit)| *hit)
}

/// A spelling split into tokens, tagged with what it stands for
struct Spelling<K> {
    key: K,
    words: Vec<String>,
}

/// Term spellings ordered longest first; ties keep vocabulary order
fn spellings<'a, T: Copy + 'a>(terms: impl Iterator<Item = (T, &'a Term)>) -> Vec<Spelling<(T, &'a Term)>> {
    let mut out: Vec<_> = terms
        .flat_map(|(tag, term)| {
            term.spellings().map(move |s| Spelling {
                key: (tag, term),
                words: tokenize(s),
            })
        })
        .filter(|s| !s.words.is_empty())
        .collect();
    out.sort_by_key(|s| Reverse(s.words.len()));
    out
}

fn keyword_spellings<'a>(keywords: impl Iterator<Item = (&'a Organ, &'a Vec<String>)>) -> Vec<Spelling<Organ>> {
    let mut out: Vec<_> = keywords
        .flat_map(|(organ, words)| {
            words.iter().map(move |k| Spelling {
                key: *organ,
                words: tokenize(k),
            })
        })
        .filter(|s| !s.words.is_empty())
        .collect();
    out.sort_by_key(|s| Reverse(s.words.len()));
    out
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

/// Utterance tokens plus which of them earlier passes consumed
struct Tokens {
    words: Vec<String>,
    used: Vec<bool>,
}

impl Tokens {
    fn new(text: &str) -> Self {
        let words = tokenize(text);
        let used = vec![false; words.len()];
        Self { words, used }
    }

    fn free(&self, pos: usize, len: usize) -> bool {
        !self.used[pos..pos + len].iter().any(|u| *u)
    }

    fn consume(&mut self, pos: usize, len: usize) {
        self.used[pos..pos + len].iter_mut().for_each(|u| *u = true);
    }

    fn find(&self, needle: &[String]) -> Option<usize> {
        if needle.len() > self.words.len() {
            return None;
        }
        (0..=self.words.len() - needle.len())
            .find(|&pos| self.free(pos, needle.len()) && self.words[pos..pos + needle.len()] == *needle)
    }

    /// Consume every exact occurrence of every spelling, returning
    /// `(position, key)` per occurrence
    fn take_all<K: Copy>(&mut self, spellings: &[Spelling<K>]) -> Vec<(usize, K)> {
        let mut hits = Vec::new();
        for spelling in spellings {
            while let Some(pos) = self.find(&spelling.words) {
                self.consume(pos, spelling.words.len());
                hits.push((pos, spelling.key));
            }
        }
        hits
    }

    /// Best fuzzy match among free windows; first in vocabulary order wins ties
    fn fuzzy<K: Copy>(&mut self, spellings: &[Spelling<K>]) -> Option<K> {
        let mut best: Option<(f64, usize, usize, K)> = None;

        for spelling in spellings {
            let n = spelling.words.len();
            if n > self.words.len() {
                continue;
            }
            let target = spelling.words.join(" ");
            for pos in 0..=self.words.len() - n {
                if !self.free(pos, n) {
                    continue;
                }
                let window = self.words[pos..pos + n].join(" ");
                if window.chars().count() < FUZZY_MIN_CHARS {
                    continue;
                }
                let score = strsim::jaro_winkler(&window, &target);
                if score >= FUZZY_SITE_THRESHOLD && best.is_none_or(|(b, ..)| score > b) {
                    best = Some((score, pos, n, spelling.key));
                }
            }
        }

        best.map(|(score, pos, n, key)| {
            debug!("Fuzzy site match {:?} scored {:.3}", self.words[pos..pos + n].join(" "), score);
            self.consume(pos, n);
            key
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    fn handler() -> MedicalHandler {
        MedicalHandler::new(DomainStore::builtin().shared())
    }

    fn extract(text: &str) -> MedicalResult {
        handler().extract(text).unwrap()
    }

    #[test]
    fn test_upper_gi_biopsy() {
        let result = extract("Gastroscopy, biopsy from the antrum for histology and CLO test");
        assert_eq!(result.record.organ, Organ::UpperGit);
        assert_eq!(result.record.site.as_deref(), Some("Antrum"));
        assert!(result.record.procedure_types.contains("Biopsy"));
        assert!(result.record.test_types.contains("Histopathology"));
        assert!(result.record.test_types.contains("Rapid urease test"));
        assert!(result.complete);
    }

    #[test]
    fn test_organ_inferred_from_site() {
        let result = extract("polyp from the sigmoid colon");
        assert_eq!(result.record.organ, Organ::LowerGit);
        assert_eq!(result.record.site.as_deref(), Some("Sigmoid colon"));
        assert_eq!(result.record.procedure_types.iter().collect::<Vec<_>>(), vec!["Polypectomy"]);
    }

    #[test]
    fn test_defaults_when_only_site_given() {
        let result = extract("terminal ileum");
        assert_eq!(result.record.site.as_deref(), Some("Terminal ileum"));
        assert!(result.record.procedure_types.contains("Biopsy"));
        assert!(result.record.test_types.contains("Histopathology"));
    }

    #[test]
    fn test_cross_organ_site_rejected() {
        let result = extract("upper GI endoscopy, biopsy from the sigmoid colon");
        assert_eq!(result.record.organ, Organ::UpperGit);
        assert!(result.record.site.is_none());
        assert!(!result.complete);
        assert_eq!(result.issues[0].field, "site");
        assert!(result.issues[0].reason.contains("Sigmoid colon"));
    }

    #[test]
    fn test_site_of_stated_organ_beats_earlier_foreign_site() {
        let result = extract("previous sigmoid polyp; now gastroscopy, biopsy from the antrum");
        assert_eq!(result.record.organ, Organ::UpperGit);
        assert_eq!(result.record.site.as_deref(), Some("Antrum"));
        assert!(result.issues.is_empty());
        assert!(result.complete);

        let result = extract("antrum looked normal; colonoscopy with biopsy of the rectum");
        assert_eq!(result.record.organ, Organ::LowerGit);
        assert_eq!(result.record.site.as_deref(), Some("Rectum"));
    }

    #[test]
    fn test_generic_site_loses_to_specific() {
        let result = extract("stomach biopsy from the pylorus");
        assert_eq!(result.record.site.as_deref(), Some("Pylorus"));

        let result = extract("stomach biopsy");
        assert_eq!(result.record.site.as_deref(), Some("Gastric"));
    }

    #[test]
    fn test_fuzzy_site() {
        let result = extract("colonoscopy biopsy from the caecm");
        assert_eq!(result.record.site.as_deref(), Some("Caecum"));
        assert_eq!(result.record.organ, Organ::LowerGit);
    }

    #[test]
    fn test_fuzzy_does_not_invent_sites() {
        let result = extract("colonoscopy with samples taken for culture");
        assert!(result.record.site.is_none());
        assert!(!result.complete);
        assert!(result.record.test_types.contains("Microbiology/Culture"));
    }

    #[test]
    fn test_no_organ_is_validation_failure() {
        let response = handler().handle("please send this for cytology");
        match response {
            HandlerResponse::Error(e) => {
                assert_eq!(e.kind, ErrorKind::ValidationFailure);
                assert_eq!(e.field.as_deref(), Some("organ"));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_site_always_valid_for_organ() {
        let store = DomainStore::builtin();
        for text in [
            "biopsy antrum",
            "colonoscopy rectum",
            "gastroscopy rectal biopsy",
            "lower gi duodenal bulb",
            "egd oesophagus brushings cytology",
            "hepatic flexure emr",
        ] {
            let result = extract(text);
            if let Some(site) = &result.record.site {
                assert!(store.medical.is_valid_site(result.record.organ, site), "{text}: {site}");
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "OGD: biopsies from D2 and antral brushing, send for histopathology";
        let first = extract(text);
        for _ in 0..5 {
            assert_eq!(extract(text), first);
        }
        assert_eq!(first.record.site.as_deref(), Some("Duodenum 2nd part"));
    }
}
