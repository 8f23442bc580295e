//! Known navigation targets

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, RouterError};

/// A named page and where it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl PageEntry {
    pub fn new(name: &str, url: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn matches(&self, normalized: &str) -> bool {
        self.name.eq_ignore_ascii_case(normalized) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(normalized))
    }
}

/// Static page map. Lookups are case-insensitive on name and aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageMap {
    pages: Vec<PageEntry>,
}

impl PageMap {
    pub fn new(pages: Vec<PageEntry>) -> Self {
        Self { pages }
    }

    /// Default pages of the assistant
    pub fn builtin() -> Self {
        Self::new(vec![
            PageEntry::new("home", "https://google.com", &["google", "home page"]),
            PageEntry::new("gemini", "https://gemini.google.com", &[]),
            PageEntry::new("profile", "/profile", &["my profile", "account"]),
            PageEntry::new("settings", "/settings", &["preferences"]),
            PageEntry::new("dashboard", "/dashboard", &[]),
        ])
    }

    /// Resolve a user-supplied page name
    pub fn lookup(&self, name: &str) -> Option<&PageEntry> {
        let normalized = name.trim();
        self.pages.iter().find(|p| p.matches(normalized))
    }

    /// First page whose name or alias appears as whole words in `text`.
    ///
    /// Longer spellings are tried first so "home page" wins over "home".
    pub fn find_in(&self, text: &str) -> Option<&PageEntry> {
        let words: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(String::from)
            .collect();

        let mut best: Option<(usize, usize, &PageEntry)> = None;
        for page in &self.pages {
            for spelling in std::iter::once(&page.name).chain(page.aliases.iter()) {
                let needle: Vec<String> = spelling.to_lowercase().split_whitespace().map(String::from).collect();
                if needle.is_empty() || needle.len() > words.len() {
                    continue;
                }
                if let Some(pos) = words.windows(needle.len()).position(|w| w == needle.as_slice()) {
                    let better = match best {
                        None => true,
                        Some((best_pos, best_len, _)) => pos < best_pos || (pos == best_pos && needle.len() > best_len),
                    };
                    if better {
                        best = Some((pos, needle.len(), page));
                    }
                }
            }
        }
        best.map(|(_, _, page)| page)
    }

    pub fn names(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &PageEntry> {
        self.pages.iter()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Every URL must be absolute http(s) or an app-relative path
    pub fn validate(&self) -> Result<()> {
        for page in &self.pages {
            if page.url.starts_with('/') {
                continue;
            }
            let parsed = Url::parse(&page.url)
                .map_err(|e| RouterError::Config(format!("page '{}' has invalid url '{}': {}", page.name, page.url, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(RouterError::Config(format!(
                    "page '{}' url must be http(s), got '{}'",
                    page.name,
                    parsed.scheme()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_case_insensitive() {
        let pages = PageMap::builtin();
        assert_eq!(pages.lookup("HOME").unwrap().url, "https://google.com");
        assert_eq!(pages.lookup("  Settings ").unwrap().url, "/settings");
        assert_eq!(pages.lookup("google").unwrap().name, "home");
        assert!(pages.lookup("nonexistent-page-xyz").is_none());
    }

    #[test]
    fn test_find_in_sentence() {
        let pages = PageMap::builtin();
        assert_eq!(pages.find_in("please open settings now").unwrap().name, "settings");
        assert_eq!(pages.find_in("Take me to Google!").unwrap().name, "home");
        assert_eq!(pages.find_in("go to the dashboard then profile").unwrap().name, "dashboard");
        assert!(pages.find_in("what's the weather").is_none());
    }

    #[test]
    fn test_find_in_requires_whole_words() {
        let pages = PageMap::builtin();
        assert!(pages.find_in("homework help").is_none());
    }

    #[test]
    fn test_builtin_urls_valid() {
        assert!(PageMap::builtin().validate().is_ok());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let pages = PageMap::new(vec![PageEntry::new("bad", "not a url", &[])]);
        assert!(matches!(pages.validate(), Err(RouterError::Config(_))));

        let pages = PageMap::new(vec![PageEntry::new("ftp", "ftp://example.com", &[])]);
        assert!(pages.validate().is_err());
    }
}
