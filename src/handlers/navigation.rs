//! Navigation handler - page name to URL, then one browser launch

use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::domain::{ErrorKind, ErrorResult, HandlerResponse, NavigationResult};
use crate::error::{Result, RouterError};
use crate::store::DomainStore;

/// Opens a URL in the user's browser
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Spawns the platform opener (`xdg-open`, `open`, or `start`)
#[derive(Debug, Clone, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(url: &str) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

/// Records URLs instead of opening them. Used for `--dry-run` and tests.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    opened: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every launch with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            failure: Some(reason.into()),
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl BrowserLauncher for RecordingLauncher {
    fn open(&self, url: &str) -> Result<()> {
        if let Some(reason) = &self.failure {
            return Err(RouterError::Io(std::io::Error::other(reason.clone())));
        }
        info!("Browser launch skipped: {}", url);
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(url.to_string());
        }
        Ok(())
    }
}

const NAV_VERBS: &[&str] = &["navigate to", "take me to", "go to", "open up", "open", "visit", "show me", "show"];

/// Resolves page names against the store and launches the browser
pub struct NavigationHandler {
    store: Arc<DomainStore>,
    launcher: Arc<dyn BrowserLauncher>,
    base_url: Option<String>,
}

impl NavigationHandler {
    pub fn new(store: Arc<DomainStore>, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            store,
            launcher,
            base_url: None,
        }
    }

    /// Origin prepended to app-relative paths when launching
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Navigate to a named page
    pub fn handle(&self, name: &str) -> HandlerResponse {
        let requested = name.trim();
        let Some(page) = self.store.pages.lookup(requested) else {
            info!("Navigation target not found: {:?}", requested);
            return RouterError::UnresolvedTarget(requested.to_string()).into();
        };

        let launch_url = self.launch_url(&page.url);
        match self.launcher.open(&launch_url) {
            Ok(()) => {
                info!("Navigated to {} ({})", page.name, launch_url);
                HandlerResponse::Navigation(NavigationResult::new(&page.name, &page.url))
            }
            Err(e) => {
                warn!("Browser launch failed for {}: {}", launch_url, e);
                HandlerResponse::Error(ErrorResult::new(
                    ErrorKind::ProviderFailure,
                    format!("Failed to open browser: {}", e),
                ))
            }
        }
    }

    /// Pick the page name out of a free-form utterance
    pub fn resolve_target(&self, utterance: &str) -> String {
        if let Some(page) = self.store.pages.find_in(utterance) {
            return page.name.clone();
        }

        let lowered = utterance.trim().to_lowercase();
        let phrase = NAV_VERBS
            .iter()
            .filter_map(|verb| find_word(&lowered, verb).map(|pos| &lowered[pos + verb.len()..]))
            .next()
            .unwrap_or(&lowered);

        clean_target(phrase)
    }

    fn launch_url(&self, url: &str) -> String {
        match (&self.base_url, url.starts_with('/')) {
            (Some(base), true) => format!("{}{}", base.trim_end_matches('/'), url),
            _ => url.to_string(),
        }
    }
}

/// Byte offset of `needle` in `haystack` on word boundaries
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).map(|(pos, _)| pos).find(|&pos| {
        let before = haystack[..pos].chars().next_back();
        let after = haystack[pos + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Drop articles, possessives and a trailing "page"
fn clean_target(phrase: &str) -> String {
    let mut words: Vec<&str> = phrase
        .split(|c: char| c.is_whitespace() || matches!(c, '.' | ',' | '!' | '?'))
        .filter(|w| !w.is_empty())
        .collect();
    while matches!(words.first(), Some(&("the" | "my" | "a" | "to"))) {
        words.remove(0);
    }
    while matches!(words.last(), Some(&("page" | "please" | "site" | "website"))) {
        words.pop();
    }
    words.join(" ")
}
