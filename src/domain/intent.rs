//! Intent labels and classifier output
//!
//! The classifier speaks in free-form string labels; everything past the
//! parse step works with the closed [`Intent`] set.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discrete category of user request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Navigation,
    Medical,
    GeneralTools,
    GeneralConversation,
}

impl Intent {
    /// Map a classifier label onto the closed set.
    ///
    /// Unknown labels become `GeneralConversation`; `known` is false for them
    /// so callers can tell a deliberate "general" apart from garbage.
    pub fn from_label(label: &str) -> (Self, bool) {
        match label.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "navigation" | "navigate" => (Self::Navigation, true),
            "medical" => (Self::Medical, true),
            "general_tools" | "tools" => (Self::GeneralTools, true),
            "general_conversation" | "general" | "conversation" => (Self::GeneralConversation, true),
            _ => (Self::GeneralConversation, false),
        }
    }

    /// Wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Medical => "medical",
            Self::GeneralTools => "general_tools",
            Self::GeneralConversation => "general_conversation",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional argument hints a classifier may return alongside the label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingHints {
    /// Page or site name for navigation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Registry tool name for general tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Tool parameters
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

/// Output of a single classification call
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub intent: Intent,
    /// Always within [0, 1]
    pub confidence: f64,
    /// Raw label as returned by the classifier
    pub label: String,
    /// False when `label` was outside the known set
    pub recognized: bool,
    pub hints: RoutingHints,
}

impl ClassificationResult {
    /// Build from a raw label and score, clamping the score into [0, 1]
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        let label = label.into();
        let (intent, recognized) = Intent::from_label(&label);
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self {
            intent,
            confidence,
            label,
            recognized,
            hints: RoutingHints::default(),
        }
    }

    /// Attach argument hints
    pub fn with_hints(mut self, hints: RoutingHints) -> Self {
        self.hints = hints;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_known() {
        assert_eq!(Intent::from_label("navigation"), (Intent::Navigation, true));
        assert_eq!(Intent::from_label("Medical"), (Intent::Medical, true));
        assert_eq!(Intent::from_label("general_tools"), (Intent::GeneralTools, true));
        assert_eq!(Intent::from_label("general-tools"), (Intent::GeneralTools, true));
        assert_eq!(Intent::from_label("general"), (Intent::GeneralConversation, true));
    }

    #[test]
    fn test_from_label_unknown_falls_back() {
        assert_eq!(Intent::from_label("shopping"), (Intent::GeneralConversation, false));
        assert_eq!(Intent::from_label(""), (Intent::GeneralConversation, false));
    }

    #[test]
    fn test_intent_serialization() {
        assert_eq!(serde_json::to_string(&Intent::GeneralTools).unwrap(), "\"general_tools\"");
        let intent: Intent = serde_json::from_str("\"medical\"").unwrap();
        assert_eq!(intent, Intent::Medical);
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(ClassificationResult::new("medical", 1.7).confidence, 1.0);
        assert_eq!(ClassificationResult::new("medical", -0.2).confidence, 0.0);
        assert_eq!(ClassificationResult::new("medical", f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_unrecognized_label_kept() {
        let result = ClassificationResult::new("weather_report", 0.95);
        assert_eq!(result.intent, Intent::GeneralConversation);
        assert!(!result.recognized);
        assert_eq!(result.label, "weather_report");
    }
}
