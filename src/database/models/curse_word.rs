//! Curse word registry models.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How offensive a registered word is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Words inserted when the registry is found empty.
pub const DEFAULT_CURSE_WORDS: [(&str, Severity); 14] = [
    ("fuck", Severity::High),
    ("bitch", Severity::Medium),
    ("asshole", Severity::Medium),
    ("cunt", Severity::High),
    ("dick", Severity::Medium),
    ("niger", Severity::High),
    ("nigga", Severity::High),
    ("b1tch", Severity::Medium),
    ("pussy", Severity::Medium),
    ("cock", Severity::Medium),
    ("motherfucker", Severity::High),
    ("whore", Severity::Medium),
    ("slut", Severity::Medium),
    ("bastard", Severity::Low),
];

/// Canonical registry form of a word: trimmed and lower-cased.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// One registered curse word.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurseWordEntry {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Normalized word (see [`normalize_word`])
    pub word: String,

    #[serde(default)]
    pub severity: Severity,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub added_at: DateTime<Utc>,
}

impl CurseWordEntry {
    /// Create an entry stamped now. The word is normalized.
    pub fn new(word: &str, severity: Severity) -> Self {
        Self {
            id: None,
            word: normalize_word(word),
            severity,
            added_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("  FOO "), "foo");
        assert_eq!(normalize_word("\tBaStArD\n"), "bastard");
    }

    #[test]
    fn test_severity_parsing() {
        assert_eq!(Severity::from_str("HIGH"), Some(Severity::High));
        assert_eq!(Severity::from_str(" low "), Some(Severity::Low));
        assert_eq!(Severity::from_str("extreme"), None);
        assert_eq!(Severity::default().as_str(), "medium");
    }

    #[test]
    fn test_defaults_are_normalized_and_unique() {
        for (i, (word, _)) in DEFAULT_CURSE_WORDS.iter().enumerate() {
            assert_eq!(normalize_word(word), *word);
            assert!(!DEFAULT_CURSE_WORDS[i + 1..].iter().any(|(w, _)| w == word));
        }
    }
}
