//! Per-user warning state embedded in a guild document.

use serde::{Deserialize, Serialize};

/// Warning history of one user in one guild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarningRecord {
    /// Number of warnings since the last reset
    #[serde(default)]
    pub count: u32,

    /// Word that triggered the most recent warning
    #[serde(default)]
    pub last_curse: String,

    /// Unix timestamp of the most recent warning
    #[serde(default)]
    pub last_warning_time: i64,

    /// Every matched word, oldest first
    #[serde(default)]
    pub curse_words: Vec<String>,
}

impl WarningRecord {
    /// Record with no warnings yet; only exists transiently before `record`.
    pub(crate) fn empty() -> Self {
        Self {
            count: 0,
            last_curse: String::new(),
            last_warning_time: 0,
            curse_words: Vec::new(),
        }
    }

    /// Register one more warning for `word` at `at`.
    pub fn record(&mut self, word: &str, at: i64) {
        self.count += 1;
        self.last_curse = word.to_string();
        self.last_warning_time = at;
        self.curse_words.push(word.to_string());
    }
}
