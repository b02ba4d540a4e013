//! Crisis-phrase detector.
//!
//! A conservative, best-effort filter: case-insensitive substring
//! containment against a fixed phrase list, no stemming or partial
//! matching. False negatives are possible (novel phrasings pass through);
//! false positives degrade to the fixed safety message, never a silent
//! failure.

/// Scans free text for configured risk phrases. Phrase list is set at
/// construction and read-only thereafter.
#[derive(Debug, Clone)]
pub struct CrisisDetector {
    phrases: Vec<String>,
}

impl CrisisDetector {
    /// Phrases are stored lowercased; empty entries are dropped.
    pub fn new(phrases: impl IntoIterator<Item = String>) -> Self {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// True when any configured phrase occurs in the text, case-insensitively.
    pub fn detect(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.phrases.iter().any(|p| lowered.contains(p))
    }
}
