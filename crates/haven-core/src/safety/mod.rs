//! Safety/trust gating: eligibility gate, crisis detector, citation sanitizer.
//!
//! Everything here is pure and deterministic given its inputs. The pipeline
//! runs the checks in order per request; none of them mutate shared state.

mod citations;
mod crisis;
mod eligibility;

pub use citations::{CitationSanitizer, REDACTED_URL_PLACEHOLDER};
pub use crisis::CrisisDetector;
pub use eligibility::{assess_birth_year, Eligibility, ELIGIBLE_AGE_MAX, ELIGIBLE_AGE_MIN};

use serde::{Deserialize, Serialize};

/// Canonical trusted citation hostnames, used when config supplies none.
const DEFAULT_TRUSTED_DOMAINS: [&str; 4] = [
    "focusonthefamily.com",
    "gotquestions.org",
    "psychologytoday.com",
    "biblegateway.com",
];

/// Canonical risk phrases, used when config supplies none.
const DEFAULT_CRISIS_PHRASES: [&str; 7] = [
    "kill myself",
    "suicide",
    "end my life",
    "hurt myself",
    "can't stay safe",
    "i want to die",
    "self-harm",
];

const DEFAULT_PERSONA_PROMPT: &str = "You are a warm, encouraging support companion for teens. \
Be brief, practical, and kind. Where appropriate, point to articles from focusonthefamily.com \
and self-soothing tips inspired by psychologytoday.com. Avoid medical or diagnostic claims. \
Encourage reaching out to trusted adults, and to emergency help if anyone is at risk. \
Only cite web resources from the approved source list you have been given.";

const DEFAULT_CRISIS_MESSAGE: &str = "I'm really glad you told me, and I want you to be safe. \
Please call or text 988 right now to reach the Suicide & Crisis Lifeline — someone caring is \
there 24/7. If you are in immediate danger, call 911. Please also tell a trusted adult what \
is going on. You matter, and you don't have to face this alone.";

const DEFAULT_INELIGIBLE_MESSAGE: &str = "This space is designed for teens between 13 and 19. \
Please talk with a trusted adult about finding support that fits you — and if you are ever in \
immediate danger, contact your local emergency services.";

/// Deployment-time safety policy: persona text, phrase lists, and fixed
/// response templates. Built once at startup and read-only thereafter;
/// every list has a compiled-in canonical default for empty config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyPolicy {
    pub persona_prompt: String,
    pub crisis_phrases: Vec<String>,
    pub crisis_message: String,
    pub ineligible_message: String,
    pub trusted_domains: Vec<String>,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            persona_prompt: DEFAULT_PERSONA_PROMPT.to_string(),
            crisis_phrases: DEFAULT_CRISIS_PHRASES.iter().map(|s| s.to_string()).collect(),
            crisis_message: DEFAULT_CRISIS_MESSAGE.to_string(),
            ineligible_message: DEFAULT_INELIGIBLE_MESSAGE.to_string(),
            trusted_domains: DEFAULT_TRUSTED_DOMAINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SafetyPolicy {
    /// Policy from config-supplied lists; empty lists fall back to the
    /// canonical defaults so a blank config file still ships safe behavior.
    pub fn with_overrides(trusted_domains: &[String], crisis_phrases: &[String]) -> Self {
        let mut policy = Self::default();
        if !trusted_domains.is_empty() {
            policy.trusted_domains = trusted_domains.to_vec();
        }
        if !crisis_phrases.is_empty() {
            policy.crisis_phrases = crisis_phrases.to_vec();
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_carries_canonical_lists() {
        let policy = SafetyPolicy::default();
        assert!(policy.trusted_domains.iter().any(|d| d == "focusonthefamily.com"));
        assert!(policy.crisis_phrases.iter().any(|p| p == "kill myself"));
        assert!(policy.crisis_message.contains("988"));
    }

    #[test]
    fn overrides_replace_only_non_empty_lists() {
        let policy = SafetyPolicy::with_overrides(&["example.org".to_string()], &[]);
        assert_eq!(policy.trusted_domains, vec!["example.org".to_string()]);
        // crisis list untouched
        assert!(policy.crisis_phrases.iter().any(|p| p == "suicide"));
    }
}
