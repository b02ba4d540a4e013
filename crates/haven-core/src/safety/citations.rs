//! Citation sanitizer: redacts URLs pointing outside the trusted domain set.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Replacement token for untrusted URLs. Not itself a URL, so a second
/// sanitizer pass leaves output unchanged.
pub const REDACTED_URL_PLACEHOLDER: &str = "[unapproved source removed]";

/// Scheme plus non-whitespace body; a closing paren ends the match so URLs
/// inside markdown links and parenthetical asides keep their surrounding text.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://[^\s)]+").expect("URL pattern is a valid regex")
});

/// Rewrites any URL in model output whose hostname is not in the trusted
/// set. Trusted hostnames match exactly or as proper subdomains. The set is
/// fixed at construction and read-only thereafter.
#[derive(Debug, Clone)]
pub struct CitationSanitizer {
    trusted: Vec<String>,
}

impl CitationSanitizer {
    /// Domains are stored lowercased without a leading dot.
    pub fn new(trusted_domains: impl IntoIterator<Item = String>) -> Self {
        Self {
            trusted: trusted_domains
                .into_iter()
                .map(|d| d.trim().trim_start_matches('.').to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// True when the URL parses and its hostname equals a trusted domain or
    /// ends with `"." + domain`. Unparseable URLs are untrusted.
    pub fn is_trusted(&self, raw_url: &str) -> bool {
        let host = match Url::parse(raw_url) {
            Ok(url) => match url.host_str() {
                Some(h) => h.to_lowercase(),
                None => return false,
            },
            Err(_) => return false,
        };
        self.trusted
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
    }

    /// Single pass over the text: every URL match is kept verbatim when
    /// trusted and replaced with [`REDACTED_URL_PLACEHOLDER`] otherwise.
    /// Trailing sentence punctuation on a match counts as surrounding text,
    /// not part of the URL, and survives redaction. Surrounding text is
    /// preserved exactly. Idempotent, since the placeholder contains no URL.
    pub fn sanitize(&self, text: &str) -> String {
        URL_PATTERN
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let candidate = &caps[0];
                let url = candidate.trim_end_matches([',', '.', ';', ':', '!', '?']);
                let trailing = &candidate[url.len()..];
                if self.is_trusted(url) {
                    candidate.to_string()
                } else {
                    format!("{REDACTED_URL_PLACEHOLDER}{trailing}")
                }
            })
            .into_owned()
    }
}
