//! Company-name cleaning: model reply → filesystem-safe folder label.
//!
//! Rules (applied in order):
//! 1. Empty input → [`UNKNOWN_COMPANY`]
//! 2. Strip one leading article (`The `, `A `)
//! 3. Strip one trailing legal suffix (`Inc.`, `LLC`, `Ltd.`, `Corp.`, …)
//! 4. Replace characters that are illegal in file names with `_`
//! 5. Collapse whitespace runs into `_`
//! 6. Truncate to [`MAX_LABEL_CHARS`] characters, then drop trailing dots
//!    (Windows rejects folder names ending in `.`)
//! 7. A label left empty → [`UNKNOWN_COMPANY`]

use once_cell::sync::Lazy;
use regex::Regex;

/// Label used when no company name could be determined.
pub const UNKNOWN_COMPANY: &str = "Unknown_Company";

/// Longest label, in characters.
pub const MAX_LABEL_CHARS: usize = 50;

static RE_LEADING_ARTICLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:the|a)\s+").unwrap());

static RE_LEGAL_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:inc\.?|llc\.?|ltd\.?|corporation|corp\.?|company|co\.?)$").unwrap()
});

static RE_ILLEGAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F\x7F]"#).unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Clean a raw company name into a folder label.
///
/// ```rust
/// use certsort::pipeline::clean::clean_company_name;
///
/// assert_eq!(clean_company_name("The Coursera Inc."), "Coursera");
/// assert_eq!(clean_company_name("Amazon Web Services"), "Amazon_Web_Services");
/// ```
pub fn clean_company_name(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return UNKNOWN_COMPANY.to_string();
    }

    let s = RE_LEADING_ARTICLE.replace(raw, "");
    let s = RE_LEGAL_SUFFIX.replace(&s, "");
    let s = RE_ILLEGAL_CHARS.replace_all(&s, "_");
    let s = RE_WHITESPACE.replace_all(s.trim(), "_");

    let label: String = s.chars().take(MAX_LABEL_CHARS).collect();
    let label = label.trim_end_matches('.');
    if label.is_empty() {
        UNKNOWN_COMPANY.to_string()
    } else {
        label.to_string()
    }
}

/// Strip whitespace and any surrounding quote characters from a model reply.
pub fn strip_reply(reply: &str) -> &str {
    reply.trim().trim_matches(['"', '\'', '`']).trim()
}

/// Whether a cleaned label names an actual company.
pub fn is_usable_label(label: &str) -> bool {
    label != UNKNOWN_COMPANY && label.chars().count() > 1
}
