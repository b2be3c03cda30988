//! Final verdict types and display/redaction rules.
//!
//! The three-valued [`VerdictStatus`] is a closed enum: provider results are
//! reduced to it once, and nothing downstream re-derives safety from strings.
//! [`Verdict`] owns the only renderable URL form; a dangerous URL is defanged
//! on construction so no code path can leak a clickable `http(s)://` prefix.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static HTTP_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^http").unwrap());

/// Final status of an analyzed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerdictStatus {
    /// All reporting providers agree the URL is safe.
    Safe,
    /// At least one provider flagged the URL.
    Dangerous,
    /// Not enough definitive information; distinct from confirmed safe.
    Indeterminate,
}

impl VerdictStatus {
    /// Short uppercase label for display and audit records.
    pub fn label(&self) -> &'static str {
        match self {
            VerdictStatus::Safe => "SAFE",
            VerdictStatus::Dangerous => "DANGEROUS",
            VerdictStatus::Indeterminate => "INDETERMINATE",
        }
    }

    /// Embed/panel color associated with the status.
    pub fn color(&self) -> u32 {
        match self {
            VerdictStatus::Safe => 0x2ECC71,
            VerdictStatus::Dangerous => 0xE74C3C,
            VerdictStatus::Indeterminate => 0xF1C40F,
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The outcome of a successful analysis.
///
/// `display_url` is the only URL form the presentation layer may render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    status: VerdictStatus,
    display_url: String,
}

impl Verdict {
    /// Builds a verdict, applying the redaction policy: a dangerous URL is
    /// defanged so its prefix is never directly clickable.
    pub fn new(status: VerdictStatus, url: &str) -> Self {
        let display_url = match status {
            VerdictStatus::Dangerous => defang(url),
            _ => url.to_string(),
        };
        Verdict {
            status,
            display_url,
        }
    }

    /// The three-valued status.
    pub fn status(&self) -> VerdictStatus {
        self.status
    }

    /// The renderable URL form (defanged when dangerous).
    pub fn display_url(&self) -> &str {
        &self.display_url
    }
}

/// Rewrites a URL's `http`/`https` prefix to `hxxp`/`hxxps`.
pub fn defang(url: &str) -> String {
    HTTP_PREFIX.replace(url, "hxxp").into_owned()
}

/// Masks a URL for log output so scanned URLs never appear in logs verbatim:
/// the registrable part of the host keeps its first label, the rest of the
/// URL is dropped.
pub fn mask_url(url: &str) -> String {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()));
    match host {
        Some(host) => match host.split_once('.') {
            Some((first, rest)) => format!("{first}***.{rest}"),
            None => format!("{host}***"),
        },
        None => "<unparsed>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defang_http_and_https() {
        assert_eq!(defang("http://evil.test/x"), "hxxp://evil.test/x");
        assert_eq!(defang("https://evil.test/x"), "hxxps://evil.test/x");
        assert_eq!(defang("HTTP://evil.test/"), "hxxp://evil.test/");
    }

    #[test]
    fn test_dangerous_verdict_is_never_clickable() {
        let verdict = Verdict::new(VerdictStatus::Dangerous, "https://evil.test/payload");
        assert!(!verdict.display_url().starts_with("http://"));
        assert!(!verdict.display_url().starts_with("https://"));
        assert_eq!(verdict.display_url(), "hxxps://evil.test/payload");
    }

    #[test]
    fn test_safe_verdict_keeps_url() {
        let verdict = Verdict::new(VerdictStatus::Safe, "https://example.com/");
        assert_eq!(verdict.display_url(), "https://example.com/");
    }

    #[test]
    fn test_labels_and_colors() {
        assert_eq!(VerdictStatus::Safe.label(), "SAFE");
        assert_eq!(VerdictStatus::Dangerous.label(), "DANGEROUS");
        assert_eq!(VerdictStatus::Indeterminate.label(), "INDETERMINATE");
        assert_eq!(VerdictStatus::Safe.color(), 0x2ECC71);
        assert_eq!(VerdictStatus::Dangerous.color(), 0xE74C3C);
        assert_eq!(VerdictStatus::Indeterminate.color(), 0xF1C40F);
    }

    #[test]
    fn test_mask_url_hides_full_host() {
        assert_eq!(
            mask_url("https://login.example.com/reset?t=abc"),
            "login***.example.com"
        );
        assert_eq!(mask_url("not a url"), "<unparsed>");
    }
}
