pub mod http;
pub mod path_processing;

pub use path_processing::expand_tilde;

use once_cell::sync::Lazy;
use regex::Regex;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+]+(?: [\w\-\.=:/+]+)?)",
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD|TICKET)=)([^\s&]+)",
        r"(?i)(https?://)([^/\s:@]*:[^/\s@]+)@",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// Covers authorization headers, `NAME=value` pairs whose name ends in a
/// secret-ish suffix (including tickets), and `user:password@` userinfo
/// embedded in URLs.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for re in SENSITIVE_PATTERNS.iter() {
        redacted = re
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                if prefix.ends_with("://") {
                    format!("{prefix}<redacted>@")
                } else {
                    format!("{prefix}<redacted>")
                }
            })
            .to_string();
    }
    redacted
}
