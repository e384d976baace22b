use lazy_static::lazy_static;
use regex::Regex;

use crate::domain::MediaFormat;

lazy_static! {
    // Name runs to the end of the header; the closing quote is optional.
    static ref DISPOSITION_FILENAME: Regex =
        Regex::new(r#"(?i)filename="?(.+?)"?$"#).expect("static regex");
}

/// Extract the `filename=` token from a Content-Disposition value.
///
/// Returns `None` when the token is absent or carries no usable name, so
/// callers can tell a missing hint from a real one.
pub fn parse_disposition_filename(header: &str) -> Option<String> {
    let caps = DISPOSITION_FILENAME.captures(header)?;
    let name = &caps[1];
    if name.trim_matches('"').trim().is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// Pick the destination name: the server's hint when present, otherwise
/// `video.<ext>` for the requested format.
pub fn resolve_filename(suggested: Option<&str>, format: MediaFormat) -> String {
    match suggested {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format.default_filename(),
    }
}

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .trim_matches('.')
        .to_string()
}
