//! Artifact file naming
//!
//! Generated files are named `qr_code_{host}_{YYYYMMDD_HHMMSS}.{ext}`, where
//! `host` is the network location of the payload with dots replaced by
//! underscores. Payloads that are not URLs leave `host` empty. Names resolve
//! to the second, so two artifacts for the same host rendered within one
//! second share a path and the later write replaces the earlier one.

use crate::qr::OutputFormat;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Network-location component of `payload` (`user@host:port` for
/// `scheme://user@host:port/path`), or `""` when there is none.
pub fn netloc(payload: &str) -> String {
    // Tabs and newlines are dropped and leading controls/spaces trimmed, the
    // way browsers clean URLs before splitting them.
    let cleaned: String = payload
        .trim_start_matches(|c: char| c <= ' ')
        .chars()
        .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
        .collect();

    let rest = match split_scheme(&cleaned) {
        Some((_, rest)) => rest,
        None => cleaned.as_str(),
    };

    match rest.strip_prefix("//") {
        Some(authority) => {
            let end = authority.find(['/', '?', '#']).unwrap_or(authority.len());
            authority[..end].to_string()
        }
        None => String::new(),
    }
}

/// Split `scheme:rest` when the prefix is a syntactically valid scheme.
fn split_scheme(url: &str) -> Option<(&str, &str)> {
    let colon = url.find(':')?;
    let scheme = &url[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme, &url[colon + 1..]))
}

/// Filename-safe identifier derived from the payload's network location.
pub fn payload_identifier(payload: &str) -> String {
    netloc(payload).replace('.', "_")
}

/// Filename for an artifact rendered from `payload` at `timestamp`.
pub fn artifact_file_name<Tz>(
    payload: &str,
    timestamp: &DateTime<Tz>,
    format: OutputFormat,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "qr_code_{}_{}.{}",
        payload_identifier(payload),
        timestamp.format(TIMESTAMP_FORMAT),
        format.extension()
    )
}
