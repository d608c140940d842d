//! Identifier and slug generation
//!
//! Refids follow the escaping scheme of Doxygen so identifiers look familiar
//! to readers of other C++ reference sites and never contain characters that
//! are unsafe in file names or URLs.

use sha2::{Digest, Sha256};

/// Escape a qualified name or path into an identifier fragment.
///
/// # Examples
///
/// ```
/// use quire::utils::escape_refid;
///
/// assert_eq!(escape_refid("mboxid::modbus_tcp_server"), "mboxid_1_1modbus__tcp__server");
/// assert_eq!(escape_refid("error.hpp"), "error_8hpp");
/// ```
pub fn escape_refid(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        match c {
            '_' => out.push_str("__"),
            ':' => out.push_str("_1"),
            '/' => out.push_str("_2"),
            '<' => out.push_str("_3"),
            '>' => out.push_str("_4"),
            '*' => out.push_str("_5"),
            '&' => out.push_str("_6"),
            '|' => out.push_str("_7"),
            '.' => out.push_str("_8"),
            '!' => out.push_str("_9"),
            ',' => out.push_str("_00"),
            ' ' => out.push_str("_01"),
            '{' => out.push_str("_02"),
            '}' => out.push_str("_03"),
            '?' => out.push_str("_04"),
            '^' => out.push_str("_05"),
            '%' => out.push_str("_06"),
            '(' => out.push_str("_07"),
            ')' => out.push_str("_08"),
            '+' => out.push_str("_09"),
            '=' => out.push_str("_0a"),
            '$' => out.push_str("_0b"),
            '\\' => out.push_str("_0c"),
            '@' => out.push_str("_0d"),
            ']' => out.push_str("_0e"),
            '[' => out.push_str("_0f"),
            '#' => out.push_str("_0g"),
            '"' => out.push_str("_0h"),
            '~' => out.push_str("_0i"),
            '\'' => out.push_str("_0j"),
            ';' => out.push_str("_0k"),
            '`' => out.push_str("_0l"),
            'A'..='Z' => {
                out.push('_');
                out.push(c.to_ascii_lowercase());
            }
            'a'..='z' | '0'..='9' | '-' => out.push(c),
            other => {
                // non-ASCII: encode the code point
                out.push_str(&format!("_x{:x}", other as u32));
            }
        }
    }
    out
}

/// Stable hash fragment for a member signature
pub fn signature_hash(signature: &str) -> String {
    let digest = Sha256::digest(signature.as_bytes());
    hex::encode(&digest[..16])
}

/// Generate a URL-safe slug from a string.
///
/// Converts the input string to lowercase, replaces non-alphanumeric
/// characters with hyphens, collapses multiple consecutive hyphens,
/// and trims leading/trailing hyphens.
///
/// # Examples
///
/// ```
/// use quire::utils::slug;
///
/// assert_eq!(slug("Hello World"), "hello-world");
/// assert_eq!(slug("Getting started: TCP"), "getting-started-tcp");
/// ```
pub fn slug(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '-',
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Anchor for a heading; falls back to `section` for headings without
/// any alphanumeric character
pub fn anchor_slug(s: &str) -> String {
    let slugged = slug(s);
    if slugged.is_empty() {
        "section".to_string()
    } else {
        slugged
    }
}

/// Generate a unique slug by appending a suffix if needed.
pub fn unique_slug(base: &str, existing: &[String]) -> String {
    let base_slug = anchor_slug(base);

    if !existing.contains(&base_slug) {
        return base_slug;
    }

    let mut counter = 1;
    loop {
        let candidate = format!("{}-{}", base_slug, counter);
        if !existing.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_refid() {
        assert_eq!(
            escape_refid("mboxid::modbus_tcp_server"),
            "mboxid_1_1modbus__tcp__server"
        );
        assert_eq!(escape_refid("mboxid/error.hpp"), "mboxid_2error_8hpp");
        assert_eq!(escape_refid("Logger"), "_logger");
        assert_eq!(escape_refid("operator<<"), "operator_3_3");
    }

    #[test]
    fn test_signature_hash_is_stable() {
        let a = signature_hash("mboxid::f(int)");
        assert_eq!(a.len(), 32);
        assert_eq!(a, signature_hash("mboxid::f(int)"));
        assert_ne!(a, signature_hash("mboxid::f(long)"));
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Hello World"), "hello-world");
        assert_eq!(slug("my_function"), "my-function");
        assert_eq!(slug("-hello-"), "hello");
        assert_eq!(slug(""), "");
    }

    #[test]
    fn test_anchor_slug_fallback() {
        assert_eq!(anchor_slug("Return Value"), "return-value");
        assert_eq!(anchor_slug("!!!"), "section");
    }

    #[test]
    fn test_unique_slug() {
        let existing = vec!["usage".to_string(), "usage-1".to_string()];
        assert_eq!(unique_slug("Usage", &existing), "usage-2");
        assert_eq!(unique_slug("Install", &existing), "install");
    }
}
