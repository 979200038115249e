//! Header value encoding helpers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encodes text as an RFC 2047 encoded-word if it is not plain ASCII.
///
/// Uses the `B` (Base64) encoding with the UTF-8 charset.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    format!("=?utf-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}

/// Formats a display name as an RFC 5322 phrase.
///
/// Printable ASCII names become a quoted string with `\` and `"` escaped;
/// anything else becomes an encoded-word.
#[must_use]
pub fn encode_phrase(name: &str) -> String {
    if !name.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        return encode_rfc2047(name);
    }

    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello"), "Hello");
        assert_eq!(encode_rfc2047("Héllo"), "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_phrase_quotes_ascii() {
        assert_eq!(encode_phrase("Cron Daemon"), "\"Cron Daemon\"");
        assert_eq!(encode_phrase("Doe, \"JD\""), "\"Doe, \\\"JD\\\"\"");
    }

    #[test]
    fn test_phrase_encodes_non_ascii() {
        assert_eq!(encode_phrase("Héllo"), "=?utf-8?B?SMOpbGxv?=");
    }
}
