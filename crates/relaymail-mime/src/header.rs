//! RFC 5322 header block handling.

use crate::error::{Error, Result};
use std::fmt;

/// Ordered collection of email headers.
///
/// Names are stored in canonical form (`message-id` → `Message-Id`), so
/// lookups are effectively case-insensitive. Each name keeps the position of
/// its first occurrence; repeated fields accumulate values under it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value after any existing values of the same name.
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        let name = canonical_name(name);
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Adds a header only if no value is present yet.
    ///
    /// Returns `true` if the value was added.
    pub fn add_if_absent(&mut self, name: &str, value: impl Into<String>) -> bool {
        if self.contains(name) {
            return false;
        }
        self.add(name, value);
        true
    }

    /// Returns true if the header has at least one value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        !self.get_all(name).is_empty()
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        let name = canonical_name(name);
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(&[][..], |(_, values)| values.as_slice())
    }

    /// Returns the number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Parses a header block.
    ///
    /// Headers are in the format:
    /// ```text
    /// Header-Name: value
    ///  continuation
    /// ```
    ///
    /// Parsing stops at the first empty line. Folded values are unfolded with
    /// a single space and surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns an error for a line without a colon, a field name containing
    /// characters outside printable ASCII (or a space), or a continuation line
    /// with no header to continue.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for (index, line) in text.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                let Some((_, value)) = current.as_mut() else {
                    return Err(Error::InvalidHeader(format!(
                        "line {}: continuation without a header",
                        index + 1
                    )));
                };
                value.push(' ');
                value.push_str(line.trim());
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(&name, value.trim());
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(Error::InvalidHeader(format!(
                    "line {}: missing colon: {line}",
                    index + 1
                )));
            };
            if name.is_empty() || !name.bytes().all(is_field_name_byte) {
                return Err(Error::InvalidHeader(format!(
                    "line {}: invalid field name: {name:?}",
                    index + 1
                )));
            }
            current = Some((name.to_string(), value.trim().to_string()));
        }

        if let Some((name, value)) = current {
            headers.add(&name, value.trim());
        }

        Ok(headers)
    }
}

impl fmt::Display for Headers {
    /// Writes one `Name: value\r\n` line per value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

/// RFC 5322 `ftext`: printable US-ASCII except colon.
const fn is_field_name_byte(b: u8) -> bool {
    matches!(b, 33..=57 | 59..=126)
}

/// Canonicalizes a header name: the first letter and every letter after a
/// hyphen upper-case, the rest lower-case (`content-TYPE` → `Content-Type`).
#[must_use]
pub fn canonical_name(name: &str) -> String {
    let mut upper = true;
    name.trim()
        .chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("message-id"), "Message-Id");
        assert_eq!(canonical_name("Message-ID"), "Message-Id");
        assert_eq!(canonical_name("CC"), "Cc");
        assert_eq!(canonical_name("x-mailer"), "X-Mailer");
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_add_appends() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("to", "bob@example.com");
        assert_eq!(headers.get_all("To"), ["alice@example.com", "bob@example.com"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_add_if_absent() {
        let mut headers = Headers::new();
        assert!(headers.add_if_absent("Subject", "first"));
        assert!(!headers.add_if_absent("subject", "second"));
        assert_eq!(headers.get("Subject"), Some("first"));
    }

    #[test]
    fn test_empty_value_counts_as_present() {
        let mut headers = Headers::new();
        headers.add("Subject", "");
        assert!(headers.contains("Subject"));
        assert!(!headers.add_if_absent("Subject", "(no subject)"));
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Not: a header\r\n"
        );

        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert!(headers.get("Not").is_none());
    }

    #[test]
    fn test_parse_keeps_order_and_repeats() {
        let headers = Headers::parse("Received: a\nSubject: s\nReceived: b\n").unwrap();
        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(
            pairs,
            vec![("Received", "a"), ("Received", "b"), ("Subject", "s")]
        );
    }

    #[test]
    fn test_parse_rejects_plain_text() {
        assert!(Headers::parse("hello world\n").is_err());
    }

    #[test]
    fn test_parse_rejects_space_in_name() {
        assert!(Headers::parse("Disk usage: 98%\n").is_err());
        assert!(Headers::parse("Subject : x\n").is_err());
    }

    #[test]
    fn test_parse_rejects_leading_continuation() {
        assert!(Headers::parse("  indented\nSubject: x\n").is_err());
    }

    #[test]
    fn test_headers_display() {
        let mut headers = Headers::new();
        headers.add("from", "sender@example.com");
        headers.add("to", "a@example.com");
        headers.add("to", "b@example.com");

        assert_eq!(
            headers.to_string(),
            "From: sender@example.com\r\nTo: a@example.com\r\nTo: b@example.com\r\n"
        );
    }
}
