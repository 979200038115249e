//! Message model: a header block over an opaque body.

use crate::error::{Error, Result};
use crate::header::Headers;

/// An RFC 5322 message.
///
/// The body is kept as raw bytes and is never re-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Header fields in transmission order.
    pub headers: Headers,
    /// Everything after the blank line that ends the header block.
    pub body: Vec<u8>,
}

impl Message {
    /// Creates a message with no headers around the given body.
    #[must_use]
    pub fn headerless(body: Vec<u8>) -> Self {
        Self {
            headers: Headers::new(),
            body,
        }
    }

    /// Parses raw input into headers and body.
    ///
    /// The header block ends at the first empty line (LF or CRLF). Input
    /// without an empty line is treated as headers only, which is accepted
    /// as long as at least one header is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, the header block is not
    /// UTF-8, or a header line is malformed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::Parse("empty message".to_string()));
        }

        let split = find_header_end(raw);
        let (header_end, body_start) = split.unwrap_or((raw.len(), raw.len()));

        let text = std::str::from_utf8(&raw[..header_end])?;
        let headers = Headers::parse(text)?;

        if split.is_none() && headers.is_empty() {
            return Err(Error::Parse("no headers found".to_string()));
        }

        Ok(Self {
            headers,
            body: raw[body_start..].to_vec(),
        })
    }

    /// Serializes the message: header lines, a blank line, then the body.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let head = self.headers.to_string();
        let mut out = Vec::with_capacity(head.len() + 2 + self.body.len());
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }

    /// The `From` header, if present.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers.get("From")
    }

    /// The `Subject` header, if present.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("Subject")
    }

    /// The `Message-Id` header, if present.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("Message-Id")
    }
}

/// Locates the empty line ending the header block.
///
/// Returns the offset where the header text ends and where the body begins.
fn find_header_end(raw: &[u8]) -> Option<(usize, usize)> {
    let mut pos = 0;
    while pos <= raw.len() {
        let nl = raw[pos..].iter().position(|&b| b == b'\n')? + pos;
        let line = &raw[pos..nl];
        if line.is_empty() || line == b"\r" {
            return Some((pos, nl + 1));
        }
        pos = nl + 1;
    }
    None
}
