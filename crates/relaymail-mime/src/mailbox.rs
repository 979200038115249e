//! Mailbox (display name + address) parsing and formatting.

use crate::encoding::encode_phrase;
use crate::error::{Error, Result};
use mailparse::{MailAddr, SingleInfo};
use std::fmt;

/// A mailbox: optional display name plus the address itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address (`local@domain`).
    pub address: String,
}

impl Mailbox {
    /// Creates a mailbox. An empty name means no display name.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: (!name.trim().is_empty()).then_some(name),
            address: address.into(),
        }
    }

    /// Parses the first valid mailbox from a header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value contains no valid mailbox.
    pub fn parse(value: &str) -> Result<Self> {
        Self::parse_list(value)
            .into_iter()
            .find_map(Result::ok)
            .ok_or_else(|| Error::InvalidAddress(value.to_string()))
    }

    /// Parses an address-list header value.
    ///
    /// Groups are flattened into their members. Each entry is returned
    /// individually so that one malformed address does not hide the rest.
    #[must_use]
    pub fn parse_list(value: &str) -> Vec<Result<Self>> {
        if value.trim().is_empty() {
            return Vec::new();
        }

        if let Ok(list) = mailparse::addrparse(value) {
            return flatten(list.to_vec());
        }

        // The list as a whole is unparsable; salvage entry by entry.
        split_list(value)
            .into_iter()
            .filter(|entry| !entry.trim().is_empty())
            .flat_map(|entry| match mailparse::addrparse(entry) {
                Ok(list) => flatten(list.to_vec()),
                Err(err) => vec![Err(Error::InvalidAddress(format!(
                    "{}: {err}",
                    entry.trim()
                )))],
            })
            .collect()
    }
}

impl fmt::Display for Mailbox {
    /// `"Name" <address>`, or `<address>` without a name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", encode_phrase(name), self.address),
            None => write!(f, "<{}>", self.address),
        }
    }
}

fn flatten(addrs: Vec<MailAddr>) -> Vec<Result<Mailbox>> {
    addrs
        .into_iter()
        .flat_map(|addr| match addr {
            MailAddr::Single(single) => vec![single],
            MailAddr::Group(group) => group.addrs,
        })
        .map(mailbox_from)
        .collect()
}

fn mailbox_from(info: SingleInfo) -> Result<Mailbox> {
    let address = info.addr.trim();
    let valid = !address.chars().any(char::is_whitespace)
        && address
            .rsplit_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());

    if !valid {
        return Err(Error::InvalidAddress(info.addr));
    }

    Ok(Mailbox {
        name: info.display_name.filter(|n| !n.trim().is_empty()),
        address: address.to_string(),
    })
}

/// Splits an address list on commas outside quotes, comments and angle
/// brackets.
fn split_list(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut comment_depth = 0_u32;
    let mut in_angle = false;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes || comment_depth > 0 => escaped = true,
            '"' if comment_depth == 0 => in_quotes = !in_quotes,
            '(' if !in_quotes => comment_depth += 1,
            ')' if !in_quotes => comment_depth = comment_depth.saturating_sub(1),
            '<' if !in_quotes && comment_depth == 0 => in_angle = true,
            '>' if !in_quotes && comment_depth == 0 => in_angle = false,
            ',' if !in_quotes && comment_depth == 0 && !in_angle => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}
