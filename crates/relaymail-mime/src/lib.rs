//! # relaymail-mime
//!
//! The message model relaymail hands to the relay: an ordered RFC 5322
//! header block over an opaque body.
//!
//! ## Features
//!
//! - **Strict header parsing**: malformed input is reported rather than
//!   guessed at, so callers can fall back to treating it as a bare body
//! - **Ordered headers**: serialization follows insertion order, with
//!   repeated fields kept as repeated lines
//! - **Mailboxes**: address-list parsing (groups flattened) and RFC 5322
//!   formatting of `"Name" <mailbox>` pairs
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaymail_mime::{Mailbox, Message};
//!
//! let mut message = Message::parse(b"Subject: disk full\r\n\r\n/var at 98%\r\n")?;
//! message
//!     .headers
//!     .add_if_absent("From", Mailbox::new("Cron Daemon", "root@host").to_string());
//!
//! let wire = message.to_bytes();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod header;
mod mailbox;
mod message;

pub mod encoding;

pub use error::{Error, Result};
pub use header::{Headers, canonical_name};
pub use mailbox::Mailbox;
pub use message::Message;
