//! # relaymail-smtp
//!
//! A small SMTP submission client for relaying a single message to an
//! upstream server.
//!
//! ## Features
//!
//! - **Type-state sessions**: the order `banner → EHLO → [STARTTLS] → [AUTH] →
//!   MAIL → RCPT → DATA → QUIT` is enforced at compile time
//! - **TLS upgrade**: STARTTLS via rustls, with an explicit opt-in for skipping
//!   certificate verification
//! - **Authentication**: PLAIN (with authorization identity) and CRAM-MD5
//! - **Testable transport**: any `AsyncRead + AsyncWrite` can back a session
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaymail_smtp::{Address, Client, TlsOptions};
//! use relaymail_smtp::connection::connect;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> relaymail_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587).await?;
//!     let client = Client::from_stream(stream).await?;
//!     let client = client.hello("client.example.com").await?;
//!     let client = client
//!         .starttls("smtp.example.com", TlsOptions::default())
//!         .await?;
//!     let client = client.auth_plain("", "user", "secret").await?;
//!
//!     let client = client.mail_from(Address::new("me@example.com")?).await?;
//!     let client = client.rcpt_to(Address::new("you@example.com")?).await?;
//!     let mut client = client.data().await?;
//!     client.write_message(b"Subject: Test\r\n\r\nHello\r\n").await?;
//!     let client = client.finish().await?;
//!     client.quit().await
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Connected ── hello() ──→ Greeted ── auth_*() ──→ Authenticated
//!                            │  ↺ starttls()            │
//!                            └──────── mail_from() ─────┘
//!                                          │
//!                                   MailTransaction ── rcpt_to() ──→ RecipientAdded
//!                                                                       │ data()
//!                                                                      Data ── finish() ──→ Greeted
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod sasl;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, Greeted, MailTransaction, Ready, RecipientAdded,
    ServerInfo, SmtpConnection, SmtpStream, TlsOptions,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
