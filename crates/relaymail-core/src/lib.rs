//! # relaymail-core
//!
//! The delivery pipeline behind the `relaymail` binary.
//!
//! This crate provides:
//! - **Configuration** - defaults, environment discovery and the INI-like
//!   config file, applied through a static key table
//! - **Composition** - header parsing with a header-less fallback, and
//!   defaults for `From`, `To`, `Date`, `Message-Id` and `Subject`
//! - **Recipient scanning** - envelope recipients from `To`, `Cc` and `Bcc`
//! - **Delivery** - one SMTP session per message: STARTTLS policy,
//!   authentication choice, envelope, data and `QUIT`
//!
//! ```ignore
//! let mut config = Config::discover();
//! config.load_file()?;
//! config.qualify_postmaster();
//! config.set_recipients(["ops"]);
//!
//! let message = compose(raw, &mut config)?;
//! deliver(&config, &message).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod compose;
pub mod config;
pub mod delivery;
mod error;
pub mod resolve;

pub use compose::compose;
pub use config::{Config, ConfigError, ConfigWarning};
pub use delivery::{deliver, deliver_over};
pub use error::{Error, Result, TransmissionPhase};
pub use resolve::resolve_recipients;
