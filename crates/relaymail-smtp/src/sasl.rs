//! SASL client responses.
//!
//! Implements:
//! - PLAIN (RFC 4616) - authorization identity, username and password
//! - CRAM-MD5 (RFC 2195) - HMAC-MD5 keyed challenge-response

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};

use crate::error::{Error, Result};

type HmacMd5 = Hmac<md5::Md5>;

/// Generates the PLAIN initial response (RFC 4616).
///
/// Format: `<identity>\0<username>\0<password>` (base64 encoded). An empty
/// identity means "act as the authenticated user".
#[must_use]
pub fn plain_response(identity: &str, username: &str, password: &str) -> String {
    let auth_string = format!("{identity}\0{username}\0{password}");
    STANDARD.encode(auth_string.as_bytes())
}

/// Answers a CRAM-MD5 challenge (RFC 2195).
///
/// `challenge_b64` is the text of the server's 334 reply. The response is
/// `base64(username + " " + hex(HMAC-MD5(password, challenge)))`.
///
/// # Errors
///
/// Returns an error if the challenge is not valid base64.
pub fn cram_md5_response(username: &str, password: &str, challenge_b64: &str) -> Result<String> {
    let challenge = STANDARD
        .decode(challenge_b64.trim())
        .map_err(|e| Error::Auth(format!("Invalid CRAM-MD5 challenge: {e}")))?;

    let mut mac = HmacMd5::new_from_slice(password.as_bytes())
        .map_err(|e| Error::Auth(format!("Invalid CRAM-MD5 key: {e}")))?;
    mac.update(&challenge);
    let digest = hex::encode(mac.finalize().into_bytes());

    Ok(STANDARD.encode(format!("{username} {digest}")))
}
