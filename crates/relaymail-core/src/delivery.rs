//! Relay delivery: one SMTP session per message.

use crate::config::Config;
use crate::error::{Error, Result, TransmissionPhase};
use relaymail_mime::Message;
use relaymail_smtp::connection::connect;
use relaymail_smtp::{
    Address, AuthMechanism, Client, Greeted, Ready, SmtpConnection, SmtpStream, TlsOptions,
};
use tracing::{debug, warn};

/// Hosts PLAIN credentials may be sent to without TLS.
const LOCALHOST: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// Dials the configured relay and delivers `message`.
///
/// # Errors
///
/// Returns the error of the first stage that fails; nothing is retried.
pub async fn deliver(config: &Config, message: &Message) -> Result<()> {
    let stream = connect(&config.server, config.port)
        .await
        .map_err(|source| Error::Connect {
            context: format!(
                "while connecting to {} on port {}",
                config.server, config.port
            ),
            source,
        })?;

    deliver_over(stream, config, message).await
}

/// Delivers `message` over an already open stream.
///
/// # Errors
///
/// Returns the error of the first stage that fails; nothing is retried.
pub async fn deliver_over(stream: SmtpStream, config: &Config, message: &Message) -> Result<()> {
    let client = Client::from_stream(stream)
        .await
        .map_err(|source| Error::Connect {
            context: format!("while connecting to {}", config.server),
            source,
        })?;

    let client = client
        .hello(&config.hostname)
        .await
        .map_err(|source| Error::Connect {
            context: format!("while sending Hello `{}`", config.hostname),
            source,
        })?;

    let client = negotiate_tls(client, config).await?;

    match select_mechanism(config, &client) {
        Some(AuthMechanism::CramMd5) => {
            let client = client
                .auth_cram_md5(&config.auth.user, &config.auth.password)
                .await
                .map_err(Error::Auth)?;
            debug!(mechanism = "CRAM-MD5", "using authentication");
            send(client, config, message).await
        }
        Some(AuthMechanism::Plain) => {
            if !client.is_encrypted() && !LOCALHOST.contains(&config.server.as_str()) {
                return Err(Error::Auth(relaymail_smtp::Error::Auth(
                    "unencrypted connection".into(),
                )));
            }
            let client = client
                .auth_plain(
                    &config.auth.identity,
                    &config.auth.user,
                    &config.auth.password,
                )
                .await
                .map_err(Error::Auth)?;
            debug!(mechanism = "PLAIN", "using authentication");
            send(client, config, message).await
        }
        _ => {
            debug!("not using authentication");
            send(client, config, message).await
        }
    }
}

/// Upgrades to TLS when offered; fails if TLS is forced but not offered.
async fn negotiate_tls(client: Client<Greeted>, config: &Config) -> Result<Client<Greeted>> {
    if client.server_info().supports_starttls() {
        let options = TlsOptions {
            insecure_skip_verify: config.auth.insecure_skip_verify,
        };
        let client = client
            .starttls(&config.server, options)
            .await
            .map_err(|e| Error::Tls(format!("while enabling StartTLS: {e}")))?;
        debug!("StartTLS enabled");
        Ok(client)
    } else if config.auth.force_starttls {
        Err(Error::Tls("server does not support StartTLS".into()))
    } else {
        Ok(client)
    }
}

/// The configured mechanism, if the relay offers AUTH at all.
fn select_mechanism(config: &Config, client: &impl SmtpConnection) -> Option<AuthMechanism> {
    let configured = config.auth.mechanism.as_str();
    if configured.is_empty() || !client.server_info().supports_auth() {
        return None;
    }
    debug!(offered = ?client.server_info().auth_mechanisms(), configured, "AUTH advertised");

    match configured {
        "PLAIN" => Some(AuthMechanism::Plain),
        "CRAM-MD5" => Some(AuthMechanism::CramMd5),
        other => {
            debug!(mechanism = other, "unsupported authentication mechanism, skipping");
            None
        }
    }
}

/// `Message_Bcc` first, then the resolved recipients.
fn envelope_recipients(config: &Config) -> Vec<&str> {
    let bcc = config.message.bcc.trim();
    std::iter::once(bcc)
        .filter(|bcc| !bcc.is_empty())
        .chain(config.message.to.iter().map(String::as_str))
        .collect()
}

fn envelope_address(addr: &str) -> Result<Address> {
    Address::new(addr).map_err(|e| Error::Envelope(e.to_string()))
}

async fn send<S: Ready>(client: Client<S>, config: &Config, message: &Message) -> Result<()> {
    let data = message.to_bytes();
    if let Some(limit) = client.server_info().max_message_size() {
        if limit > 0 && data.len() > limit {
            warn!(size = data.len(), limit, "message exceeds the relay's advertised SIZE");
        }
    }

    let from = &config.message.from;
    let client = client
        .mail_from(envelope_address(from)?)
        .await
        .map_err(|e| Error::Envelope(format!("while setting From `{from}`: {e}")))?;

    let recipients = envelope_recipients(config);
    let Some((first, rest)) = recipients.split_first() else {
        return Err(Error::Envelope("no recipients".into()));
    };

    let mut client = client
        .rcpt_to(envelope_address(first)?)
        .await
        .map_err(|e| Error::Envelope(format!("while setting Recipient `{first}`: {e}")))?;
    for to in rest {
        client = client
            .rcpt_to(envelope_address(to)?)
            .await
            .map_err(|e| Error::Envelope(format!("while setting Recipient `{to}`: {e}")))?;
    }

    let mut client = client
        .data()
        .await
        .map_err(|e| Error::Envelope(format!("while setting Data: {e}")))?;

    client
        .write_message(&data)
        .await
        .map_err(|source| Error::Transmission {
            phase: TransmissionPhase::Write,
            source,
        })?;

    let client = client.finish().await.map_err(|source| Error::Transmission {
        phase: TransmissionPhase::Close,
        source,
    })?;

    client.quit().await.map_err(Error::SessionClose)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcc_recipient_comes_first() {
        let mut config = Config::default();
        config.message.bcc = "archive@example.com".to_string();
        config.set_recipients(["a@x.com"]);
        assert_eq!(
            envelope_recipients(&config),
            vec!["archive@example.com", "a@x.com"]
        );
    }

    #[test]
    fn test_no_bcc_recipient() {
        let mut config = Config::default();
        config.set_recipients(["a@x.com"]);
        assert_eq!(envelope_recipients(&config), vec!["a@x.com"]);
    }

    #[test]
    fn test_invalid_envelope_address() {
        assert!(matches!(
            envelope_address("root"),
            Err(Error::Envelope(_))
        ));
    }
}
