//! Turns raw input into a message with every required header present.

use crate::config::Config;
use crate::error::{Error, Result};
use chrono::Local;
use rand::Rng;
use rand::distributions::Alphanumeric;
use relaymail_mime::{Mailbox, Message};
use tracing::debug;

/// RFC 5322 date format, e.g. `Mon, 2 Jan 2006 15:04:05 -0700`.
const DATE_FORMAT: &str = "%a, %-d %b %Y %H:%M:%S %z";

const MESSAGE_ID_TOKEN_LEN: usize = 16;

/// Parses `raw` and fills in missing `From`, `To`, `Date`, `Message-Id`
/// and `Subject` headers.
///
/// Input that does not parse becomes the body of a header-less message,
/// unless scan mode needs the headers. In scan mode a parsable `From`
/// header also replaces the envelope sender.
///
/// # Errors
///
/// Returns [`Error::Compose`] if the input does not parse in scan mode.
pub fn compose(raw: Vec<u8>, config: &mut Config) -> Result<Message> {
    let mut message = match Message::parse(&raw) {
        Ok(message) => message,
        Err(err) if config.scan_message => return Err(Error::Compose(err)),
        Err(err) => {
            debug!(error = %err, "no usable headers, sending input as body");
            Message::headerless(raw)
        }
    };

    fill_defaults(&mut message, config);
    Ok(message)
}

/// Adds each required header that is absent. Present headers are kept.
pub fn fill_defaults(message: &mut Message, config: &mut Config) {
    let headers = &mut message.headers;

    if let Some(from) = headers.get("From") {
        if config.scan_message {
            if let Ok(mailbox) = Mailbox::parse(from) {
                debug!(from = %mailbox.address, "envelope sender taken from message");
                config.message.from = mailbox.address;
            }
        }
    } else {
        let mailbox = Mailbox::new(
            single_line(&config.message.from_name),
            single_line(&config.message.from),
        );
        headers.add("From", mailbox.to_string());
    }

    if !headers.contains("To") && !config.message.to.is_empty() {
        headers.add("To", single_line(&config.message.to.join(", ")));
    }

    headers.add_if_absent("Date", Local::now().format(DATE_FORMAT).to_string());

    if !headers.contains("Message-Id") {
        headers.add("Message-Id", generate_message_id(&config.hostname));
    }

    headers.add_if_absent("Subject", single_line(&config.message.subject));
}

/// `<GOSSMTP.{token}@{hostname}>` with a random alphanumeric token.
#[must_use]
pub fn generate_message_id(hostname: &str) -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(MESSAGE_ID_TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("<GOSSMTP.{token}@{}>", single_line(hostname))
}

/// Line breaks in synthesized values would start a new header.
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.apply_identity("host.local", "alice");
        config.qualify_postmaster();
        config
    }

    #[test]
    fn test_headerless_input_gets_all_headers() {
        let mut config = config();
        config.set_recipients(["ops"]);

        let message = compose(b"disk usage at 98%\n".to_vec(), &mut config).unwrap();
        let headers = &message.headers;

        assert_eq!(headers.get("From"), Some("\"alice\" <alice@host.local>"));
        assert_eq!(headers.get("To"), Some("postmaster@host.local"));
        assert_eq!(headers.get("Subject"), Some("(no subject)"));
        assert!(headers.get("Date").is_some());
        assert!(headers.get("Message-Id").unwrap().ends_with("@host.local>"));
        assert_eq!(message.body, b"disk usage at 98%\n");
    }

    #[test]
    fn test_existing_subject_kept() {
        let mut config = config();
        let message = compose(b"Subject: backup done\n\nok\n".to_vec(), &mut config).unwrap();
        assert_eq!(message.subject(), Some("backup done"));
        assert_eq!(message.headers.get_all("Subject").len(), 1);
    }

    #[test]
    fn test_empty_subject_counts_as_present() {
        let mut config = config();
        let message = compose(b"Subject:\n\nok\n".to_vec(), &mut config).unwrap();
        assert_eq!(message.subject(), Some(""));
    }

    #[test]
    fn test_configured_subject_used_verbatim() {
        let mut config = config();
        config.message.subject = "cron: nightly [host]".to_string();
        let message = compose(b"ok\n".to_vec(), &mut config).unwrap();
        assert_eq!(message.subject(), Some("cron: nightly [host]"));
    }

    #[test]
    fn test_to_omitted_without_recipients() {
        let mut config = config();
        let message = compose(b"ok\n".to_vec(), &mut config).unwrap();
        assert!(!message.headers.contains("To"));
    }

    #[test]
    fn test_multiple_recipients_joined() {
        let mut config = config();
        config.set_recipients(["a@x.com", "b@y.com"]);
        let message = compose(b"ok\n".to_vec(), &mut config).unwrap();
        assert_eq!(message.headers.get_all("To"), ["a@x.com, b@y.com"]);
    }

    #[test]
    fn test_scan_mode_rejects_unparsable_input() {
        let mut config = config();
        config.scan_message = true;
        let err = compose(b"no headers here\n".to_vec(), &mut config).unwrap_err();
        assert!(matches!(err, Error::Compose(_)));
    }

    #[test]
    fn test_scan_mode_takes_sender_from_header() {
        let mut config = config();
        config.scan_message = true;
        let raw = b"From: Build Bot <ci@example.com>\nTo: dev@example.com\n\nok\n";
        let message = compose(raw.to_vec(), &mut config).unwrap();

        assert_eq!(config.message.from, "ci@example.com");
        assert_eq!(message.from(), Some("Build Bot <ci@example.com>"));
    }

    #[test]
    fn test_sender_header_ignored_outside_scan_mode() {
        let mut config = config();
        compose(b"From: ci@example.com\n\nok\n".to_vec(), &mut config).unwrap();
        assert_eq!(config.message.from, "alice@host.local");
    }

    #[test]
    fn test_cron_daemon_from() {
        let mut config = config();
        config.message.from_cron_daemon = true;
        config.apply_cron_daemon();
        let message = compose(b"ok\n".to_vec(), &mut config).unwrap();
        assert_eq!(message.from(), Some("\"CronDaemon\" <alice@host.local>"));
    }

    #[test]
    fn test_synthesized_values_stay_on_one_line() {
        let mut config = config();
        config.message.subject = "evil\r\nBcc: victim@example.com".to_string();
        let message = compose(b"ok\n".to_vec(), &mut config).unwrap();
        assert!(!message.headers.contains("Bcc"));
        assert_eq!(message.subject(), Some("evil  Bcc: victim@example.com"));
    }

    #[test]
    fn test_message_id_shape() {
        let id = generate_message_id("host.local");
        let token = id
            .strip_prefix("<GOSSMTP.")
            .and_then(|rest| rest.strip_suffix("@host.local>"))
            .unwrap();
        assert_eq!(token.len(), 16);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_message_id("host.local"));
    }

    #[test]
    fn test_recompose_is_stable() {
        let mut config = config();
        config.set_recipients(["ops@example.com"]);
        let first = compose(b"ok\n".to_vec(), &mut config).unwrap();
        let second = compose(first.to_bytes(), &mut config).unwrap();
        assert_eq!(second.headers, first.headers);
    }

    proptest! {
        #[test]
        fn prop_recompose_keeps_headers(
            subject in proptest::option::of("[a-zA-Z0-9 .:-]{0,20}"),
            to in proptest::option::of("[a-z]{1,8}@[a-z]{1,8}\\.com"),
            scan in any::<bool>(),
            body in "[a-zA-Z0-9 \n]{0,40}",
        ) {
            let mut config = config();
            config.scan_message = scan;
            config.set_recipients(["ops@example.com"]);

            let mut raw = String::new();
            if let Some(subject) = &subject {
                raw.push_str(&format!("Subject: {subject}\n"));
            }
            if let Some(to) = &to {
                raw.push_str(&format!("To: {to}\n"));
            }
            raw.push('\n');
            raw.push_str(&body);

            let first = compose(raw.into_bytes(), &mut config).unwrap();
            let second = compose(first.to_bytes(), &mut config).unwrap();
            prop_assert_eq!(&second.headers, &first.headers);
            prop_assert_eq!(second.subject(), Some(subject.as_deref().unwrap_or("(no subject)").trim()));
        }
    }
}
