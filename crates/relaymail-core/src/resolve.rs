//! Scan mode: envelope recipients from the message headers.

use crate::config::Config;
use relaymail_mime::{Mailbox, Message};
use tracing::{debug, warn};

/// Header fields scanned for recipients, in order.
pub const RECIPIENT_HEADERS: [&str; 3] = ["To", "Cc", "Bcc"];

/// Appends every mailbox in `To`, `Cc` and `Bcc` to the recipient list.
///
/// Groups are flattened, duplicates skipped, and malformed entries logged
/// and ignored. Returns the number of recipients added.
pub fn resolve_recipients(message: &Message, config: &mut Config) -> usize {
    let before = config.message.to.len();

    for name in RECIPIENT_HEADERS {
        for value in message.headers.get_all(name) {
            for entry in Mailbox::parse_list(value) {
                match entry {
                    Ok(mailbox) if config.message.to.contains(&mailbox.address) => {}
                    Ok(mailbox) => {
                        debug!(header = name, recipient = %mailbox.address, "recipient found");
                        config.message.to.push(mailbox.address);
                    }
                    Err(err) => {
                        warn!(header = name, error = %err, "could not parse recipient");
                    }
                }
            }
        }
    }

    if config.message.to.is_empty() {
        warn!("no recipients found in message");
    }

    config.message.to.len() - before
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scan(raw: &[u8]) -> Vec<String> {
        let message = Message::parse(raw).unwrap();
        let mut config = Config::default();
        config.scan_message = true;
        resolve_recipients(&message, &mut config);
        config.message.to
    }

    #[test]
    fn test_to_then_bcc_in_order() {
        let recipients = scan(b"To: a@x.com, b@y.com\nBcc: c@z.com\n\nbody\n");
        assert_eq!(recipients, vec!["a@x.com", "b@y.com", "c@z.com"]);
    }

    #[test]
    fn test_cc_between_to_and_bcc() {
        let recipients = scan(b"Bcc: c@z.com\nCc: Carol <b@y.com>\nTo: a@x.com\n\n");
        assert_eq!(recipients, vec!["a@x.com", "b@y.com", "c@z.com"]);
    }

    #[test]
    fn test_malformed_entry_skipped() {
        let recipients = scan(b"To: a@x.com, not-an-address, b@y.com\nBcc: c@z.com\n\n");
        assert_eq!(recipients, vec!["a@x.com", "b@y.com", "c@z.com"]);
    }

    #[test]
    fn test_groups_flattened() {
        let recipients = scan(b"To: ops: a@x.com, b@y.com;\n\n");
        assert_eq!(recipients, vec!["a@x.com", "b@y.com"]);
    }

    #[test]
    fn test_duplicates_skipped() {
        let recipients = scan(b"To: a@x.com\nCc: a@x.com\n\n");
        assert_eq!(recipients, vec!["a@x.com"]);
    }

    #[test]
    fn test_appends_to_existing_recipients() {
        let message = Message::parse(b"To: dev@example.com\n\n").unwrap();
        let mut config = Config::default();
        config.set_recipients(["ops@example.com"]);

        assert_eq!(resolve_recipients(&message, &mut config), 1);
        assert_eq!(config.message.to, vec!["ops@example.com", "dev@example.com"]);
    }

    #[test]
    fn test_no_recipients_is_not_fatal() {
        assert!(scan(b"Subject: nothing\n\n").is_empty());
    }
}
