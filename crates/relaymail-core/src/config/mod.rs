//! Relay configuration.
//!
//! A [`Config`] starts from hard-coded defaults, picks up the local host and
//! invoking user from the passwd database, is overlaid by the config file and
//! finally by command-line flags. It is read-only once delivery starts.

mod fields;
pub mod file;

pub use fields::{FIELDS, Field, Slot};
pub use file::{ConfigError, ConfigWarning};

use nix::unistd::{Uid, User};
use std::fmt;
use tracing::warn;

/// Config file read when `-C` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/relaymail.ini";

/// Display name forced by `Message_FromCronDaemon`.
pub const CRON_DAEMON_NAME: &str = "CronDaemon";

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Verbose mode.
    pub verbose: bool,
    /// Path of the config file.
    pub config_file: String,
    /// Name announced in EHLO and used in generated identifiers.
    pub hostname: String,
    /// Relay host.
    pub server: String,
    /// Relay port.
    pub port: u16,
    /// Address local recipients are mapped to.
    pub postmaster: String,
    /// Derive recipients from the message headers.
    pub scan_message: bool,
    /// `[Authentication]` section.
    pub auth: AuthConfig,
    /// `[Message]` section.
    pub message: MessageConfig,
}

/// Credentials and transport security settings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    /// SASL user name.
    pub user: String,
    /// SASL password.
    pub password: String,
    /// SASL authorization identity (PLAIN only).
    pub identity: String,
    /// `PLAIN`, `CRAM-MD5`, or empty for no authentication.
    pub mechanism: String,
    /// Fail unless the relay offers STARTTLS.
    pub force_starttls: bool,
    /// Accept any relay certificate.
    pub insecure_skip_verify: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .field("identity", &self.identity)
            .field("mechanism", &self.mechanism)
            .field("force_starttls", &self.force_starttls)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

/// Sender identity and recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageConfig {
    /// Envelope recipients, in order.
    pub to: Vec<String>,
    /// Envelope sender and default `From` address.
    pub from: String,
    /// Default `From` display name.
    pub from_name: String,
    /// Default `Subject`.
    pub subject: String,
    /// Use [`CRON_DAEMON_NAME`] as the display name.
    pub from_cron_daemon: bool,
    /// Extra envelope-only recipient.
    pub bcc: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            to: Vec::new(),
            from: String::new(),
            from_name: String::new(),
            subject: "(no subject)".to_string(),
            from_cron_daemon: false,
            bcc: String::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            config_file: DEFAULT_CONFIG_FILE.to_string(),
            hostname: "localhost".to_string(),
            server: "127.0.0.1".to_string(),
            port: 25,
            postmaster: "postmaster".to_string(),
            scan_message: false,
            auth: AuthConfig::default(),
            message: MessageConfig::default(),
        }
    }
}

impl Config {
    /// Defaults plus the local hostname and invoking user.
    #[must_use]
    pub fn discover() -> Self {
        let hostname = gethostname::gethostname()
            .into_string()
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        let (user, full_name) = invoking_user();

        let mut config = Self::default();
        config.apply_identity(&hostname, &user);
        config.message.from_name = full_name;
        config
    }

    /// Sets the hostname and derives the default sender from `user`.
    pub fn apply_identity(&mut self, hostname: &str, user: &str) {
        self.hostname = hostname.to_string();
        self.message.from = format!("{user}@{hostname}");
        self.message.from_name = user.to_string();
    }

    /// Loads the config file named by [`Config::config_file`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or has a malformed line.
    pub fn load_file(&mut self) -> Result<Vec<ConfigWarning>, ConfigError> {
        let path = self.config_file.clone();
        file::load(path.as_ref(), self)
    }

    /// Qualifies a bare postmaster name with the hostname.
    pub fn qualify_postmaster(&mut self) {
        if !self.postmaster.contains('@') {
            self.postmaster = format!("{}@{}", self.postmaster, self.hostname);
        }
    }

    /// Forces the cron display name when `Message_FromCronDaemon` is set.
    pub fn apply_cron_daemon(&mut self) {
        if self.message.from_cron_daemon {
            self.message.from_name = CRON_DAEMON_NAME.to_string();
        }
    }

    /// Sets the recipient list from command-line arguments.
    ///
    /// Local names (no `@`) are delivered to the postmaster.
    pub fn set_recipients<I, S>(&mut self, recipients: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message.to = recipients
            .into_iter()
            .map(Into::into)
            .map(|to| {
                if to.contains('@') {
                    to
                } else {
                    self.postmaster.clone()
                }
            })
            .collect();
    }

    /// Every field with its current value, passwords masked.
    #[must_use]
    pub fn dump(&self) -> Vec<(&'static str, String)> {
        let mut scratch = self.clone();
        FIELDS
            .iter()
            .map(|field| {
                let value = match (field.slot)(&mut scratch) {
                    Slot::Str(s) if field.name.ends_with("Password") => redact(s).to_string(),
                    Slot::Str(s) => format!("{s:?}"),
                    Slot::Bool(b) => b.to_string(),
                    Slot::Int(n) => n.to_string(),
                    Slot::List(list) => format!("{list:?}"),
                };
                (field.name, value)
            })
            .collect()
    }
}

const fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "\"\"" } else { "<redacted>" }
}

/// Login name and display name of the real uid.
///
/// The display name is the first GECOS field, or the login name when that
/// field is empty.
fn invoking_user() -> (String, String) {
    let uid = Uid::current();
    match User::from_uid(uid) {
        Ok(Some(user)) => {
            let full_name = gecos_name(&user.gecos.to_string_lossy())
                .unwrap_or(user.name.as_str())
                .to_string();
            (user.name, full_name)
        }
        Ok(None) => {
            warn!(%uid, "no passwd entry for invoking user");
            ("nobody".to_string(), "nobody".to_string())
        }
        Err(err) => {
            warn!(%uid, error = %err, "could not look up invoking user");
            ("nobody".to_string(), "nobody".to_string())
        }
    }
}

fn gecos_name(gecos: &str) -> Option<&str> {
    gecos.split(',').next().map(str::trim).filter(|name| !name.is_empty())
}
