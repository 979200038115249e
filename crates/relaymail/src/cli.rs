//! Sendmail-style command line.

use std::ffi::OsString;

use clap::{Arg, ArgAction, ArgMatches, Command};
use relaymail_core::Config;

/// Builds the sendmail-compatible command.
///
/// Short options cluster (`-tiv`) and take attached values (`-fuser@host`).
/// Option parsing stops at `--` or the first recipient.
pub fn build_cli() -> Command {
    Command::new("relaymail")
        .about("Relay a message read from stdin through an SMTP server")
        .version(env!("CARGO_PKG_VERSION"))
        .disable_version_flag(true)
        .args_override_self(true)
        .arg(
            Arg::new("version")
                .long("version")
                .action(ArgAction::Version)
                .help("Print version"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Log the session and dump the effective configuration"),
        )
        .arg(
            Arg::new("scan")
                .short('t')
                .action(ArgAction::SetTrue)
                .help("Read recipients from the To, Cc and Bcc headers"),
        )
        .arg(
            Arg::new("config_file")
                .short('C')
                .value_name("FILE")
                .help("Use an alternate configuration file"),
        )
        .arg(
            Arg::new("from")
                .short('f')
                .value_name("ADDRESS")
                .help("Envelope sender address"),
        )
        .arg(
            Arg::new("from_name")
                .short('F')
                .value_name("NAME")
                .help("Sender display name"),
        )
        .arg(
            Arg::new("subject")
                .short('S')
                .value_name("SUBJECT")
                .help("Subject used when the message has none"),
        )
        // accepted for sendmail compatibility
        .arg(Arg::new("i").short('i').action(ArgAction::SetTrue).hide(true))
        .arg(
            Arg::new("o")
                .short('o')
                .value_name("OPTION")
                .action(ArgAction::Append)
                .hide(true),
        )
        .arg(
            Arg::new("recipients")
                .value_name("RECIPIENT")
                .num_args(0..)
                .trailing_var_arg(true)
                .help("Recipient addresses; names without @ go to the postmaster"),
        )
}

/// Parsed command-line arguments.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Args {
    /// `-v`
    pub verbose: bool,
    /// `-t`
    pub scan: bool,
    /// `-C file`
    pub config_file: Option<String>,
    /// `-f address`
    pub from: Option<String>,
    /// `-F name`
    pub from_name: Option<String>,
    /// `-S subject`
    pub subject: Option<String>,
    /// Remaining arguments.
    pub recipients: Vec<String>,
}

impl Args {
    /// Parses arguments, program name included.
    ///
    /// # Errors
    ///
    /// Returns the clap error for an unknown option or a missing value, and
    /// for `--help`/`--version`.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        build_cli().try_get_matches_from(args).map(|m| Self::from_matches(&m))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let value = |id: &str| matches.get_one::<String>(id).cloned();
        Self {
            verbose: matches.get_flag("verbose"),
            scan: matches.get_flag("scan"),
            config_file: value("config_file"),
            from: value("from"),
            from_name: value("from_name"),
            subject: value("subject"),
            recipients: matches
                .get_many::<String>("recipients")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Overlays the flags that were given onto `config`.
    pub fn apply(&self, config: &mut Config) {
        config.verbose |= self.verbose;
        config.scan_message |= self.scan;
        if let Some(path) = &self.config_file {
            config.config_file.clone_from(path);
        }
        if let Some(from) = &self.from {
            config.message.from.clone_from(from);
        }
        if let Some(name) = &self.from_name {
            config.message.from_name.clone_from(name);
        }
        if let Some(subject) = &self.subject {
            config.message.subject.clone_from(subject);
        }
    }
}
