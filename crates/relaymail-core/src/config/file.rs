//! INI-like config file parser.
//!
//! ```text
//! ; comment
//! Server=relay.example.com
//! [Authentication]
//! User=alice
//! ```
//!
//! Keys inside a section are prefixed with the section name and an
//! underscore, so `User` above sets `Authentication_User`.

use super::Config;
use super::fields::{Slot, lookup};
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Errors that abort loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path that was opened.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A line is neither a comment, a section header nor a `key=value` pair.
    #[error("failed to parse config, line {line}: {content}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },
}

/// Problem with a single line that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// No field has this name.
    UnknownKey {
        /// Section-prefixed key.
        key: String,
        /// 1-based line number.
        line: usize,
    },
    /// The value does not fit the field's type.
    InvalidValue {
        /// Section-prefixed key.
        key: String,
        /// Value as written.
        value: String,
        /// 1-based line number.
        line: usize,
    },
    /// The field cannot be set from the file.
    UnsupportedType {
        /// Section-prefixed key.
        key: String,
        /// Type of the field.
        kind: &'static str,
        /// 1-based line number.
        line: usize,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey { key, line } => {
                write!(f, "unknown configuration variable {key}, line {line}")
            }
            Self::InvalidValue { key, value, line } => {
                write!(f, "could not parse value `{value}` for {key}, line {line}")
            }
            Self::UnsupportedType { key, kind, line } => {
                write!(f, "unsupported type {kind} for {key}, line {line}")
            }
        }
    }
}

/// Reads `path` and applies it to `config`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, or
/// [`ConfigError::Parse`] for the first malformed line.
pub fn load(path: &Path, config: &mut Config) -> Result<Vec<ConfigWarning>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&text, config)
}

/// Applies config file text to `config`.
///
/// Values already applied stay applied when a later line fails. Skipped
/// lines are logged and returned as warnings.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for the first line that is neither blank,
/// a comment, a `[section]` nor a `key=value` pair.
pub fn parse_str(text: &str, config: &mut Config) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut warnings = Vec::new();
    let mut section = String::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.strip_suffix('\r').unwrap_or(raw);

        if content.trim().is_empty() || content.starts_with(';') {
            continue;
        }

        if let Some(name) = parse_section(content) {
            section = name.to_string();
            continue;
        }

        let Some((key, value)) = parse_pair(content) else {
            return Err(ConfigError::Parse {
                line,
                content: content.to_string(),
            });
        };

        let key = if section.is_empty() {
            key.to_string()
        } else {
            format!("{section}_{key}")
        };

        if let Some(warning) = assign(config, key, value, line) {
            warn!("{warning}");
            warnings.push(warning);
        }
    }

    Ok(warnings)
}

/// `[name]` with a non-empty name and no nested `]`.
fn parse_section(line: &str) -> Option<&str> {
    let name = line.strip_prefix('[')?.strip_suffix(']')?;
    (!name.is_empty() && !name.contains(']')).then_some(name)
}

/// `key=value`, where the key holds none of `#`, `;` or `=`.
fn parse_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    if key.is_empty() || key.contains(['#', ';']) {
        return None;
    }
    Some((key.trim(), value))
}

fn assign(config: &mut Config, key: String, value: &str, line: usize) -> Option<ConfigWarning> {
    let Some(field) = lookup(&key) else {
        return Some(ConfigWarning::UnknownKey { key, line });
    };

    match (field.slot)(config) {
        Slot::Str(slot) => *slot = value.to_string(),
        Slot::Bool(slot) => *slot = value == "1",
        Slot::Int(slot) => match value.parse() {
            Ok(n) => *slot = n,
            Err(_) => {
                return Some(ConfigWarning::InvalidValue {
                    key,
                    value: value.to_string(),
                    line,
                });
            }
        },
        other @ Slot::List(_) => {
            return Some(ConfigWarning::UnsupportedType {
                key,
                kind: other.type_name(),
                line,
            });
        }
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sections_prefix_keys() {
        let mut config = Config::default();
        let text = "Server=relay.example.com\n[Authentication]\nUser=alice\nMechanism=PLAIN\n";
        let warnings = parse_str(text, &mut config).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(config.server, "relay.example.com");
        assert_eq!(config.auth.user, "alice");
        assert_eq!(config.auth.mechanism, "PLAIN");
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let mut config = Config::default();
        let text = "; relay settings\n\n   \n;Server=ignored\nPort=587\n";
        parse_str(text, &mut config).unwrap();
        assert_eq!(config.server, "127.0.0.1");
        assert_eq!(config.port, 587);
    }

    #[test]
    fn test_crlf_lines() {
        let mut config = Config::default();
        parse_str("[Message]\r\nSubject=cron output\r\n", &mut config).unwrap();
        assert_eq!(config.message.subject, "cron output");
    }

    #[test]
    fn test_value_kept_verbatim() {
        let mut config = Config::default();
        parse_str("[Authentication]\nPassword= s3cr=t \n", &mut config).unwrap();
        assert_eq!(config.auth.password, " s3cr=t ");
    }

    #[test]
    fn test_only_one_is_true() {
        let mut config = Config::default();
        parse_str("ScanMessage=1\nVerbose=true\n", &mut config).unwrap();
        assert!(config.scan_message);
        assert!(!config.verbose);

        parse_str("ScanMessage=yes\n", &mut config).unwrap();
        assert!(!config.scan_message);
    }

    #[test]
    fn test_unknown_key_is_a_warning() {
        let mut config = Config::default();
        let text = concat!(
            "Server=relay.example.com\n",
            "Port=2525\n",
            "Postmaster=root@example.com\n",
            "ScanMessage=1\n",
            "Colour=blue\n",
            "[Authentication]\n",
            "User=alice\n",
            "Password=secret\n",
            "Mechanism=CRAM-MD5\n",
            "ForceStartTLS=1\n",
            "[Message]\n",
            "Subject=nightly\n",
        );
        let warnings = parse_str(text, &mut config).unwrap();

        assert_eq!(
            warnings,
            vec![ConfigWarning::UnknownKey {
                key: "Colour".to_string(),
                line: 5
            }]
        );
        assert_eq!(config.server, "relay.example.com");
        assert_eq!(config.port, 2525);
        assert_eq!(config.postmaster, "root@example.com");
        assert!(config.scan_message);
        assert_eq!(config.auth.user, "alice");
        assert_eq!(config.auth.password, "secret");
        assert_eq!(config.auth.mechanism, "CRAM-MD5");
        assert!(config.auth.force_starttls);
        assert_eq!(config.message.subject, "nightly");
    }

    #[test]
    fn test_bad_integer_keeps_previous_value() {
        let mut config = Config::default();
        let warnings = parse_str("Port=smtp\nPort=70000\n", &mut config).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            &warnings[0],
            ConfigWarning::InvalidValue { key, line: 1, .. } if key == "Port"
        ));
        assert_eq!(config.port, 25);
    }

    #[test]
    fn test_list_field_unsupported() {
        let mut config = Config::default();
        let warnings = parse_str("[Message]\nTo=ops@example.com\n", &mut config).unwrap();
        assert_eq!(
            warnings,
            vec![ConfigWarning::UnsupportedType {
                key: "Message_To".to_string(),
                kind: "list",
                line: 2
            }]
        );
        assert!(config.message.to.is_empty());
    }

    #[test]
    fn test_malformed_line_aborts() {
        let mut config = Config::default();
        let text = "Server=relay.example.com\njust text\nPort=2525\n";
        let err = parse_str(text, &mut config).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Parse { line: 2, ref content } if content == "just text"
        ));
        assert_eq!(config.server, "relay.example.com");
        assert_eq!(config.port, 25);
    }

    #[test]
    fn test_key_with_comment_char_is_malformed() {
        let mut config = Config::default();
        assert!(parse_str("#Server=x\n", &mut config).is_err());
        assert!(parse_str("=value\n", &mut config).is_err());
    }

    #[test]
    fn test_trimmed_key() {
        let mut config = Config::default();
        parse_str("  Server =relay\n", &mut config).unwrap();
        assert_eq!(config.server, "relay");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[Authentication]").unwrap();
        writeln!(file, "Identity=ops").unwrap();

        let mut config = Config::default();
        let warnings = load(file.path(), &mut config).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.auth.identity, "ops");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        let err = load(&dir.path().join("absent.ini"), &mut config).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
