//! Config key → field dispatch table.

use super::Config;
use std::fmt;

/// Typed mutable view of one configuration field.
#[derive(Debug)]
pub enum Slot<'a> {
    /// Free-form string.
    Str(&'a mut String),
    /// Boolean; only `1` is true in the config file.
    Bool(&'a mut bool),
    /// Base-10 integer.
    Int(&'a mut u16),
    /// Ordered list. Not settable from the config file.
    List(&'a mut Vec<String>),
}

impl Slot<'_> {
    /// Human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::List(_) => "list",
        }
    }
}

/// A configuration key and how to reach its field.
pub struct Field {
    /// Key as written in the file, section-prefixed (`Authentication_User`).
    pub name: &'static str,
    /// Accessor for the field.
    pub slot: fn(&mut Config) -> Slot<'_>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Every configurable field.
pub static FIELDS: &[Field] = &[
    Field {
        name: "Verbose",
        slot: |c| Slot::Bool(&mut c.verbose),
    },
    Field {
        name: "ConfigFile",
        slot: |c| Slot::Str(&mut c.config_file),
    },
    Field {
        name: "Hostname",
        slot: |c| Slot::Str(&mut c.hostname),
    },
    Field {
        name: "Server",
        slot: |c| Slot::Str(&mut c.server),
    },
    Field {
        name: "Port",
        slot: |c| Slot::Int(&mut c.port),
    },
    Field {
        name: "Postmaster",
        slot: |c| Slot::Str(&mut c.postmaster),
    },
    Field {
        name: "ScanMessage",
        slot: |c| Slot::Bool(&mut c.scan_message),
    },
    Field {
        name: "Authentication_User",
        slot: |c| Slot::Str(&mut c.auth.user),
    },
    Field {
        name: "Authentication_Password",
        slot: |c| Slot::Str(&mut c.auth.password),
    },
    Field {
        name: "Authentication_Identity",
        slot: |c| Slot::Str(&mut c.auth.identity),
    },
    Field {
        name: "Authentication_Mechanism",
        slot: |c| Slot::Str(&mut c.auth.mechanism),
    },
    Field {
        name: "Authentication_ForceStartTLS",
        slot: |c| Slot::Bool(&mut c.auth.force_starttls),
    },
    Field {
        name: "Authentication_InsecureSkipVerify",
        slot: |c| Slot::Bool(&mut c.auth.insecure_skip_verify),
    },
    Field {
        name: "Message_To",
        slot: |c| Slot::List(&mut c.message.to),
    },
    Field {
        name: "Message_From",
        slot: |c| Slot::Str(&mut c.message.from),
    },
    Field {
        name: "Message_FromName",
        slot: |c| Slot::Str(&mut c.message.from_name),
    },
    Field {
        name: "Message_Subject",
        slot: |c| Slot::Str(&mut c.message.subject),
    },
    Field {
        name: "Message_FromCronDaemon",
        slot: |c| Slot::Bool(&mut c.message.from_cron_daemon),
    },
    Field {
        name: "Message_Bcc",
        slot: |c| Slot::Str(&mut c.message.bcc),
    },
];

/// Looks up a field by its exact key.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static Field> {
    FIELDS.iter().find(|field| field.name == name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(lookup("Server").is_some());
        assert!(lookup("server").is_none());
        assert!(lookup("Authentication_user").is_none());
    }

    #[test]
    fn test_slot_reaches_field() {
        let mut config = Config::default();
        if let Slot::Str(server) = (lookup("Server").unwrap().slot)(&mut config) {
            *server = "relay.example.com".to_string();
        }
        assert_eq!(config.server, "relay.example.com");
    }

    #[test]
    fn test_field_names_unique() {
        for (i, field) in FIELDS.iter().enumerate() {
            assert!(
                FIELDS[i + 1..].iter().all(|other| other.name != field.name),
                "duplicate field {}",
                field.name
            );
        }
    }

    #[test]
    fn test_type_names() {
        let mut config = Config::default();
        assert_eq!((lookup("Port").unwrap().slot)(&mut config).type_name(), "integer");
        assert_eq!((lookup("Message_To").unwrap().slot)(&mut config).type_name(), "list");
    }
}
