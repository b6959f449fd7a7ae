// field.rs: the closed set of field kinds a layout token can be classified as
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Recognized roles for a layout token. Anything else is carried through as a
/// custom property under the token's own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Date,
    Time,
    Timestamp,
    Message,
    Level,
    Logger,
    Thread,
    Line,
}

impl FieldKind {
    pub const ALL: [FieldKind; 8] = [
        FieldKind::Date,
        FieldKind::Time,
        FieldKind::Timestamp,
        FieldKind::Message,
        FieldKind::Level,
        FieldKind::Logger,
        FieldKind::Thread,
        FieldKind::Line,
    ];

    /// Canonical property name used on output records.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Message => "message",
            FieldKind::Level => "level",
            FieldKind::Logger => "logger",
            FieldKind::Thread => "thread",
            FieldKind::Line => "line",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FieldKind::Date => "Date of the log. Used in conjunction with 'time'.",
            FieldKind::Time => "Time of the log. Used in conjunction with 'date'.",
            FieldKind::Timestamp => "Date and time of log. Mutually exclusive from 'date' and 'time'.",
            FieldKind::Message => "Log message.",
            FieldKind::Level => "Log level.",
            FieldKind::Logger => "Name of logger or class being logged.",
            FieldKind::Thread => "Name of thread.",
            FieldKind::Line => "Line number.",
        }
    }

    /// Case-insensitive lookup; `None` means the name is a custom property.
    pub fn lookup(name: &str) -> Option<FieldKind> {
        KIND_BY_NAME.get(name.trim().to_ascii_lowercase().as_str()).copied()
    }

    /// Renders the "known parameters" table shown in help output.
    pub fn describe_all() -> String {
        let mut out = String::from("--------- KNOWN PARAMETERS ---------\n\n");
        for kind in FieldKind::ALL {
            let marker = format!("<{}>", kind.as_str());
            out.push_str(&format!("{:<12}  {}\n", marker, kind.description()));
        }
        out
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static KIND_BY_NAME: Lazy<HashMap<&'static str, FieldKind>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, FieldKind> = HashMap::with_capacity(FieldKind::ALL.len() + 2);
    for kind in FieldKind::ALL {
        map.insert(kind.as_str(), kind);
    }
    // aliases
    map.insert("log-level", FieldKind::Level);
    map.insert("loglevel", FieldKind::Level);
    map
});

#[cfg(test)]
mod tests {
    use super::FieldKind;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(FieldKind::lookup("DATE"), Some(FieldKind::Date));
        assert_eq!(FieldKind::lookup("Thread"), Some(FieldKind::Thread));
        assert_eq!(FieldKind::lookup("timeStamp"), Some(FieldKind::Timestamp));
        assert_eq!(FieldKind::lookup(" line "), Some(FieldKind::Line));
    }

    #[test]
    fn test_lookup_aliases_and_custom() {
        assert_eq!(FieldKind::lookup("log-level"), Some(FieldKind::Level));
        assert_eq!(FieldKind::lookup("LogLevel"), Some(FieldKind::Level));
        assert_eq!(FieldKind::lookup("class"), None);
        assert_eq!(FieldKind::lookup("customField"), None);
        assert_eq!(FieldKind::lookup(""), None);
    }

    #[test]
    fn test_every_kind_round_trips_through_its_name() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::lookup(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_describe_all_lists_every_marker() {
        let table = FieldKind::describe_all();
        for kind in FieldKind::ALL {
            assert!(table.contains(&format!("<{}>", kind.as_str())), "missing {}", kind);
        }
    }
}
