use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record types that can be edited through the structured API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
}

impl RecordType {
    pub const ALL: [RecordType; 6] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Mx,
        RecordType::Txt,
        RecordType::Ns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
        }
    }

    /// Whether the record value is a domain name
    pub fn is_name_valued(&self) -> bool {
        matches!(self, RecordType::Cname | RecordType::Mx | RecordType::Ns)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unsupported record type: {}", s))
    }
}

/// A single editable resource record, named relative to the zone origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Owner name relative to the origin ("@" for the apex)
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: RecordType,
    /// 0 means inherit the zone default
    #[serde(default)]
    pub ttl: u32,
    pub value: String,
    /// MX preference, ignored for other types
    #[serde(default)]
    pub priority: u16,
}

impl Record {
    pub fn new(name: impl Into<String>, rtype: RecordType, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rtype,
            ttl: 0,
            value: value.into(),
            priority: 0,
        }
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    /// Render as a zone file line: `<name> [<ttl> ]IN <TYPE> <value>`
    pub fn to_zone_line(&self) -> String {
        let ttl = if self.ttl > 0 {
            format!("{} ", self.ttl)
        } else {
            String::new()
        };

        match self.rtype {
            RecordType::Mx => format!(
                "{} {}IN MX {} {}",
                self.name, ttl, self.priority, self.value
            ),
            RecordType::Txt => {
                let value = if self.value.starts_with('"') {
                    self.value.clone()
                } else {
                    format!("\"{}\"", self.value)
                };
                format!("{} {}IN TXT {}", self.name, ttl, value)
            }
            _ => format!("{} {}IN {} {}", self.name, ttl, self.rtype, self.value),
        }
    }
}

/// Start of authority data for a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoaData {
    pub primary_server: String,
    pub admin_mailbox: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub min_ttl: u32,
}

/// A zone file as read from disk. `raw` is authoritative; `records` and
/// `soa` are derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneFile {
    pub domain: String,
    pub records: Vec<Record>,
    pub soa: Option<SoaData>,
    pub raw: String,
}

/// Append the root label if missing
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

/// Convert a fully qualified name into a name relative to `origin`.
///
/// `example.com.` under `example.com.` becomes `@`, `app.example.com.`
/// becomes `app`, names outside the origin stay fully qualified.
pub fn relative_name(name: &str, origin: &str) -> String {
    let name = fqdn(name);
    let origin = fqdn(origin);

    if name.eq_ignore_ascii_case(&origin) {
        return "@".to_string();
    }

    let suffix_len = origin.len() + 1;
    if name.len() > suffix_len && name.is_char_boundary(name.len() - suffix_len) {
        let (prefix, suffix) = name.split_at(name.len() - suffix_len);
        if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(&origin) {
            return prefix.to_string();
        }
    }

    name
}
