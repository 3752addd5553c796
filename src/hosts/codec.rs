//! Line codec for `<ip> <hostname>` mapping files.

use crate::error::{ManagerError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub ip: String,
    pub hostname: String,
}

impl HostEntry {
    pub fn new(ip: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            hostname: hostname.into(),
        }
    }
}

/// A hosts file as read from disk; `raw` is authoritative
#[derive(Debug, Clone, Serialize)]
pub struct HostFile {
    pub domain: String,
    pub entries: Vec<HostEntry>,
    pub raw: String,
}

/// The `(ip, hostname)` fields of an entry line, `None` for blank lines,
/// comments and lines with fewer than two fields
fn entry_fields(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let mut fields = trimmed.split_whitespace();
    Some((fields.next()?, fields.next()?))
}

/// Entries in file order. Malformed lines are skipped silently.
pub fn parse_entries(content: &str) -> Vec<HostEntry> {
    content
        .lines()
        .filter_map(entry_fields)
        .map(|(ip, hostname)| HostEntry::new(ip, hostname))
        .collect()
}

pub fn format_entry(ip: &str, hostname: &str) -> String {
    format!("{}\t{}", ip, hostname)
}

/// Check an entry before it is appended
pub fn check_entry(ip: &str, hostname: &str) -> Result<()> {
    if ip.parse::<IpAddr>().is_err() {
        return Err(ManagerError::Validation(format!(
            "invalid IP address: {:?}",
            ip
        )));
    }
    if hostname.is_empty() || hostname.contains(char::is_whitespace) || hostname.contains('#') {
        return Err(ManagerError::Validation(format!(
            "invalid hostname: {:?}",
            hostname
        )));
    }
    Ok(())
}

/// Append an entry line, adding a newline first if the content lacks a
/// trailing one
pub fn append_entry(content: &str, ip: &str, hostname: &str) -> String {
    let mut out = String::with_capacity(content.len() + ip.len() + hostname.len() + 2);
    out.push_str(content);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&format_entry(ip, hostname));
    out.push('\n');
    out
}

/// Remove the first line whose first two fields are exactly `ip` and
/// `hostname`. Every other line is kept byte for byte.
pub fn remove_entry_line(content: &str, ip: &str, hostname: &str) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    let mut removed = false;

    for line in content.split_inclusive('\n') {
        if !removed && entry_fields(line) == Some((ip, hostname)) {
            removed = true;
            continue;
        }
        out.push_str(line);
    }

    if removed {
        Ok(out)
    } else {
        Err(ManagerError::NotFound(format!("entry {} {}", ip, hostname)))
    }
}

/// Content for a freshly created hosts file
pub fn default_hosts(domain: &str) -> String {
    format!("# Hosts for {}\n# <ip>\t<hostname>\n", domain)
}
