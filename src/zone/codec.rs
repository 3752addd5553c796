//! Conversion between zone file text and the editable record view.
//!
//! Mutations work on the text itself: records are appended as formatted
//! lines and removed line by line, so comments and layout the operator
//! wrote are kept as they are.

use super::parser::{RData, ResourceRecord, ZoneParser};
use super::record::{Record, RecordType, SoaData, fqdn, relative_name};
use super::serial::initial_serial;
use crate::error::{ManagerError, Result};
use chrono::NaiveDate;
use std::net::IpAddr;
use tracing::debug;

/// Editable records and SOA data derived from zone text
#[derive(Debug, Clone, Default)]
pub struct ParsedZone {
    pub records: Vec<Record>,
    pub soa: Option<SoaData>,
}

/// Parse zone text into the editable view.
///
/// Apex NS records and types outside [`RecordType`] are left out. When a
/// file holds several SOA records the last one is reported.
pub fn parse_zone(content: &str, origin: &str) -> Result<ParsedZone> {
    let origin = fqdn(origin);
    let resource_records = ZoneParser::new(&origin).parse(content)?;

    let mut zone = ParsedZone::default();
    for rr in resource_records {
        let name = relative_name(&rr.name, &origin);
        if let RData::Soa(soa) = &rr.rdata {
            zone.soa = Some(soa.clone());
            continue;
        }
        if let Some(record) = to_record(name, &rr) {
            zone.records.push(record);
        }
    }

    debug!(
        "Parsed zone {}: {} editable records, soa={}",
        origin,
        zone.records.len(),
        zone.soa.is_some()
    );
    Ok(zone)
}

fn to_record(name: String, rr: &ResourceRecord) -> Option<Record> {
    let record = match &rr.rdata {
        RData::A(addr) => Record::new(name, RecordType::A, addr.to_string()),
        RData::Aaaa(addr) => Record::new(name, RecordType::Aaaa, addr.to_string()),
        RData::Ns(_) if name == "@" => return None,
        RData::Ns(target) => Record::new(name, RecordType::Ns, target.clone()),
        RData::Cname(target) => Record::new(name, RecordType::Cname, target.clone()),
        RData::Mx {
            preference,
            exchange,
        } => Record::new(name, RecordType::Mx, exchange.clone()).with_priority(*preference),
        RData::Txt(strings) => Record::new(name, RecordType::Txt, strings.join(" ")),
        RData::Soa(_) | RData::Other { .. } => return None,
    };
    Some(record.with_ttl(rr.ttl))
}

/// Check that `content` is a zone that can be saved for `domain`
pub fn validate_zone(domain: &str, content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ManagerError::Validation(
            "zone file content cannot be empty".to_string(),
        ));
    }

    let records = ZoneParser::new(domain).parse(content)?;
    let soa_count = records
        .iter()
        .filter(|rr| matches!(rr.rdata, RData::Soa(_)))
        .count();

    match soa_count {
        0 => Err(ManagerError::Validation(
            "zone file must contain an SOA record".to_string(),
        )),
        1 => Ok(()),
        n => Err(ManagerError::Validation(format!(
            "zone file must contain exactly one SOA record, found {}",
            n
        ))),
    }
}

/// Content for a freshly created zone
pub fn default_zone(domain: &str, today: NaiveDate) -> String {
    let origin = fqdn(domain);
    format!(
        "$ORIGIN {origin}
$TTL 3600

@ IN SOA ns1.{origin} admin.{origin} (
    {serial} ; serial
    3600       ; refresh
    900        ; retry
    604800     ; expire
    300        ; minimum TTL
)

@ IN NS ns1.{origin}
",
        origin = origin,
        serial = initial_serial(today)
    )
}

/// Check a record before it is appended to the zone for `origin`
pub fn check_record(record: &Record, origin: &str) -> Result<()> {
    if record.name.is_empty() || record.name.contains(char::is_whitespace) {
        return Err(ManagerError::Validation(format!(
            "invalid record name: {:?}",
            record.name
        )));
    }
    if record.value.trim().is_empty() {
        return Err(ManagerError::Validation(
            "record value cannot be empty".to_string(),
        ));
    }
    if record.rtype == RecordType::Ns && record.name == "@" {
        return Err(ManagerError::Validation(
            "apex NS records are managed with the zone".to_string(),
        ));
    }

    let line = record.to_zone_line();
    let parsed = ZoneParser::new(origin)
        .parse(&line)
        .map_err(|e| ManagerError::Validation(format!("record does not parse: {}", e)))?;
    match parsed.as_slice() {
        [rr] if rr.rdata.type_name() == record.rtype.as_str() => Ok(()),
        _ => Err(ManagerError::Validation(format!(
            "record does not form a single {} record: {}",
            record.rtype, line
        ))),
    }
}

/// Append `record` as a new line, adding a newline first if the content
/// lacks a trailing one
pub fn append_record(content: &str, record: &Record) -> String {
    let mut out = String::with_capacity(content.len() + 64);
    out.push_str(content);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&record.to_zone_line());
    out.push('\n');
    out
}

/// Whether a single zone file line holds the described record.
///
/// The line is parsed on its own against `origin`. Comments, directives,
/// blank lines and lines that do not parse alone never match. The line is
/// trimmed first, so a continuation line that inherits its owner from the
/// line above has its first token read as the owner and does not match.
pub fn matches_record(
    line: &str,
    name: &str,
    rtype: RecordType,
    value: &str,
    origin: &str,
) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('$') {
        return false;
    }

    let origin = fqdn(origin);
    let Ok(parsed) = ZoneParser::new(&origin).parse(trimmed) else {
        return false;
    };
    let Some(rr) = parsed.first() else {
        return false;
    };
    if relative_name(&rr.name, &origin) != name {
        return false;
    }

    let same_target = |target: &str| {
        target.eq_ignore_ascii_case(value)
            || target.eq_ignore_ascii_case(&fqdn(value))
            || target.eq_ignore_ascii_case(&expand(value, &origin))
    };

    match (&rr.rdata, rtype) {
        (RData::A(addr), RecordType::A) => same_address(IpAddr::V4(*addr), value),
        (RData::Aaaa(addr), RecordType::Aaaa) => same_address(IpAddr::V6(*addr), value),
        (RData::Cname(target), RecordType::Cname) => same_target(target),
        (RData::Ns(target), RecordType::Ns) => same_target(target),
        (RData::Mx { exchange, .. }, RecordType::Mx) => same_target(exchange),
        (RData::Txt(strings), RecordType::Txt) => {
            let joined = strings.join(" ");
            joined == value || Some(joined.as_str()) == unquote(value)
        }
        _ => false,
    }
}

/// Remove the first line holding the described record.
///
/// All other bytes are kept exactly, including line endings.
pub fn remove_record_line(
    content: &str,
    name: &str,
    rtype: RecordType,
    value: &str,
    origin: &str,
) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    let mut removed = false;

    for line in content.split_inclusive('\n') {
        if !removed && matches_record(line, name, rtype, value, origin) {
            removed = true;
            continue;
        }
        out.push_str(line);
    }

    if removed {
        Ok(out)
    } else {
        Err(ManagerError::NotFound(format!(
            "record {} {} {}",
            name, rtype, value
        )))
    }
}

fn same_address(addr: IpAddr, value: &str) -> bool {
    value.parse::<IpAddr>().is_ok_and(|v| v == addr)
}

fn expand(name: &str, origin: &str) -> String {
    if name == "@" {
        origin.to_string()
    } else if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.{}", name, origin)
    }
}

fn unquote(value: &str) -> Option<&str> {
    value.strip_prefix('"')?.strip_suffix('"')
}
