use super::constants;
use super::record::SoaData;
use crate::error::{ManagerError, Result};
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::{debug, trace};

/// Record types recognised by the grammar but not exposed for editing
const PASSTHROUGH_TYPES: &[&str] = &[
    "PTR", "SRV", "CAA", "DNAME", "NAPTR", "SSHFP", "TLSA", "SMIMEA", "DS", "CDS", "DNSKEY",
    "CDNSKEY", "RRSIG", "NSEC", "NSEC3", "NSEC3PARAM", "HINFO", "SPF", "LOC", "CERT", "SVCB",
    "HTTPS", "URI", "OPENPGPKEY", "RP", "AFSDB", "KX",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    IN,
    CS,
    CH,
    HS,
}

/// Parsed record data, with names expanded to FQDNs
#[derive(Debug, Clone, PartialEq)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(String),
    Cname(String),
    Mx { preference: u16, exchange: String },
    Txt(Vec<String>),
    Soa(SoaData),
    /// Any other recognised type, rdata kept as text
    Other { rtype: String, data: String },
}

impl RData {
    pub fn type_name(&self) -> &str {
        match self {
            RData::A(_) => "A",
            RData::Aaaa(_) => "AAAA",
            RData::Ns(_) => "NS",
            RData::Cname(_) => "CNAME",
            RData::Mx { .. } => "MX",
            RData::Txt(_) => "TXT",
            RData::Soa(_) => "SOA",
            RData::Other { rtype, .. } => rtype.as_str(),
        }
    }
}

/// A fully resolved resource record
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    /// Owner name, fully qualified
    pub name: String,
    /// Effective TTL
    pub ttl: u32,
    pub class: RecordClass,
    pub rdata: RData,
    /// Line the record starts on
    pub line: usize,
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    quoted: bool,
}

/// One logical record or directive, possibly spanning several lines
#[derive(Debug)]
struct Entry {
    line: usize,
    inherits_owner: bool,
    tokens: Vec<Token>,
}

/// RFC 1035 zone file parser
pub struct ZoneParser {
    /// Current origin, fully qualified
    current_origin: String,
    /// Default TTL from $TTL
    default_ttl: Option<u32>,
    /// TTL of the previous record, used when no $TTL is set
    last_ttl: Option<u32>,
    /// Owner of the previous record, for lines starting with whitespace
    last_name: Option<String>,
    current_class: RecordClass,
}

impl ZoneParser {
    /// Create a parser that expands relative names against `origin`
    pub fn new(origin: &str) -> Self {
        let current_origin = if origin.is_empty() || origin.ends_with('.') {
            origin.to_string()
        } else {
            format!("{}.", origin)
        };
        Self {
            current_origin,
            default_ttl: None,
            last_ttl: None,
            last_name: None,
            current_class: RecordClass::IN,
        }
    }

    /// Parse zone file contents into resource records, in file order
    pub fn parse(&mut self, contents: &str) -> Result<Vec<ResourceRecord>> {
        if contents.len() > constants::MAX_ZONE_FILE_SIZE {
            return Err(ManagerError::Validation(
                "Zone file exceeds maximum size".to_string(),
            ));
        }

        let entries = tokenize(contents).map_err(ManagerError::Parse)?;
        let mut records = Vec::new();

        for entry in entries {
            let first = &entry.tokens[0];
            let result = if !first.quoted && first.text.starts_with('$') {
                self.parse_directive(&entry, &mut records)
            } else {
                self.parse_record(&entry.tokens, entry.inherits_owner, entry.line)
                    .map(|rr| records.push(rr))
            };
            result.map_err(|e| ManagerError::Parse(format!("Line {}: {}", entry.line, e)))?;
        }

        debug!(
            "Parsed {} records under origin {}",
            records.len(),
            self.current_origin
        );
        Ok(records)
    }

    fn parse_directive(
        &mut self,
        entry: &Entry,
        records: &mut Vec<ResourceRecord>,
    ) -> std::result::Result<(), String> {
        let parts = &entry.tokens;
        match parts[0].text.to_uppercase().as_str() {
            "$ORIGIN" => {
                let name = parts
                    .get(1)
                    .ok_or_else(|| "$ORIGIN requires domain name".to_string())?;
                let origin = self.expand_name(&name.text)?;
                debug!("Set origin to: {}", origin);
                self.current_origin = origin;
            }
            "$TTL" => {
                let value = parts
                    .get(1)
                    .ok_or_else(|| "$TTL requires value".to_string())?;
                let ttl = parse_ttl(&value.text)?;
                debug!("Set default TTL to: {}", ttl);
                self.default_ttl = Some(ttl);
            }
            "$INCLUDE" => {
                return Err("$INCLUDE is not allowed".to_string());
            }
            "$GENERATE" => {
                if parts.len() < 5 {
                    return Err("$GENERATE requires range, lhs, type, and rhs".to_string());
                }
                let (start, stop, step) = parse_generate_range(&parts[1].text)?;
                let count = (stop - start) / step + 1;
                if count > constants::MAX_GENERATE_RECORDS {
                    return Err(format!(
                        "$GENERATE would produce {} records (limit {})",
                        count,
                        constants::MAX_GENERATE_RECORDS
                    ));
                }

                let mut i = start;
                while i <= stop {
                    let mut tokens = Vec::with_capacity(parts.len() - 2);
                    for (pos, part) in parts[2..].iter().enumerate() {
                        // Only the owner and the rdata are templates
                        let is_template = pos == 0 || pos == parts.len() - 3;
                        let text = if is_template && !part.quoted {
                            expand_generate_template(&part.text, i)?
                        } else {
                            part.text.clone()
                        };
                        tokens.push(Token {
                            text,
                            quoted: part.quoted,
                        });
                    }
                    records.push(self.parse_record(&tokens, false, entry.line)?);
                    match i.checked_add(step) {
                        Some(next) => i = next,
                        None => break,
                    }
                }

                debug!("Generated {} records from $GENERATE", count);
            }
            other => {
                return Err(format!("Unknown directive: {}", other));
            }
        }
        Ok(())
    }

    /// Parse the tokens of a single resource record
    fn parse_record(
        &mut self,
        parts: &[Token],
        inherits_owner: bool,
        line: usize,
    ) -> std::result::Result<ResourceRecord, String> {
        trace!("Parsing record at line {}: {:?}", line, parts);

        let mut idx = 0;
        let name = if inherits_owner {
            self.last_name
                .clone()
                .ok_or_else(|| "No previous owner name to inherit".to_string())?
        } else {
            idx += 1;
            self.expand_name(&parts[0].text)?
        };

        let mut ttl = None;
        let mut class = None;
        let mut rtype = None;

        // TTL and class may appear in either order before the type
        while let Some(field) = parts.get(idx) {
            if field.quoted {
                return Err(format!("Unexpected quoted string: \"{}\"", field.text));
            }
            if ttl.is_none() && field.text.starts_with(|c: char| c.is_ascii_digit()) {
                ttl = Some(parse_ttl(&field.text)?);
                idx += 1;
                continue;
            }
            if class.is_none() {
                if let Some(parsed) = parse_class(&field.text) {
                    class = Some(parsed);
                    idx += 1;
                    continue;
                }
            }
            rtype = Some(parse_type(&field.text)?);
            idx += 1;
            break;
        }

        let rtype = rtype.ok_or_else(|| "Missing record type".to_string())?;
        let rdata_tokens = &parts[idx..];
        if rdata_tokens.is_empty() {
            return Err(format!("Missing RDATA for {} record", rtype));
        }

        let rdata = self.parse_rdata(&rtype, rdata_tokens)?;

        let ttl = match ttl {
            Some(explicit) => {
                self.last_ttl = Some(explicit);
                explicit
            }
            None => self
                .default_ttl
                .or(self.last_ttl)
                .unwrap_or(constants::DEFAULT_TTL),
        };
        let class = class.unwrap_or(self.current_class);
        self.current_class = class;
        self.last_name = Some(name.clone());

        Ok(ResourceRecord {
            name,
            ttl,
            class,
            rdata,
            line,
        })
    }

    fn parse_rdata(&self, rtype: &str, parts: &[Token]) -> std::result::Result<RData, String> {
        let expect = |n: usize| {
            if parts.len() == n {
                Ok(())
            } else {
                Err(format!(
                    "{} record requires {} fields, got {}",
                    rtype,
                    n,
                    parts.len()
                ))
            }
        };

        match rtype {
            "A" => {
                expect(1)?;
                parts[0]
                    .text
                    .parse()
                    .map(RData::A)
                    .map_err(|_| format!("Invalid IPv4 address: {}", parts[0].text))
            }
            "AAAA" => {
                expect(1)?;
                parts[0]
                    .text
                    .parse()
                    .map(RData::Aaaa)
                    .map_err(|_| format!("Invalid IPv6 address: {}", parts[0].text))
            }
            "NS" => {
                expect(1)?;
                Ok(RData::Ns(self.expand_name(&parts[0].text)?))
            }
            "CNAME" => {
                expect(1)?;
                Ok(RData::Cname(self.expand_name(&parts[0].text)?))
            }
            "MX" => {
                expect(2)?;
                let preference = parts[0]
                    .text
                    .parse()
                    .map_err(|_| format!("Invalid MX priority: {}", parts[0].text))?;
                Ok(RData::Mx {
                    preference,
                    exchange: self.expand_name(&parts[1].text)?,
                })
            }
            "TXT" => Ok(RData::Txt(parts.iter().map(|t| t.text.clone()).collect())),
            "SOA" => {
                expect(7)?;
                let serial = parts[2]
                    .text
                    .parse()
                    .map_err(|_| format!("Invalid SOA serial: {}", parts[2].text))?;
                Ok(RData::Soa(SoaData {
                    primary_server: self.expand_name(&parts[0].text)?,
                    admin_mailbox: self.expand_name(&parts[1].text)?,
                    serial,
                    refresh: parse_ttl(&parts[3].text)?,
                    retry: parse_ttl(&parts[4].text)?,
                    expire: parse_ttl(&parts[5].text)?,
                    min_ttl: parse_ttl(&parts[6].text)?,
                }))
            }
            _ => {
                let data = parts
                    .iter()
                    .map(|t| {
                        if t.quoted {
                            format!("\"{}\"", t.text)
                        } else {
                            t.text.clone()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(RData::Other {
                    rtype: rtype.to_string(),
                    data,
                })
            }
        }
    }

    /// Expand a possibly relative name against the current origin
    fn expand_name(&self, name: &str) -> std::result::Result<String, String> {
        if name.is_empty() {
            return Err("Empty domain name".to_string());
        }
        if name == "@" {
            if self.current_origin.is_empty() {
                return Err("'@' used without an origin".to_string());
            }
            return Ok(self.current_origin.clone());
        }
        if name.ends_with('.') && !name.ends_with("\\.") {
            return Ok(name.to_string());
        }
        if name.contains("..") {
            return Err(format!("Empty label in domain name: {}", name));
        }
        match self.current_origin.as_str() {
            "" => Err(format!("Relative name {} used without an origin", name)),
            "." => Ok(format!("{}.", name)),
            origin => Ok(format!("{}.{}", name, origin)),
        }
    }
}

/// Split zone text into logical entries.
///
/// Handles `;` comments, quoted strings (with backslash escapes kept
/// verbatim) and parenthesised continuation across lines.
fn tokenize(contents: &str) -> std::result::Result<Vec<Entry>, String> {
    let mut entries = Vec::new();
    let mut tokens: Vec<Token> = Vec::new();
    let mut current = String::new();
    let mut line = 1usize;
    let mut entry_line: Option<usize> = None;
    let mut inherits_owner = false;
    let mut at_line_start = true;
    let mut depth = 0usize;
    let mut paren_start_line = 0usize;

    let flush = |current: &mut String, tokens: &mut Vec<Token>| {
        if !current.is_empty() {
            tokens.push(Token {
                text: std::mem::take(current),
                quoted: false,
            });
        }
    };

    let mut chars = contents.chars().peekable();
    while let Some(ch) = chars.next() {
        let line_start = at_line_start;
        at_line_start = false;

        match ch {
            '"' => {
                flush(&mut current, &mut tokens);
                entry_line.get_or_insert(line);
                let quote_line = line;
                let mut text = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            text.push(c);
                            if let Some(escaped) = chars.next() {
                                if escaped == '\n' {
                                    line += 1;
                                }
                                text.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\n' => {
                            return Err(format!(
                                "Line {}: newline in quoted string",
                                quote_line
                            ));
                        }
                        _ => text.push(c),
                    }
                }
                if !closed {
                    return Err(format!("Line {}: unterminated quoted string", quote_line));
                }
                tokens.push(Token { text, quoted: true });
            }
            ';' => {
                flush(&mut current, &mut tokens);
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '(' => {
                flush(&mut current, &mut tokens);
                entry_line.get_or_insert(line);
                if depth == 0 {
                    paren_start_line = line;
                }
                depth += 1;
            }
            ')' => {
                flush(&mut current, &mut tokens);
                if depth == 0 {
                    return Err(format!("Line {}: unbalanced ')'", line));
                }
                depth -= 1;
            }
            '\n' => {
                flush(&mut current, &mut tokens);
                line += 1;
                at_line_start = true;
                if depth == 0 {
                    if !tokens.is_empty() {
                        entries.push(Entry {
                            line: entry_line.unwrap_or(line - 1),
                            inherits_owner,
                            tokens: std::mem::take(&mut tokens),
                        });
                    }
                    entry_line = None;
                    inherits_owner = false;
                }
            }
            ' ' | '\t' | '\r' => {
                if line_start && depth == 0 && tokens.is_empty() && current.is_empty() {
                    inherits_owner = true;
                }
                flush(&mut current, &mut tokens);
            }
            '\\' => {
                entry_line.get_or_insert(line);
                current.push(ch);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            _ => {
                entry_line.get_or_insert(line);
                current.push(ch);
            }
        }
    }

    flush(&mut current, &mut tokens);
    if depth > 0 {
        return Err(format!(
            "Unclosed parentheses starting at line {}",
            paren_start_line
        ));
    }
    if !tokens.is_empty() {
        entries.push(Entry {
            line: entry_line.unwrap_or(line),
            inherits_owner,
            tokens,
        });
    }

    Ok(entries)
}

/// Parse TTL value (supports suffixes like 1h, 30m, and combinations like 1h30m)
pub fn parse_ttl(s: &str) -> std::result::Result<u32, String> {
    let invalid = || format!("Invalid TTL value: {}", s);
    if s.is_empty() || !s.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    let mut number: Option<u64> = None;
    for ch in s.chars() {
        if let Some(digit) = ch.to_digit(10) {
            number = Some(number.unwrap_or(0) * 10 + u64::from(digit));
            if number.is_some_and(|n| n > u64::from(u32::MAX)) {
                return Err(invalid());
            }
            continue;
        }
        let multiplier = match ch.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86400,
            'w' => 604800,
            _ => return Err(invalid()),
        };
        total += number.take().ok_or_else(invalid)? * multiplier;
    }
    total += number.unwrap_or(0);

    u32::try_from(total).map_err(|_| invalid())
}

fn parse_class(s: &str) -> Option<RecordClass> {
    match s.to_uppercase().as_str() {
        "IN" => Some(RecordClass::IN),
        "CS" => Some(RecordClass::CS),
        "CH" => Some(RecordClass::CH),
        "HS" => Some(RecordClass::HS),
        _ => None,
    }
}

fn parse_type(s: &str) -> std::result::Result<String, String> {
    let upper = s.to_uppercase();
    match upper.as_str() {
        "A" | "AAAA" | "NS" | "CNAME" | "MX" | "TXT" | "SOA" => Ok(upper),
        t if PASSTHROUGH_TYPES.contains(&t) => Ok(upper),
        t if t.len() > 4
            && t.starts_with("TYPE")
            && t[4..].parse::<u16>().is_ok() =>
        {
            Ok(upper)
        }
        _ => Err(format!("Unknown record type or invalid field: {}", s)),
    }
}

/// Parse $GENERATE range specification: start-stop[/step]
fn parse_generate_range(range_str: &str) -> std::result::Result<(u32, u32, u32), String> {
    let (range, step) = match range_str.split_once('/') {
        Some((range, step)) => (
            range,
            step.parse::<u32>()
                .map_err(|_| format!("Invalid $GENERATE step: {}", step))?,
        ),
        None => (range_str, 1),
    };
    let (start, stop) = range
        .split_once('-')
        .ok_or_else(|| "$GENERATE range must contain '-'".to_string())?;
    let start = start
        .parse::<u32>()
        .map_err(|_| format!("Invalid $GENERATE start: {}", start))?;
    let stop = stop
        .parse::<u32>()
        .map_err(|_| format!("Invalid $GENERATE stop: {}", stop))?;

    if start > stop {
        return Err("$GENERATE start must be <= stop".to_string());
    }
    if step == 0 {
        return Err("$GENERATE step must be > 0".to_string());
    }
    Ok((start, stop, step))
}

/// Expand `$` and `${offset[,width[,base]]}` in a $GENERATE template
fn expand_generate_template(template: &str, value: u32) -> std::result::Result<String, String> {
    let mut result = String::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(&'$') = chars.peek() {
                    chars.next();
                    result.push('$');
                } else {
                    result.push(ch);
                }
            }
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let mut spec = String::new();
                let mut found_close = false;
                for ch in chars.by_ref() {
                    if ch == '}' {
                        found_close = true;
                        break;
                    }
                    spec.push(ch);
                }
                if !found_close {
                    return Err("Unclosed ${} in $GENERATE".to_string());
                }

                let fields: Vec<&str> = spec.split(',').collect();
                if fields.len() > 3 {
                    return Err(format!("Invalid $GENERATE modifier: ${{{}}}", spec));
                }
                let offset = fields[0]
                    .parse::<i64>()
                    .map_err(|_| format!("Invalid offset: {}", fields[0]))?;
                let width = match fields.get(1) {
                    Some(w) => w
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid width: {}", w))?,
                    None => 0,
                };
                let adjusted = i64::from(value) + offset;
                if adjusted < 0 {
                    return Err(format!("$GENERATE offset makes value negative: {}", adjusted));
                }
                let formatted = match fields.get(2).copied().unwrap_or("d") {
                    "d" => format!("{:0width$}", adjusted, width = width),
                    "o" => format!("{:0width$o}", adjusted, width = width),
                    "x" => format!("{:0width$x}", adjusted, width = width),
                    "X" => format!("{:0width$X}", adjusted, width = width),
                    base => {
                        return Err(format!(
                            "Invalid base '{}', expected d, o, x, or X",
                            base
                        ));
                    }
                };
                result.push_str(&formatted);
            }
            '$' => result.push_str(&value.to_string()),
            _ => result.push(ch),
        }
    }

    Ok(result)
}
