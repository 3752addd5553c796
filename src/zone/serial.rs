//! SOA serial maintenance in `YYYYMMDDNN` form.
//!
//! The serial is located textually rather than through the parser so that
//! bumping it never reformats the rest of the file. The first 10-digit
//! token followed by a `; serial` comment wins; failing that, the first
//! whitespace-delimited 10-digit token. Content with neither is returned
//! unchanged.

use crate::error::{ManagerError, Result};
use chrono::{Local, NaiveDate};
use regex::{Match, Regex};
use std::sync::LazyLock;
use tracing::{trace, warn};

static COMMENTED_SERIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\s+)([0-9]{10})(\s*;\s*serial)").expect("serial regex is valid")
});

static BARE_SERIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s+)([0-9]{10})(\s)").expect("serial regex is valid"));

/// Serial for the first revision made on `today`
pub fn initial_serial(today: NaiveDate) -> String {
    format!("{}01", today.format("%Y%m%d"))
}

/// Successor of `current` when written on `today`.
///
/// Same day bumps the two-digit sequence, any other day restarts at `01`.
pub fn next_serial(current: &str, today: NaiveDate) -> String {
    let date = today.format("%Y%m%d").to_string();
    match current.strip_prefix(date.as_str()) {
        Some(seq) => {
            let next = seq.parse::<u32>().unwrap_or(0) + 1;
            if next > 99 {
                warn!(
                    "SOA serial sequence for {} exceeded 99 revisions, writing {}{:02}",
                    date, date, next
                );
            }
            format!("{}{:02}", date, next)
        }
        None => initial_serial(today),
    }
}

/// Bump the serial in `content` using the local calendar date
pub fn increment_serial(content: &str) -> String {
    increment_serial_for(content, Local::now().date_naive())
}

/// Bump the serial in `content` as if written on `today`
pub fn increment_serial_for(content: &str, today: NaiveDate) -> String {
    match locate_serial(content) {
        Some(serial) => splice_serial(content, serial, &next_serial(serial.as_str(), today)),
        None => {
            trace!("No SOA serial token found, content left unchanged");
            content.to_string()
        }
    }
}

/// Like [`increment_serial_for`], but refuses a successor that no longer
/// fits the 32-bit SOA serial field
pub fn try_increment_serial_for(content: &str, today: NaiveDate) -> Result<String> {
    let Some(serial) = locate_serial(content) else {
        trace!("No SOA serial token found, content left unchanged");
        return Ok(content.to_string());
    };

    let next = next_serial(serial.as_str(), today);
    if next.parse::<u32>().is_err() {
        return Err(ManagerError::Validation(format!(
            "SOA serial {} after {} does not fit in 32 bits",
            next,
            serial.as_str()
        )));
    }
    Ok(splice_serial(content, serial, &next))
}

fn locate_serial(content: &str) -> Option<Match<'_>> {
    COMMENTED_SERIAL
        .captures(content)
        .or_else(|| BARE_SERIAL.captures(content))
        .and_then(|c| c.get(2))
}

fn splice_serial(content: &str, serial: Match<'_>, next: &str) -> String {
    trace!("SOA serial {} -> {}", serial.as_str(), next);
    let mut bumped = String::with_capacity(content.len() + 1);
    bumped.push_str(&content[..serial.start()]);
    bumped.push_str(next);
    bumped.push_str(&content[serial.end()..]);
    bumped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn zone(serial: &str) -> String {
        format!(
            "@ IN SOA ns1.example.com. admin.example.com. (\n    {} ; serial\n    3600 ; refresh\n)\n",
            serial
        )
    }

    #[test]
    fn test_same_day_increments_sequence() {
        let today = day(2024, 1, 1);
        let once = increment_serial_for(&zone("2024010100"), today);
        assert_eq!(once, zone("2024010101"));
        let twice = increment_serial_for(&once, today);
        assert_eq!(twice, zone("2024010102"));
    }

    #[test]
    fn test_new_day_resets_sequence() {
        let bumped = increment_serial_for(&zone("2024010107"), day(2024, 3, 15));
        assert_eq!(bumped, zone("2024031501"));

        // A serial from the future is still reset
        let bumped = increment_serial_for(&zone("2099123199"), day(2024, 3, 15));
        assert_eq!(bumped, zone("2024031501"));
    }

    #[test]
    fn test_commented_serial_preferred_over_earlier_token() {
        let content = "; built 1234567890 \n@ IN SOA ns1 admin (\n 2024010105 ; serial\n)\n";
        let bumped = increment_serial_for(content, day(2024, 1, 1));
        assert!(bumped.contains("1234567890"));
        assert!(bumped.contains("2024010106 ; serial"));
    }

    #[test]
    fn test_single_line_soa_without_comment() {
        let content = "@ IN SOA ns1 admin 2024010101 3600 900 604800 300\n";
        let bumped = increment_serial_for(content, day(2024, 1, 2));
        assert_eq!(bumped, "@ IN SOA ns1 admin 2024010201 3600 900 604800 300\n");
    }

    #[test]
    fn test_no_serial_is_noop() {
        let content = "www IN A 10.0.0.1\n";
        assert_eq!(increment_serial_for(content, day(2024, 1, 1)), content);
    }

    #[test]
    fn test_sequence_overflow_is_written_as_is() {
        assert_eq!(next_serial("2024010199", day(2024, 1, 1)), "20240101100");
    }

    #[test]
    fn test_checked_bump_refuses_out_of_range_serial() {
        let today = day(2024, 1, 1);
        assert_eq!(
            try_increment_serial_for(&zone("2024010198"), today).unwrap(),
            zone("2024010199")
        );
        let err = try_increment_serial_for(&zone("2024010199"), today).unwrap_err();
        assert!(matches!(err, ManagerError::Validation(_)));
        assert!(err.to_string().contains("20240101100"));

        // A new day is always representable
        assert_eq!(
            try_increment_serial_for(&zone("2024010199"), day(2024, 1, 2)).unwrap(),
            zone("2024010201")
        );
    }

    #[test]
    fn test_initial_serial() {
        assert_eq!(initial_serial(day(2025, 12, 9)), "2025120901");
    }
}
