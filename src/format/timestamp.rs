//! SQL `DATETIME` text, in both directions.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::scan::Scanner;

/// How a zero timestamp is written.
pub const ZERO_DATE: &str = "0000-00-00";

const SQL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Local,
    Utc,
}

/// `YYYY-MM-DD HH:MM:SS` for [seconds] since the epoch, or `None` when chrono
///  cannot represent it.
pub fn render(seconds: i64, zone: Zone) -> Option<String> {
    if seconds == 0 {
        return Some(ZERO_DATE.to_string());
    }
    let utc = DateTime::from_timestamp(seconds, 0)?;
    Some(match zone {
        Zone::Utc => utc.format(SQL_DATETIME).to_string(),
        Zone::Local => utc.with_timezone(&Local).format(SQL_DATETIME).to_string(),
    })
}

fn take_digits(s: &mut Scanner, max: usize) -> u32 {
    let mut value = 0;
    for _ in 0..max {
        match s.peek() {
            Some(b) if b.is_ascii_digit() => {
                value = value * 10 + u32::from(b - b'0');
                s.advance(1);
            }
            _ => break,
        }
    }
    value
}

/// Parses a SQL date or datetime into seconds since the epoch.
///
/// Accepts `YYYY-MM-DD[ |T]HH:MM:SS[.fff][Z]` with every separator optional.
///  The all-zero date is `Some(0)`. A trailing `Z` reads the time as UTC
///  whatever [zone] says.
pub fn parse_datetime(text: &str, zone: Zone) -> Option<i64> {
    let mut s = Scanner::new(text.as_bytes());
    let year = take_digits(&mut s, 4);
    s.consume1(b'-');
    let month = take_digits(&mut s, 2);
    s.consume1(b'-');
    let day = take_digits(&mut s, 2);
    if !s.consume1(b' ') {
        s.consume1(b'T');
    }
    let hour = take_digits(&mut s, 2);
    s.consume1(b':');
    let minute = take_digits(&mut s, 2);
    s.consume1(b':');
    let second = take_digits(&mut s, 2);
    if s.consume1(b'.') {
        s.consume_while(|b| b.is_ascii_digit());
    }

    if [year, month, day, hour, minute, second].iter().all(|&v| v == 0) {
        return Some(0);
    }
    if year == 0 || month == 0 || day == 0 {
        return None;
    }
    let naive = NaiveDate::from_ymd_opt(year as i32, month, day)?.and_hms_opt(hour, minute, second)?;
    if s.peek() == Some(b'Z') || zone == Zone::Utc {
        return Some(naive.and_utc().timestamp());
    }
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.timestamp())
}
