//! Conversion of raw cells into typed values.
//!
//! Both coercions are total: anything that does not yield a finite number or
//! a real calendar date becomes `None`. Malformed input is reported only
//! through the run-wide warning counters.

use super::normalizer::CellValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Coerces cells to numbers and dates, optionally tracing every conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coercer {
    trace: bool,
}

impl Coercer {
    pub fn new(trace: bool) -> Self {
        Self { trace }
    }

    /// Finite number from `value`, or `None`.
    ///
    /// Text uses the first comma as decimal separator and is parsed leniently:
    /// the longest numeric prefix counts, so `"12.5 m"` yields `12.5`.
    pub fn number(&self, value: Option<&CellValue>) -> Option<f64> {
        let value = value.filter(|v| !v.is_empty())?;
        let parsed = match value {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_float_prefix(&s.replacen(',', ".", 1)),
        }
        .filter(|n| n.is_finite());
        if self.trace {
            match parsed {
                Some(n) => debug!("[num] {} => {}", value.as_text(), n),
                None => debug!("[num] {} => invalid", value.as_text()),
            }
        }
        parsed
    }

    /// Calendar date from `value`, or `None`.
    pub fn date(&self, value: Option<&str>) -> Option<NaiveDate> {
        let value = value.filter(|v| !v.is_empty())?;
        let parsed = parse_date(value);
        if self.trace {
            match parsed {
                Some(d) => debug!("[date] {} => {}", value, d),
                None => debug!("[date] {} => invalid", value),
            }
        }
        parsed
    }
}

/// Builds `YYYY-MM-DD` from separate components, left-padding month and day.
///
/// Returns `None` unless all three parts are present and non-empty.
pub fn assemble_date(year: Option<&str>, month: Option<&str>, day: Option<&str>) -> Option<String> {
    match (year, month, day) {
        (Some(y), Some(m), Some(d)) if !y.is_empty() && !m.is_empty() && !d.is_empty() => {
            Some(format!("{}-{:0>2}-{:0>2}", y, m, d))
        }
        _ => None,
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc().date());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    parse_partial_date(value)
}

/// `YYYY-MM` resolves to the first of the month, a bare `YYYY` to January 1st.
fn parse_partial_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.split('-');
    let year_part = parts.next()?;
    if year_part.len() != 4 || !year_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = year_part.parse::<i32>().ok()?;
    let month = match parts.next() {
        Some(m) if m.len() == 2 => m.parse::<u32>().ok()?,
        Some(_) => return None,
        None => 1,
    };
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Parses the longest leading decimal literal of `value`, ignoring leading
/// whitespace and any trailing garbage.
fn parse_float_prefix(value: &str) -> Option<f64> {
    let s = value.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok()
}
