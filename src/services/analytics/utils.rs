use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_SHAPE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\d{1,4}[-/]\d{1,2}[-/]\d{1,4}").ok());

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

// `%y` is tried before `%Y` so that "1/5/20" lands in 2020 rather than year 20.
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%y",
    "%m-%d-%Y",
];

/// Locale-invariant decimal parse of a whole cell: optional sign, digits with
/// an optional fraction, optional exponent. Surrounding whitespace is ignored.
/// Words such as `NaN` or `inf`, partial numbers like `12kg` and values that
/// overflow `f64` are rejected.
pub fn parse_float(text: &str) -> Option<f64> {
    let s = text.trim();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        let frac_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        digits += end - frac_start;
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        end += 1;
        if end < bytes.len() && matches!(bytes[end], b'+' | b'-') {
            end += 1;
        }
        let exp_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end == exp_start {
            return None;
        }
    }

    if end != bytes.len() {
        return None;
    }
    // Overflowing exponents parse to infinity
    s.parse().ok().filter(|v: &f64| v.is_finite())
}

/// Calendar date parse over the formats spreadsheets commonly export.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS.iter() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// True when the text both parses as a date and has the `d-d-d` / `d/d/d` shape.
pub fn is_date_string(text: &str) -> bool {
    let shaped = DATE_SHAPE.as_ref().map_or(false, |re| re.is_match(text));
    shaped && parse_date(text).is_some()
}
