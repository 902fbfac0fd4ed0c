//! Payload validation for submitted inventory events.
//!
//! Everything here is pure: no clock, no store. The ingestion handler runs
//! these checks in order and stops at the first failure.

use axum::http::{header, HeaderMap};
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::classify::StatusPolicy;
use crate::models::SubmitEvent;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Request must be JSON.")]
    NotJson,

    #[error("Request body must be a JSON object.")]
    NotAnObject,

    #[error("Missing fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0} must be a string.")]
    NotAString(&'static str),

    #[error("inventory_level must be an integer.")]
    InvalidInventoryLevel,

    #[error("timestamp must be valid ISO 8601 format.")]
    InvalidTimestamp,
}

// ── Body ──────────────────────────────────────────────────────────────────────

/// Accept `application/json` and `application/*+json` bodies and parse them.
pub fn parse_json_body(headers: &HeaderMap, body: &[u8]) -> Result<Value, ValidationError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false);

    if !is_json {
        return Err(ValidationError::NotJson);
    }
    serde_json::from_slice(body).map_err(|_| ValidationError::NotJson)
}

// ── Fields ────────────────────────────────────────────────────────────────────

/// Required fields that are absent or `null`, in `required` order.
pub fn missing_fields<'a>(payload: &Map<String, Value>, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|field| payload.get(*field).map_or(true, Value::is_null))
        .collect()
}

/// Integer, integral float, or a string holding an integer.
pub fn parse_inventory_level(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_field(payload: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match payload.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(ValidationError::NotAString(field)),
    }
}

/// Run the field checks for `policy` against a decoded request body.
pub fn parse_submission(body: &Value, policy: StatusPolicy) -> Result<SubmitEvent, ValidationError> {
    let payload = body.as_object().ok_or(ValidationError::NotAnObject)?;

    let missing = missing_fields(payload, policy.required_fields());
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(
            missing.into_iter().map(str::to_string).collect(),
        ));
    }

    let entity = string_field(payload, "entity")?;
    let location = string_field(payload, "location")?;
    let inventory_level = payload
        .get("inventory_level")
        .and_then(parse_inventory_level)
        .ok_or(ValidationError::InvalidInventoryLevel)?;
    let timestamp = string_field(payload, "timestamp")?;

    if policy.checks_timestamp() && !is_valid_iso8601(&timestamp) {
        return Err(ValidationError::InvalidTimestamp);
    }

    let status = match policy {
        StatusPolicy::Supplied => Some(string_field(payload, "status")?),
        StatusPolicy::Computed => None,
    };

    Ok(SubmitEvent {
        entity,
        location,
        inventory_level,
        timestamp,
        status,
    })
}

// ── Timestamp ─────────────────────────────────────────────────────────────────

/// ISO-8601 date with optional time and UTC offset. Fails closed.
pub fn is_valid_iso8601(ts: &str) -> bool {
    if ts.is_empty() || !ts.is_ascii() {
        return false;
    }

    match ts.find(|c| c == 'T' || c == ' ') {
        Some(i) => valid_date(&ts[..i]) && valid_time_with_offset(&ts[i + 1..]),
        None => valid_date(ts),
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn valid_date(s: &str) -> bool {
    if s.len() < 4 || !all_digits(&s[..4]) {
        return false;
    }
    let Ok(year) = s[..4].parse::<i32>() else {
        return false;
    };

    let rest = &s[4..];
    if let Some(week) = rest.strip_prefix("-W") {
        return valid_week_date(year, week, true);
    }
    if let Some(week) = rest.strip_prefix('W') {
        return valid_week_date(year, week, false);
    }

    let (rest, extended) = match rest.strip_prefix('-') {
        Some(r) => (r, true),
        None => (rest, false),
    };
    let b = rest.as_bytes();
    match (b.len(), extended) {
        // YYYY
        (0, false) => true,
        // YYYY-MM
        (2, true) => ymd(year, rest, "01"),
        // YYYY-MM-DD
        (5, true) if b[2] == b'-' => ymd(year, &rest[..2], &rest[3..]),
        // YYYYMMDD
        (4, false) => ymd(year, &rest[..2], &rest[2..]),
        // YYYY-DDD, YYYYDDD
        (3, _) => all_digits(rest)
            && rest
                .parse::<u32>()
                .is_ok_and(|ordinal| NaiveDate::from_yo_opt(year, ordinal).is_some()),
        _ => false,
    }
}

fn ymd(year: i32, month: &str, day: &str) -> bool {
    if !(all_digits(month) && all_digits(day)) {
        return false;
    }
    match (month.parse(), day.parse()) {
        (Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(year, m, d).is_some(),
        _ => false,
    }
}

/// `Www`, `Www-D` (extended) or `WwwD` (basic); the leading `W` is already stripped.
fn valid_week_date(year: i32, s: &str, extended: bool) -> bool {
    const WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    let b = s.as_bytes();
    let (week, day) = match (b.len(), extended) {
        (2, _) => (s, "1"),
        (4, true) if b[2] == b'-' => (&s[..2], &s[3..]),
        (3, false) => (&s[..2], &s[2..]),
        _ => return false,
    };
    if !(all_digits(week) && all_digits(day)) {
        return false;
    }
    match (week.parse::<u32>(), day.parse::<usize>()) {
        (Ok(w), Ok(d)) if (1..=7).contains(&d) => {
            NaiveDate::from_isoywd_opt(year, w, WEEKDAYS[d - 1]).is_some()
        }
        _ => false,
    }
}

fn valid_time_with_offset(s: &str) -> bool {
    if let Some(time) = s.strip_suffix('Z') {
        return valid_time(time);
    }
    match s.rfind(|c| c == '+' || c == '-') {
        Some(i) => valid_time(&s[..i]) && valid_offset(&s[i + 1..]),
        None => valid_time(s),
    }
}

fn valid_offset(s: &str) -> bool {
    let b = s.as_bytes();
    let (hours, minutes) = match b.len() {
        2 => (s, "00"),
        4 => (&s[..2], &s[2..]),
        5 if b[2] == b':' => (&s[..2], &s[3..]),
        _ => return false,
    };
    all_digits(hours)
        && all_digits(minutes)
        && matches!((hours.parse::<u32>(), minutes.parse::<u32>()), (Ok(h), Ok(m)) if h <= 23 && m <= 59)
}

fn valid_time(s: &str) -> bool {
    let (clock, fraction) = match s.find(|c| c == '.' || c == ',') {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    if fraction.is_some_and(|f| !all_digits(f)) {
        return false;
    }

    let b = clock.as_bytes();
    let (hour, minute, second) = match b.len() {
        2 => (clock, "00", None),
        4 => (&clock[..2], &clock[2..], None),
        5 if b[2] == b':' => (&clock[..2], &clock[3..], None),
        6 => (&clock[..2], &clock[2..4], Some(&clock[4..])),
        8 if b[2] == b':' && b[5] == b':' => (&clock[..2], &clock[3..5], Some(&clock[6..])),
        _ => return false,
    };

    // Fractions only follow whole seconds.
    if fraction.is_some() && second.is_none() {
        return false;
    }
    let second = second.unwrap_or("00");

    if !(all_digits(hour) && all_digits(minute) && all_digits(second)) {
        return false;
    }
    match (hour.parse(), minute.parse(), second.parse()) {
        // 24:00 is midnight at the end of the day.
        (Ok(24), Ok(0), Ok(0)) => fraction.map_or(true, |f| f.bytes().all(|b| b == b'0')),
        (Ok(h), Ok(m), Ok(sec)) => NaiveTime::from_hms_opt(h, m, sec).is_some(),
        _ => false,
    }
}
