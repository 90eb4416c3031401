// File: ./src/sanitize.rs
//! Coercion of loosely-typed spreadsheet payloads into the strict record schema.
//!
//! Everything that arrives from the remote endpoint or from local storage goes
//! through this module exactly once. Cells may hold numbers where strings are
//! expected, full timestamps where a date or a wall-clock time is expected, and
//! arrays serialized as JSON text. Failures are isolated per record: a broken row
//! is dropped with a warning and the rest of the collection survives.
use crate::model::{Dataset, Event, HelpService, Record, RecordStatus};
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Dates and times are rendered with the full zone history: spreadsheet
/// time-only cells are dated 1899-12-30, when Moscow kept local mean time.
const REFERENCE_TZ: Tz = chrono_tz::Europe::Moscow;

static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{2}:[0-9]{2}").expect("valid clock regex"));

static NULL: Value = Value::Null;

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

// --- PRIMITIVE COERCIONS ---

/// Spreadsheet "empty" values: null, `false`, `0`, `""`.
fn is_falsy(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_none_or(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn format_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        // Integral floats print like spreadsheet cells do: 5.0 -> "5"
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Textual form of any raw value. Only null becomes the empty string.
pub fn coerce_string(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::Array(_) | Value::Object(_) => raw.to_string(),
    }
}

pub fn coerce_bool(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1"
        ),
        _ => false,
    }
}

fn coerce_id(raw: &Value) -> String {
    if is_falsy(raw) {
        return Utc::now().timestamp_millis().to_string();
    }
    coerce_string(raw)
}

fn coerce_status(raw: &Value) -> RecordStatus {
    RecordStatus::from(coerce_string(raw))
}

// --- DATES & TIMES ---

fn has_timestamp_marker(s: &str) -> bool {
    s.contains('T') || s.contains('Z')
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Calendar date (`YYYY-MM-DD`) in the reference timezone, or the first ten
/// characters of the input when it is not a parseable timestamp.
pub fn normalize_date(raw: &Value) -> String {
    if is_falsy(raw) {
        return String::new();
    }
    let text = coerce_string(raw);
    if has_timestamp_marker(&text)
        && let Some(instant) = parse_instant(&text)
    {
        return instant
            .with_timezone(&REFERENCE_TZ)
            .format("%Y-%m-%d")
            .to_string();
    }
    take_chars(&text, 10)
}

/// Wall-clock time (`HH:MM`, 24h) in the reference timezone. Falls back to the
/// first `dd:dd` group of the input, then to its first five characters.
pub fn normalize_time(raw: &Value) -> String {
    if is_falsy(raw) {
        return String::new();
    }
    let text = coerce_string(raw);
    if has_timestamp_marker(&text)
        && let Some(instant) = parse_instant(&text)
    {
        return instant
            .with_timezone(&REFERENCE_TZ)
            .format("%H:%M")
            .to_string();
    }
    CLOCK_RE
        .find(&text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| take_chars(&text, 5))
}

/// Contact method tags: an array is taken element-wise, a string starting
/// with `[` is decoded as JSON, anything else yields no methods.
///
/// A string that looks like an array but does not decode is an error, which
/// drops the enclosing record.
pub fn coerce_contact_methods(raw: &Value) -> Result<Vec<String>> {
    match raw {
        Value::Array(items) => Ok(items.iter().map(coerce_string).collect()),
        Value::String(s) if s.starts_with('[') => {
            let parsed: Value =
                serde_json::from_str(s).context("contactMethods holds malformed JSON")?;
            match parsed {
                Value::Array(items) => Ok(items.iter().map(coerce_string).collect()),
                other => bail!("contactMethods decoded to {}, expected an array", other),
            }
        }
        _ => Ok(Vec::new()),
    }
}

// --- RECORDS ---

fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a Value {
    obj.get(key).unwrap_or(&NULL)
}

fn as_record(raw: &Value) -> Result<&Map<String, Value>> {
    raw.as_object().ok_or_else(|| match raw {
        Value::Null => anyhow!("record is null"),
        other => anyhow!("record is not an object: {}", other),
    })
}

pub fn sanitize_event(raw: &Value) -> Result<Event> {
    let obj = as_record(raw)?;
    Ok(Event {
        id: coerce_id(field(obj, "id")),
        title: coerce_string(field(obj, "title")),
        date: normalize_date(field(obj, "date")),
        time: normalize_time(field(obj, "time")),
        location: coerce_string(field(obj, "location")),
        district: coerce_string(field(obj, "district")),
        accessibility: coerce_string(field(obj, "accessibility")),
        category: coerce_string(field(obj, "category")),
        description: coerce_string(field(obj, "description")),
        registration_link: coerce_string(field(obj, "registrationLink")),
        contact_name: coerce_string(field(obj, "contactName")),
        contact_phone: coerce_string(field(obj, "contactPhone")),
        contact_methods: coerce_contact_methods(field(obj, "contactMethods"))?,
        status: coerce_status(field(obj, "status")),
    })
}

pub fn sanitize_help(raw: &Value) -> Result<HelpService> {
    let obj = as_record(raw)?;
    Ok(HelpService {
        id: coerce_id(field(obj, "id")),
        org_name: coerce_string(field(obj, "orgName")),
        help_type: coerce_string(field(obj, "helpType")),
        description: coerce_string(field(obj, "description")),
        district: coerce_string(field(obj, "district")),
        contacts: coerce_string(field(obj, "contacts")),
        is_free: coerce_bool(field(obj, "isFree")),
        conditions: coerce_string(field(obj, "conditions")),
        status: coerce_status(field(obj, "status")),
    })
}

// --- COLLECTIONS ---

#[derive(Debug)]
pub struct Rejected {
    /// Position in the raw input.
    pub index: usize,
    pub reason: String,
}

/// Outcome of sanitizing a collection: survivors in input order plus the
/// records that had to be dropped.
#[derive(Debug)]
pub struct Partitioned<T> {
    pub items: Vec<T>,
    pub rejected: Vec<Rejected>,
}

/// Runs `sanitizer` over every element of `raw`. A non-array input is treated
/// as an empty collection.
pub fn partition_collection<T, F>(raw: &Value, sanitizer: F) -> Partitioned<T>
where
    F: Fn(&Value) -> Result<T>,
{
    let mut out = Partitioned {
        items: Vec::new(),
        rejected: Vec::new(),
    };
    let Some(list) = raw.as_array() else {
        return out;
    };
    for (index, item) in list.iter().enumerate() {
        match sanitizer(item) {
            Ok(record) => out.items.push(record),
            Err(e) => out.rejected.push(Rejected {
                index,
                reason: format!("{:#}", e),
            }),
        }
    }
    out
}

/// Like [`partition_collection`], logging and discarding the rejects.
pub fn sanitize_collection<T, F>(raw: &Value, sanitizer: F) -> Vec<T>
where
    T: Record,
    F: Fn(&Value) -> Result<T>,
{
    let result = partition_collection(raw, sanitizer);
    for r in &result.rejected {
        log::warn!("Skipping corrupted {} #{}: {}", T::KIND, r.index, r.reason);
    }
    result.items
}

/// Decodes a full `{ events, help }` payload. Missing keys are empty
/// collections; a payload that is not an object is an error.
pub fn clean_incoming(data: &Value) -> Result<Dataset> {
    let obj = data
        .as_object()
        .ok_or_else(|| anyhow!("payload is not an object"))?;
    Ok(Dataset {
        events: sanitize_collection(field(obj, "events"), sanitize_event),
        help: sanitize_collection(field(obj, "help"), sanitize_help),
    })
}

// --- OUTBOUND ---

/// Outbound pass applied before anything is persisted. Dates and times are
/// assumed to be schema-shaped already and are left alone.
pub fn normalize_for_write<T: Record>(record: &T) -> T {
    let mut out = record.clone();
    let status = out.status_mut();
    if status.as_str().trim().is_empty() {
        *status = RecordStatus::Pending;
    }
    out
}

pub fn normalize_dataset_for_write(data: &Dataset) -> Dataset {
    Dataset {
        events: data.events.iter().map(normalize_for_write).collect(),
        help: data.help.iter().map(normalize_for_write).collect(),
    }
}
