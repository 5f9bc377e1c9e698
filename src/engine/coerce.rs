//! Dynamic type coercion
//!
//! The cascade, first match wins:
//!
//! 1. empty or a null token → [`Value::Null`]
//! 2. integer shape → [`Value::Int`] (or [`Value::Float`] when it overflows `i64`)
//! 3. float shape → [`Value::Float`]
//! 4. boolean token → [`Value::Bool`]
//! 5. ISO-8601 date shape that chrono accepts → [`Value::Date`]
//! 6. otherwise the text as [`Value::String`]
//!
//! Results for non-empty texts are memoized in a [`BoundedCache`] owned by
//! the [`Coercer`], so a document pays the cascade once per distinct text
//! while the cache has room.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::cache::BoundedCache;
use super::options::{BooleanValues, ParseOptions};
use super::value::{Temporal, Value};

static INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("integer pattern is valid"));

static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][+-]?\d+)?$").expect("float pattern is valid")
});

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$",
    )
    .expect("date pattern is valid")
});

const ZONED_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an ISO-8601 shaped text into a date, date-time or zoned date-time
pub fn parse_temporal(text: &str) -> Option<Temporal> {
    if !ISO_DATE.is_match(text) {
        return None;
    }
    if text.len() == 10 {
        return NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .map(Temporal::Date);
    }

    let mut normalized = text.replacen(' ', "T", 1);
    if normalized.ends_with('Z') {
        normalized.pop();
        normalized.push_str("+00:00");
    }

    let zoned = normalized.len() > 16
        && normalized[16..]
            .bytes()
            .any(|b| b == b'+' || b == b'-');
    if zoned {
        ZONED_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
            .map(Temporal::Zoned)
    } else {
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
            .map(Temporal::DateTime)
    }
}

/// Run the cascade without memoization
pub fn coerce_value(text: &str, null_values: &[String], booleans: &BooleanValues) -> Value {
    if text.is_empty() || null_values.iter().any(|n| n == text) {
        return Value::Null;
    }
    if INTEGER.is_match(text) {
        return match text.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => text
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::String(text.to_string())),
        };
    }
    if FLOAT.is_match(text) {
        if let Ok(x) = text.parse::<f64>() {
            return Value::Float(x);
        }
    }
    if let Some(b) = booleans.lookup(text) {
        return Value::Bool(b);
    }
    if let Some(t) = parse_temporal(text) {
        return Value::Date(t);
    }
    Value::String(text.to_string())
}

/// Memoizing coercer owned by one decoder
#[derive(Debug, Clone)]
pub struct Coercer {
    null_values: Vec<String>,
    booleans: BooleanValues,
    cache: BoundedCache<String, Value>,
}

impl Coercer {
    /// Build from the typing options
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            null_values: options.null_values.clone(),
            booleans: options.boolean_values.clone(),
            cache: BoundedCache::new(options.cache_size),
        }
    }

    /// Coerce one field text
    pub fn coerce(&mut self, text: &str) -> Value {
        if text.is_empty() {
            return Value::Null;
        }
        if let Some(v) = self.cache.get(text) {
            return v.clone();
        }
        let value = coerce_value(text, &self.null_values, &self.booleans);
        self.cache.insert(text.to_string(), value.clone());
        value
    }

    /// Cache statistics: `(hits, misses, hit_rate)`
    #[inline]
    pub fn cache_stats(&self) -> (u64, u64, f64) {
        self.cache.stats()
    }
}
