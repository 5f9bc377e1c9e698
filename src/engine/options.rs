//! Parse configuration
//!
//! [`Dialect`] describes the bytes of the format (delimiter, quote, escape,
//! comment, line ending, trimming). [`ParseOptions`] adds everything the row
//! decoder needs: header handling, range filters, typing, error policy and
//! the user hooks.
//!
//! Both types follow the same pattern: `Default` gives RFC 4180 behaviour,
//! `with_*` setters chain, and the declarative subset can be loaded from JSON
//! with [`ParseOptions::from_json`]:
//!
//! ```rust
//! use delimit::engine::options::{ParseOptions, TrimMode};
//!
//! let options = ParseOptions::from_json(
//!     r#"{ "delimiter": ";", "trim": true, "maxRows": 10, "dynamicTyping": ["age"] }"#,
//! ).unwrap();
//! assert_eq!(options.dialect.delimiter, b';');
//! assert_eq!(options.dialect.trim, TrimMode::Both);
//! assert_eq!(options.max_rows, Some(10));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use encoding_rs::Encoding;
use serde::{Deserialize, Deserializer};

use super::error::{ConfigError, ParseError};
use super::row::Row;
use super::schema::{RowValidator, ValidatorHandle};
use super::value::Value;

/// Default field delimiter
pub const DEFAULT_DELIMITER: u8 = b',';

/// Default quote byte
pub const DEFAULT_QUOTE: u8 = b'"';

/// Default capacity of the per-document coercion cache
pub const DEFAULT_CACHE_SIZE: usize = 4096;

// ============================================================================
// Callback newtypes
// ============================================================================

/// Declares an `Arc`-wrapped closure option with an opaque `Debug`
macro_rules! callback {
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $ty:ty),*) -> $ret:ty) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Arc<dyn Fn($($ty),*) -> $ret + Send + Sync>);

        impl $name {
            /// Wrap a closure
            pub fn new<F>(f: F) -> Self
            where
                F: Fn($($ty),*) -> $ret + Send + Sync + 'static,
            {
                Self(Arc::new(f))
            }

            /// Invoke the closure
            #[inline]
            pub fn call(&self, $($arg: $ty),*) -> $ret {
                (self.0)($($arg),*)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

callback!(
    /// Relabels a header cell: `(name, index) -> new name`
    HeaderTransform,
    (name: &str, index: usize) -> String
);

callback!(
    /// Selects the columns dynamic typing applies to, by header name
    TypingPredicate,
    (column: &str) -> bool
);

callback!(
    /// Replaces the typing cascade: `(raw field, context) -> value`
    CastFn,
    (field: &str, context: &CastContext<'_>) -> Result<Value, String>
);

callback!(
    /// Keeps a decoded row when it returns `true`
    RowFilter,
    (row: &Row) -> bool
);

callback!(
    /// Rewrites a decoded row; `None` drops it
    RowTransform,
    (row: Row) -> Option<Row>
);

callback!(
    /// Decides what to do with a recoverable error
    ErrorHandler,
    (error: &ParseError) -> ErrorAction
);

/// What a cast hook knows about the field it converts
#[derive(Debug, Clone, Copy)]
pub struct CastContext<'a> {
    /// Header name of the column
    pub column: &'a str,
    /// Column position (0-based)
    pub index: usize,
    /// Physical line the row starts on
    pub line: usize,
}

// ============================================================================
// Dialect
// ============================================================================

/// Line terminator recognition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\r\n`, `\r` and `\n` are all row terminators
    #[default]
    Auto,
    /// This literal string is a terminator, tried before the standard ones
    Custom(String),
}

impl LineEnding {
    /// The custom terminator, if any
    #[inline]
    pub fn custom(&self) -> Option<&str> {
        match self {
            LineEnding::Auto => None,
            LineEnding::Custom(s) => Some(s),
        }
    }
}

/// Which ends of unquoted fields are trimmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrimMode {
    /// Fields are kept verbatim
    #[default]
    None,
    /// Leading whitespace is removed
    Left,
    /// Trailing whitespace is removed
    Right,
    /// Both ends are trimmed
    Both,
}

impl TrimMode {
    /// Build from independent left/right flags
    pub fn from_flags(left: bool, right: bool) -> Self {
        match (left, right) {
            (false, false) => TrimMode::None,
            (true, false) => TrimMode::Left,
            (false, true) => TrimMode::Right,
            (true, true) => TrimMode::Both,
        }
    }

    /// Whether leading whitespace is trimmed
    #[inline]
    pub fn left(self) -> bool {
        matches!(self, TrimMode::Left | TrimMode::Both)
    }

    /// Whether trailing whitespace is trimmed
    #[inline]
    pub fn right(self) -> bool {
        matches!(self, TrimMode::Right | TrimMode::Both)
    }
}

/// The byte-level format of the input
///
/// All special bytes must be ASCII; [`Dialect::validate`] enforces this so
/// the lexer may slice at any special byte without splitting a character.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "DialectRepr")]
pub struct Dialect {
    /// Field separator
    pub delimiter: u8,
    /// Quote byte; `None` disables quoting
    pub quote: Option<u8>,
    /// Escape byte inside quoted fields; a doubled quote is always an escape
    pub escape: Option<u8>,
    /// Lines starting with this byte are skipped
    pub comment: Option<u8>,
    /// Row terminator
    pub eol: LineEnding,
    /// Treat an unterminated quote as plain text instead of an error
    pub relax_quotes: bool,
    /// Whitespace trimming of unquoted fields
    pub trim: TrimMode,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            quote: Some(DEFAULT_QUOTE),
            escape: None,
            comment: None,
            eol: LineEnding::Auto,
            relax_quotes: false,
            trim: TrimMode::None,
        }
    }
}

impl Dialect {
    /// Default comma-separated dialect
    pub fn new() -> Self {
        Self::default()
    }

    /// Tab-separated dialect
    pub fn tsv() -> Self {
        Self::default().with_delimiter(b'\t')
    }

    /// Set the delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set or disable the quote byte
    pub fn with_quote(mut self, quote: Option<u8>) -> Self {
        self.quote = quote;
        self
    }

    /// Set or disable the escape byte
    pub fn with_escape(mut self, escape: Option<u8>) -> Self {
        self.escape = escape;
        self
    }

    /// Set or disable the comment byte
    pub fn with_comment(mut self, comment: Option<u8>) -> Self {
        self.comment = comment;
        self
    }

    /// Use a literal row terminator; `"auto"` restores the default
    pub fn with_eol(mut self, eol: &str) -> Self {
        self.eol = parse_eol(eol);
        self
    }

    /// Tolerate unterminated quotes
    pub fn with_relax_quotes(mut self, relax: bool) -> Self {
        self.relax_quotes = relax;
        self
    }

    /// Set the trim mode
    pub fn with_trim(mut self, trim: TrimMode) -> Self {
        self.trim = trim;
        self
    }

    /// Bytes of the custom terminator, if any
    #[inline]
    pub fn eol_bytes(&self) -> Option<&[u8]> {
        self.eol.custom().map(str::as_bytes)
    }

    /// Check that the dialect can be lexed unambiguously
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_byte("delimiter", self.delimiter)?;
        for (name, byte) in [
            ("quote", self.quote),
            ("escape", self.escape),
            ("comment", self.comment),
        ] {
            if let Some(b) = byte {
                check_byte(name, b)?;
            }
        }

        let pairs = [
            ("delimiter", Some(self.delimiter), "quote", self.quote),
            ("delimiter", Some(self.delimiter), "comment", self.comment),
            ("delimiter", Some(self.delimiter), "escape", self.escape),
            ("quote", self.quote, "comment", self.comment),
        ];
        for (first, a, second, b) in pairs {
            if let (Some(a), Some(b)) = (a, b) {
                if a == b {
                    return Err(ConfigError::Conflict {
                        first,
                        second,
                        byte: a as char,
                    });
                }
            }
        }

        if let LineEnding::Custom(eol) = &self.eol {
            if eol.is_empty() {
                return Err(ConfigError::InvalidDialect {
                    name: "eol",
                    reason: "must not be empty".to_string(),
                });
            }
            let bytes = eol.as_bytes();
            if bytes.contains(&self.delimiter) {
                return Err(ConfigError::InvalidDialect {
                    name: "eol",
                    reason: "must not contain the delimiter".to_string(),
                });
            }
            if let Some(q) = self.quote {
                if bytes.contains(&q) {
                    return Err(ConfigError::InvalidDialect {
                        name: "eol",
                        reason: "must not contain the quote".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_byte(name: &'static str, b: u8) -> Result<(), ConfigError> {
    if !b.is_ascii() {
        return Err(ConfigError::InvalidDialect {
            name,
            reason: format!("byte 0x{:02x} is not ASCII", b),
        });
    }
    if b == b'\n' || b == b'\r' {
        return Err(ConfigError::InvalidDialect {
            name,
            reason: "must not be a line break".to_string(),
        });
    }
    Ok(())
}

fn parse_eol(eol: &str) -> LineEnding {
    if eol.eq_ignore_ascii_case("auto") {
        LineEnding::Auto
    } else {
        LineEnding::Custom(eol.to_string())
    }
}

/// JSON shape of a dialect: single-character strings for bytes
#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DialectRepr {
    delimiter: String,
    #[serde(default = "default_quote")]
    quote: Option<String>,
    escape: Option<String>,
    comment: Option<String>,
    eol: String,
    relax_quotes: bool,
    trim: bool,
    ltrim: bool,
    rtrim: bool,
}

impl Default for DialectRepr {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            quote: default_quote(),
            escape: None,
            comment: None,
            eol: "auto".to_string(),
            relax_quotes: false,
            trim: false,
            ltrim: false,
            rtrim: false,
        }
    }
}

fn default_quote() -> Option<String> {
    Some("\"".to_string())
}

fn single_byte(name: &'static str, s: &str) -> Result<u8, ConfigError> {
    match s.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(ConfigError::InvalidDialect {
            name,
            reason: format!("expected a single ASCII character, got {:?}", s),
        }),
    }
}

fn optional_byte(name: &'static str, s: Option<String>) -> Result<Option<u8>, ConfigError> {
    match s.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => single_byte(name, s).map(Some),
    }
}

impl TryFrom<DialectRepr> for Dialect {
    type Error = ConfigError;

    fn try_from(repr: DialectRepr) -> Result<Self, Self::Error> {
        let dialect = Dialect {
            delimiter: single_byte("delimiter", &repr.delimiter)?,
            quote: optional_byte("quote", repr.quote)?,
            escape: optional_byte("escape", repr.escape)?,
            comment: optional_byte("comment", repr.comment)?,
            eol: parse_eol(&repr.eol),
            relax_quotes: repr.relax_quotes,
            trim: TrimMode::from_flags(repr.trim || repr.ltrim, repr.trim || repr.rtrim),
        };
        dialect.validate()?;
        Ok(dialect)
    }
}

// ============================================================================
// Decoder options
// ============================================================================

/// Where header names come from
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "HeaderRepr")]
pub enum HeaderMode {
    /// No header row; columns are named `column_<i>`
    None,
    /// The first eligible record holds the names
    #[default]
    FirstRow,
    /// Names are given; no header row is consumed
    Names(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderRepr {
    Flag(bool),
    Names(Vec<String>),
}

impl From<HeaderRepr> for HeaderMode {
    fn from(repr: HeaderRepr) -> Self {
        match repr {
            HeaderRepr::Flag(true) => HeaderMode::FirstRow,
            HeaderRepr::Flag(false) => HeaderMode::None,
            HeaderRepr::Names(names) => HeaderMode::Names(names),
        }
    }
}

/// Which columns go through type coercion
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "TypingRepr")]
pub enum DynamicTyping {
    /// Every field stays a string
    #[default]
    Off,
    /// Every column is coerced
    All,
    /// Only the named columns are coerced
    Columns(Vec<String>),
    /// Columns for which the predicate holds are coerced
    Predicate(TypingPredicate),
}

impl DynamicTyping {
    /// Whether values of `column` are coerced
    pub fn applies(&self, column: &str) -> bool {
        match self {
            DynamicTyping::Off => false,
            DynamicTyping::All => true,
            DynamicTyping::Columns(columns) => columns.iter().any(|c| c == column),
            DynamicTyping::Predicate(p) => p.call(column),
        }
    }

    /// Whether coercion is enabled for any column
    #[inline]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DynamicTyping::Off)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TypingRepr {
    Flag(bool),
    Columns(Vec<String>),
}

impl From<TypingRepr> for DynamicTyping {
    fn from(repr: TypingRepr) -> Self {
        match repr {
            TypingRepr::Flag(true) => DynamicTyping::All,
            TypingRepr::Flag(false) => DynamicTyping::Off,
            TypingRepr::Columns(columns) => DynamicTyping::Columns(columns),
        }
    }
}

/// Tokens recognized as booleans (compared case-insensitively)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BooleanValues {
    /// Tokens that mean `true`
    pub truthy: Vec<String>,
    /// Tokens that mean `false`
    pub falsy: Vec<String>,
}

impl Default for BooleanValues {
    fn default() -> Self {
        Self {
            truthy: ["true", "yes", "y", "on", "1"].map(String::from).to_vec(),
            falsy: ["false", "no", "n", "off", "0"].map(String::from).to_vec(),
        }
    }
}

impl BooleanValues {
    /// Look a token up in both sets
    pub fn lookup(&self, token: &str) -> Option<bool> {
        if self.truthy.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            Some(true)
        } else if self.falsy.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            Some(false)
        } else {
            None
        }
    }
}

/// Instruction returned by an [`ErrorHandler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorAction {
    /// Record the error and drop the row
    Skip,
    /// Record the error and keep the best-effort row
    Recover,
    /// Stop and return the error
    Abort,
}

/// Policy for recoverable errors
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum OnError {
    /// Return the first error as `Err`
    Throw,
    /// Record the error, drop the row, continue
    #[default]
    Skip,
    /// Ask a handler per error
    Handler(ErrorHandler),
}

impl TryFrom<String> for OnError {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "throw" => Ok(OnError::Throw),
            "skip" => Ok(OnError::Skip),
            other => Err(ConfigError::InvalidOption {
                name: "onError",
                reason: format!("expected \"throw\" or \"skip\", got {:?}", other),
            }),
        }
    }
}

fn deserialize_encoding<'de, D>(deserializer: D) -> Result<&'static Encoding, D::Error>
where
    D: Deserializer<'de>,
{
    let label = String::deserialize(deserializer)?;
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| serde::de::Error::custom(ConfigError::UnknownEncoding(label)))
}

fn default_encoding() -> &'static Encoding {
    encoding_rs::UTF_8
}

fn default_true() -> bool {
    true
}

fn default_null_values() -> Vec<String> {
    vec!["null".to_string(), "NULL".to_string()]
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

/// Complete configuration of a parse
///
/// Closure-valued options are skipped by deserialization and set with the
/// `with_*` setters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    /// Byte-level format
    #[serde(flatten)]
    pub dialect: Dialect,

    /// Header source
    pub header: HeaderMode,
    /// Header renames applied after blank-cell substitution
    pub rename_headers: HashMap<String, String>,
    /// Header relabel hook, applied after renames
    #[serde(skip)]
    pub header_transform: Option<HeaderTransform>,

    /// Drop rows whose fields are all empty or whitespace
    pub skip_empty_lines: bool,
    /// Physical lines skipped before anything else
    pub skip_lines: usize,
    /// First physical line read (1-based)
    pub from_line: Option<usize>,
    /// Last physical line read (1-based, inclusive)
    pub to_line: Option<usize>,
    /// Output row limit
    pub max_rows: Option<usize>,

    /// Which columns are coerced
    pub dynamic_typing: DynamicTyping,
    /// Tokens decoded as `Null`
    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,
    /// Tokens decoded as booleans
    pub boolean_values: BooleanValues,
    /// Per-field conversion that replaces the typing cascade
    #[serde(skip)]
    pub cast: Option<CastFn>,
    /// Capacity of the coercion cache (0 disables it)
    #[serde(default = "default_cache_size", rename = "coercionCacheSize")]
    pub cache_size: usize,

    /// Accept rows whose field count differs from the header count
    pub relax_column_count: bool,

    /// Recoverable-error policy
    pub on_error: OnError,
    /// Stop once this many errors are recorded
    pub max_errors: Option<usize>,

    /// Row validator
    #[serde(skip)]
    pub schema: Option<ValidatorHandle>,
    /// Row filter
    #[serde(skip)]
    pub filter: Option<RowFilter>,
    /// Row transform
    #[serde(skip)]
    pub transform: Option<RowTransform>,

    /// Byte encoding of the input
    #[serde(deserialize_with = "deserialize_encoding", default = "default_encoding")]
    pub encoding: &'static Encoding,
    /// Remove a leading byte-order mark
    #[serde(default = "default_true")]
    pub strip_bom: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            header: HeaderMode::FirstRow,
            rename_headers: HashMap::new(),
            header_transform: None,
            skip_empty_lines: false,
            skip_lines: 0,
            from_line: None,
            to_line: None,
            max_rows: None,
            dynamic_typing: DynamicTyping::Off,
            null_values: default_null_values(),
            boolean_values: BooleanValues::default(),
            cast: None,
            cache_size: DEFAULT_CACHE_SIZE,
            relax_column_count: false,
            on_error: OnError::Skip,
            max_errors: None,
            schema: None,
            filter: None,
            transform: None,
            encoding: encoding_rs::UTF_8,
            strip_bom: true,
        }
    }
}

impl ParseOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the declarative options from a JSON document and validate them
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: ParseOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Check the whole configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dialect.validate()?;
        if self.max_errors == Some(0) {
            return Err(ConfigError::InvalidOption {
                name: "maxErrors",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.from_line == Some(0) {
            return Err(ConfigError::InvalidOption {
                name: "fromLine",
                reason: "lines are numbered from 1".to_string(),
            });
        }
        if let (Some(from), Some(to)) = (self.from_line, self.to_line) {
            if from > to {
                return Err(ConfigError::InvalidOption {
                    name: "toLine",
                    reason: format!("{} is before fromLine {}", to, from),
                });
            }
        }
        Ok(())
    }

    /// First physical line that may produce a record
    pub fn first_line(&self) -> usize {
        self.from_line.unwrap_or(1).max(self.skip_lines + 1)
    }

    /// Replace the dialect
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.dialect.delimiter = delimiter;
        self
    }

    /// Set or disable the quote byte
    pub fn with_quote(mut self, quote: Option<u8>) -> Self {
        self.dialect.quote = quote;
        self
    }

    /// Set or disable the escape byte
    pub fn with_escape(mut self, escape: Option<u8>) -> Self {
        self.dialect.escape = escape;
        self
    }

    /// Set or disable the comment byte
    pub fn with_comment(mut self, comment: Option<u8>) -> Self {
        self.dialect.comment = comment;
        self
    }

    /// Use a literal row terminator
    pub fn with_eol(mut self, eol: &str) -> Self {
        self.dialect.eol = parse_eol(eol);
        self
    }

    /// Tolerate unterminated quotes
    pub fn with_relax_quotes(mut self, relax: bool) -> Self {
        self.dialect.relax_quotes = relax;
        self
    }

    /// Set the trim mode
    pub fn with_trim(mut self, trim: TrimMode) -> Self {
        self.dialect.trim = trim;
        self
    }

    /// Set the header source
    pub fn with_header(mut self, header: HeaderMode) -> Self {
        self.header = header;
        self
    }

    /// Use explicit header names
    pub fn with_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = HeaderMode::Names(names.into_iter().map(Into::into).collect());
        self
    }

    /// Add a header rename
    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename_headers.insert(from.into(), to.into());
        self
    }

    /// Set the header relabel hook
    pub fn with_header_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize) -> String + Send + Sync + 'static,
    {
        self.header_transform = Some(HeaderTransform::new(f));
        self
    }

    /// Drop rows that are entirely empty or whitespace
    pub fn with_skip_empty_lines(mut self, skip: bool) -> Self {
        self.skip_empty_lines = skip;
        self
    }

    /// Skip leading physical lines
    pub fn with_skip_lines(mut self, lines: usize) -> Self {
        self.skip_lines = lines;
        self
    }

    /// Start reading at a physical line
    pub fn with_from_line(mut self, line: usize) -> Self {
        self.from_line = Some(line);
        self
    }

    /// Stop reading after a physical line
    pub fn with_to_line(mut self, line: usize) -> Self {
        self.to_line = Some(line);
        self
    }

    /// Limit the number of output rows
    pub fn with_max_rows(mut self, rows: usize) -> Self {
        self.max_rows = Some(rows);
        self
    }

    /// Select the coerced columns
    pub fn with_dynamic_typing(mut self, typing: DynamicTyping) -> Self {
        self.dynamic_typing = typing;
        self
    }

    /// Coerce the columns for which `f` holds
    pub fn with_typing_predicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.dynamic_typing = DynamicTyping::Predicate(TypingPredicate::new(f));
        self
    }

    /// Replace the null tokens
    pub fn with_null_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the boolean token sets
    pub fn with_boolean_values(mut self, values: BooleanValues) -> Self {
        self.boolean_values = values;
        self
    }

    /// Set the cast hook
    pub fn with_cast<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &CastContext<'_>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.cast = Some(CastFn::new(f));
        self
    }

    /// Set the coercion cache capacity
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Accept rows with a different field count
    pub fn with_relax_column_count(mut self, relax: bool) -> Self {
        self.relax_column_count = relax;
        self
    }

    /// Set the error policy
    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    /// Decide per error with a handler
    pub fn with_error_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParseError) -> ErrorAction + Send + Sync + 'static,
    {
        self.on_error = OnError::Handler(ErrorHandler::new(f));
        self
    }

    /// Stop after this many errors
    pub fn with_max_errors(mut self, max: usize) -> Self {
        self.max_errors = Some(max);
        self
    }

    /// Validate each row
    pub fn with_validator(mut self, validator: impl RowValidator + 'static) -> Self {
        self.schema = Some(ValidatorHandle::new(validator));
        self
    }

    /// Keep only rows for which `f` holds
    pub fn with_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(RowFilter::new(f));
        self
    }

    /// Rewrite or drop each row
    pub fn with_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Row) -> Option<Row> + Send + Sync + 'static,
    {
        self.transform = Some(RowTransform::new(f));
        self
    }

    /// Set the input encoding
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the input encoding by WHATWG label (`"utf-8"`, `"latin1"`, ...)
    pub fn with_encoding_label(mut self, label: &str) -> Result<Self, ConfigError> {
        self.encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ConfigError::UnknownEncoding(label.to_string()))?;
        Ok(self)
    }

    /// Keep or strip a leading byte-order mark
    pub fn with_strip_bom(mut self, strip: bool) -> Self {
        self.strip_bom = strip;
        self
    }
}
