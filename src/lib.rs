//! Delimit - Streaming CSV-Family Parsing Engine
//!
//! A parser for delimited text that tolerates dialect variation and
//! malformed input without losing forward progress. It provides:
//! - A zero-copy lexer with per-dialect byte classification and separate
//!   fast/slow paths for quoted fields
//! - Custom delimiter, quote, escape, comment and end-of-line markers
//! - Header-keyed rows with dynamic typing, cast hooks and schema validation
//! - Error policies (throw, skip, handler) with a `max_errors` circuit breaker
//! - A streaming coordinator whose output does not depend on how the input
//!   was split into fragments
//! - Optional tokio adapter and rayon batch parsing
//!
//! ## Quick Start
//!
//! ```rust
//! use delimit::{parse, ParseOptions, Value};
//!
//! let output = parse("name,age\nAlice,30\n\"Smith, Jr.\",41\n", &ParseOptions::default()).unwrap();
//! assert_eq!(output.rows.len(), 2);
//! assert_eq!(output.rows[1].get("name"), Some(&Value::from("Smith, Jr.")));
//! ```
//!
//! ## Dialects and Typing
//!
//! ```rust
//! use delimit::{parse, DynamicTyping, ParseOptions, Value};
//!
//! let options = ParseOptions::default()
//!     .with_delimiter(b';')
//!     .with_comment(Some(b'#'))
//!     .with_dynamic_typing(DynamicTyping::All);
//!
//! let output = parse("# export\nid;active\n7;yes\n", &options).unwrap();
//! assert_eq!(output.rows[0].get("id"), Some(&Value::Int(7)));
//! assert_eq!(output.rows[0].get("active"), Some(&Value::Bool(true)));
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use delimit::{ParseOptions, StreamingParser};
//!
//! let mut parser = StreamingParser::new(ParseOptions::default(), Vec::new()).unwrap();
//! for fragment in [&b"id,na"[..], b"me\n1,\"Al", b"ice\"\n"] {
//!     parser.feed(fragment).unwrap();
//! }
//! let meta = parser.end().unwrap();
//! assert_eq!(meta.row_count, 1);
//! ```
//!
//! ## Loading Options from JSON
//!
//! ```rust
//! use delimit::ParseOptions;
//!
//! let options = ParseOptions::from_json(r#"{"delimiter": "\t", "dynamicTyping": true}"#).unwrap();
//! assert_eq!(options.dialect.delimiter, b'\t');
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate
//! - `parallel` - Parse independent documents on rayon's thread pool
//! - `async` - Drive the streaming parser from a tokio `AsyncRead`

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
// Allow some pedantic lints that are too noisy
#![allow(clippy::module_inception)]
#![allow(clippy::redundant_closure)]

// Debug logging - compiles to nothing without the `logging` feature
#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_trace {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_trace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}

// Prelude module for convenient imports
pub mod prelude;

// Parsing engine
pub mod engine;

/// Re-export commonly used types for convenience
pub use engine::{
    // Entry points
    parse, parse_bytes,
    // Options
    Dialect, DynamicTyping, ErrorAction, HeaderMode, OnError, ParseOptions, TrimMode,
    // Rows and values
    Row, RowValidator, ValidationOutcome, Value,
    // Results
    ParseMeta, ParseOutput,
    // Errors
    ConfigError, Error, ErrorCode, ParseError,
    // Streaming
    CancelToken, RowSink, SinkFlow, StreamConfig, StreamingParser,
    // Parallel parsing
    parse_batch_parallel, parse_batch_parallel_owned, ParallelConfig,
};
