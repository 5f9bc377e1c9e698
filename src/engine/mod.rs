//! Parsing engine
//!
//! # Module Organization
//!
//! ## Lexing
//! - [`char_class`] - Per-dialect byte classification table
//! - [`cursor`] - Cursor snapshots and source positions
//! - [`lexer`] - Zero-copy tokenizer with fast/slow quoted-field paths
//!
//! ## Decoding
//! - [`decoder`] - Headers, typing, validation and error policy
//! - [`coerce`] - Dynamic typing cascade
//! - [`cache`] - Bounded memoization for the cascade
//! - [`schema`] - Row validation hooks
//! - [`row`] / [`value`] - Decoded output
//!
//! ## Driving
//! - [`parse`] - One-shot entry points
//! - [`streaming`] - Fragment-fed coordinator
//! - [`async_stream`] - tokio adapter (feature `async`)
//! - [`parallel`] - Batch parsing over rayon (feature `parallel`)
//!
//! ## Configuration and results
//! - [`options`] - Dialect and parse options
//! - [`error`] - Structured errors
//! - [`meta`] - Parse output and document metadata

// ============================================================================
// Module Declarations
// ============================================================================

pub mod cache;
pub mod char_class;
pub mod coerce;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod lexer;
pub mod meta;
pub mod options;
pub mod parse;
pub mod row;
pub mod schema;
pub mod streaming;
pub mod value;

// Parallel parsing (always available, uses rayon when feature is enabled)
pub mod parallel;

#[cfg(feature = "async")]
pub mod async_stream;

// ============================================================================
// Lexing
// ============================================================================

pub use char_class::{CharClass, CharClassTable};
pub use cursor::{CursorState, SourcePosition};
pub use lexer::{Lexer, RawRow, Record, Token, TokenKind};

// ============================================================================
// Decoding
// ============================================================================

pub use cache::BoundedCache;
pub use coerce::{coerce_value, parse_temporal, Coercer};
pub use decoder::{Decoded, RowDecoder};
pub use row::{Headers, Row};
pub use schema::{FieldRule, FieldRules, RowValidator, ValidationOutcome, ValidatorHandle};
pub use value::{Temporal, Value, ValueKind};

// ============================================================================
// Configuration
// ============================================================================

pub use options::{
    BooleanValues, CastContext, Dialect, DynamicTyping, ErrorAction, HeaderMode, LineEnding,
    OnError, ParseOptions, TrimMode,
};

// ============================================================================
// Errors and Results
// ============================================================================

pub use error::{ConfigError, Error, ErrorCode, ParseError};
pub use meta::{ParseMeta, ParseOutput};

// ============================================================================
// Entry Points
// ============================================================================

pub use parse::{parse, parse_bytes};
pub use streaming::{CancelToken, FnSink, RowSink, SinkFlow, StreamConfig, StreamingParser};

#[cfg(feature = "async")]
pub use async_stream::{row_stream, stream_reader, AsyncStreamConfig, StreamEvent};

// ============================================================================
// Parallel Parsing
// ============================================================================

pub use parallel::{parse_batch_parallel, parse_batch_parallel_owned, ParallelConfig};
