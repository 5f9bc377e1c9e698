//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from delimit.
//! Importing this module with a wildcard import brings the core types into scope:
//!
//! ```
//! use delimit::prelude::*;
//! ```
//!
//! # Re-exported Items
//!
//! ## Entry Points
//! - [`parse()`] - Parse a document held in memory
//! - [`parse_bytes()`] - Parse bytes in the configured encoding
//! - [`StreamingParser`] - Fragment-fed parser
//!
//! ## Configuration
//! - [`ParseOptions`] - Everything a parse can be told
//! - [`Dialect`] - Delimiter, quote, escape, comment and line ending
//!
//! ## Output
//! - [`Row`] - Header-keyed decoded row
//! - [`Value`] - Typed field value
//! - [`ParseError`] / [`ErrorCode`] - Structured errors

// ============================================================================
// Entry Points
// ============================================================================

pub use crate::engine::{parse, parse_bytes, StreamingParser};

// ============================================================================
// Configuration
// ============================================================================

pub use crate::engine::{
    Dialect, DynamicTyping, ErrorAction, HeaderMode, OnError, ParseOptions, StreamConfig,
    TrimMode,
};

// ============================================================================
// Output and Errors
// ============================================================================

pub use crate::engine::{
    ConfigError, Error, ErrorCode, ParseError, ParseMeta, ParseOutput, Row, Value,
};

// ============================================================================
// Extension Points
// ============================================================================

pub use crate::engine::{RowSink, RowValidator, SinkFlow, ValidationOutcome};
