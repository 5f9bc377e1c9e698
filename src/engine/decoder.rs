//! Row decoder
//!
//! Turns raw records from the lexer into header-keyed [`Row`]s. One decoder
//! lives for a whole document and carries its state across lexer passes:
//! the frozen headers, the output-row counter, the error list and the
//! truncation/abort flags. That is what lets the streaming coordinator run a
//! fresh lexer per flush without changing the result.
//!
//! Per record, in order:
//!
//! 1. range filters (`skip_lines`, `from_line`, `to_line`) and empty-row skipping
//! 2. header establishment (first eligible record, when requested)
//! 3. `max_rows` limit
//! 4. column count check
//! 5. typing (cast hook, or the coercion cascade for selected columns)
//! 6. schema validation
//! 7. filter, then transform

use std::borrow::Cow;
use std::sync::Arc;

use hashbrown::HashSet;

use super::coerce::Coercer;
use super::error::{ErrorCode, ParseError};
use super::lexer::RawRow;
use super::options::{CastContext, ErrorAction, HeaderMode, OnError, ParseOptions};
use super::row::{synthetic_name, Headers, Row};
use super::schema::RowValidator;
use super::value::Value;

/// What became of one record
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A row for the caller
    Row(Row),
    /// Consumed without output (header, filtered, skipped, or errored)
    Dropped,
    /// The document is finished; no further records are read
    Stop,
}

/// Long-lived, document-scoped decoder
#[derive(Debug)]
pub struct RowDecoder {
    options: Arc<ParseOptions>,
    headers: Option<Arc<Headers>>,
    typed: Vec<bool>,
    coercer: Coercer,
    errors: Vec<ParseError>,
    rows_emitted: usize,
    first_line: usize,
    truncated: bool,
    aborted: bool,
    cancelled: bool,
}

impl RowDecoder {
    /// Create a decoder; explicit header names are established immediately
    pub fn new(options: Arc<ParseOptions>) -> Self {
        let mut decoder = Self {
            coercer: Coercer::new(&options),
            first_line: options.first_line(),
            options,
            headers: None,
            typed: Vec::new(),
            errors: Vec::new(),
            rows_emitted: 0,
            truncated: false,
            aborted: false,
            cancelled: false,
        };
        let options = Arc::clone(&decoder.options);
        if let HeaderMode::Names(names) = &options.header {
            let cells: Vec<Cow<'_, str>> = names.iter().map(|n| Cow::Borrowed(n.as_str())).collect();
            let headers = decoder.build_headers(&cells);
            decoder.freeze(headers);
        }
        decoder
    }

    /// The options this decoder runs with
    #[inline]
    pub fn options(&self) -> &Arc<ParseOptions> {
        &self.options
    }

    /// Established headers
    #[inline]
    pub fn headers(&self) -> Option<&Arc<Headers>> {
        self.headers.as_ref()
    }

    /// Errors recorded so far
    #[inline]
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Take the recorded errors
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    /// Number of rows handed out
    #[inline]
    pub fn rows_emitted(&self) -> usize {
        self.rows_emitted
    }

    /// Whether a range or row limit ended the document early
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Whether an error limit, a fatal error or a thrown error ended the document
    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Whether the consumer or a cancel token ended the document
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Whether no further records will be decoded
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.truncated || self.aborted || self.cancelled
    }

    /// Stop on behalf of the consumer
    pub fn cancel(&mut self) {
        if !self.cancelled {
            log_debug!("decoder cancelled after {} rows", self.rows_emitted);
        }
        self.cancelled = true;
    }

    /// Record an error that ends the document regardless of error mode
    pub fn fatal(&mut self, error: ParseError) {
        log_debug!("fatal error: {}", error);
        self.errors.push(error);
        self.aborted = true;
    }

    /// Decode one raw record
    ///
    /// `Err` is returned only in `throw` mode or when a handler aborts.
    pub fn decode(&mut self, raw: RawRow<'_>) -> Result<Decoded, ParseError> {
        if self.is_stopped() {
            return Ok(Decoded::Stop);
        }
        let options = Arc::clone(&self.options);
        let line = raw.line;

        if line < self.first_line {
            return Ok(Decoded::Dropped);
        }
        if options.to_line.is_some_and(|to| line > to) {
            log_debug!("record at line {} is past toLine, stopping", line);
            self.truncated = true;
            return Ok(Decoded::Stop);
        }
        if options.skip_empty_lines && raw.is_blank() {
            return Ok(Decoded::Dropped);
        }

        let headers = match self.headers.clone() {
            Some(headers) => headers,
            None => match options.header {
                HeaderMode::FirstRow => {
                    let headers = self.build_headers(&raw.fields);
                    self.freeze(headers);
                    return Ok(Decoded::Dropped);
                }
                _ => self.freeze(Headers::synthetic(raw.len())),
            },
        };

        if options.max_rows.is_some_and(|max| self.rows_emitted >= max) {
            log_debug!("maxRows reached at line {}, stopping", line);
            self.truncated = true;
            return Ok(Decoded::Stop);
        }

        let width = headers.len();
        if !options.relax_column_count && raw.len() != width {
            let error = ParseError::column_mismatch(width, raw.len(), line)
                .with_row(self.rows_emitted + 1);
            if let Some(outcome) = self.recoverable(error)? {
                return Ok(outcome);
            }
        }

        let mut values = Vec::with_capacity(width);
        for (index, name) in headers.names().iter().enumerate() {
            let text = raw.fields.get(index).map(|f| f.as_ref()).unwrap_or("");
            let value = match &options.cast {
                Some(cast) => {
                    let context = CastContext {
                        column: name,
                        index,
                        line,
                    };
                    match cast.call(text, &context) {
                        Ok(value) => value,
                        Err(message) => {
                            let error = ParseError::new(ErrorCode::InvalidType, message, line, 1)
                                .with_row(self.rows_emitted + 1)
                                .with_field(name.as_str());
                            if let Some(outcome) = self.recoverable(error)? {
                                return Ok(outcome);
                            }
                            Value::String(text.to_string())
                        }
                    }
                }
                None if self.typed.get(index).copied().unwrap_or(false) => {
                    self.coercer.coerce(text)
                }
                None => Value::String(text.to_string()),
            };
            values.push(value);
        }
        let mut row = Row::new(headers, values);

        if let Some(schema) = &options.schema {
            let outcome = schema.validate(&row);
            if !outcome.valid {
                let error = ParseError::new(ErrorCode::ValidationError, outcome.message(), line, 1)
                    .with_row(self.rows_emitted + 1);
                if let Some(outcome) = self.recoverable(error)? {
                    return Ok(outcome);
                }
            } else if let Some(data) = outcome.data {
                row = data;
            }
        }

        if let Some(filter) = &options.filter {
            if !filter.call(&row) {
                return Ok(Decoded::Dropped);
            }
        }
        if let Some(transform) = &options.transform {
            match transform.call(row) {
                Some(next) => row = next,
                None => return Ok(Decoded::Dropped),
            }
        }

        self.rows_emitted += 1;
        Ok(Decoded::Row(row))
    }

    /// Handle an error raised by the lexer
    ///
    /// The record is lost either way, so `Recover` is treated as `Skip`.
    pub fn lexical_error(&mut self, mut error: ParseError) -> Result<Decoded, ParseError> {
        if self.headers.is_some() {
            error = error.with_row(self.rows_emitted + 1);
        }
        self.report(error)?;
        Ok(self.after_error())
    }

    /// Report malformed input bytes inside the record starting at `line`
    ///
    /// Records the decoder would not decode (outside the line range, past
    /// `max_rows`, or after the document stopped) are not reported. The row
    /// itself is still decoded, with U+FFFD in place of the bad bytes.
    pub fn encoding_error(&mut self, line: usize, encoding: &str) -> Result<(), ParseError> {
        let options = &self.options;
        let past_limit = self.headers.is_some()
            && options.max_rows.is_some_and(|max| self.rows_emitted >= max);
        if self.is_stopped()
            || line < self.first_line
            || options.to_line.is_some_and(|to| line > to)
            || past_limit
        {
            return Ok(());
        }
        let mut error = ParseError::new(
            ErrorCode::EncodingError,
            format!("input is not valid {}", encoding),
            line,
            1,
        );
        if self.headers.is_some() {
            error = error.with_row(self.rows_emitted + 1);
        }
        self.report(error).map(|_| ())
    }

    /// Close the document: a requested header row that never appeared is a
    /// schema error
    pub fn finish(&mut self) -> Result<(), ParseError> {
        if self.headers.is_none() && self.options.header == HeaderMode::FirstRow && !self.is_stopped()
        {
            let line = self.first_line;
            self.report(ParseError::new(
                ErrorCode::SchemaError,
                "no header row found",
                line,
                1,
            ))?;
        }
        Ok(())
    }

    /// Report an error for the current record; `Some` when the record ends here
    fn recoverable(&mut self, error: ParseError) -> Result<Option<Decoded>, ParseError> {
        match self.report(error)? {
            ErrorAction::Recover if !self.aborted => Ok(None),
            _ => Ok(Some(self.after_error())),
        }
    }

    fn after_error(&self) -> Decoded {
        if self.aborted {
            Decoded::Stop
        } else {
            Decoded::Dropped
        }
    }

    /// Apply the error mode and the circuit breaker
    fn report(&mut self, error: ParseError) -> Result<ErrorAction, ParseError> {
        let action = match &self.options.on_error {
            OnError::Throw => ErrorAction::Abort,
            OnError::Skip => ErrorAction::Skip,
            OnError::Handler(handler) => handler.call(&error),
        };
        if action == ErrorAction::Abort {
            self.aborted = true;
            return Err(error);
        }
        self.errors.push(error);
        if let Some(max) = self.options.max_errors {
            if self.errors.len() >= max {
                log_debug!("maxErrors ({}) reached, stopping", max);
                self.aborted = true;
            }
        }
        Ok(action)
    }

    /// Normalize header cells: blanks, renames, the transform hook, then dedupe
    fn build_headers(&self, cells: &[Cow<'_, str>]) -> Headers {
        let options = &self.options;
        let mut seen: HashSet<String> = HashSet::with_capacity(cells.len());
        let mut names = Vec::with_capacity(cells.len());

        for (index, cell) in cells.iter().enumerate() {
            let mut name = if cell.trim().is_empty() {
                synthetic_name(index)
            } else {
                cell.to_string()
            };
            if let Some(renamed) = options.rename_headers.get(&name) {
                name = renamed.clone();
            }
            if let Some(transform) = &options.header_transform {
                name = transform.call(&name, index);
            }
            if seen.contains(&name) {
                let mut n = 1;
                let unique = loop {
                    let candidate = format!("{}_{}", name, n);
                    if !seen.contains(&candidate) {
                        break candidate;
                    }
                    n += 1;
                };
                name = unique;
            }
            seen.insert(name.clone());
            names.push(name);
        }
        Headers::new(names)
    }

    fn freeze(&mut self, headers: Headers) -> Arc<Headers> {
        log_debug!("headers established: {:?}", headers.names());
        self.typed = headers
            .names()
            .iter()
            .map(|name| self.options.dynamic_typing.applies(name))
            .collect();
        let headers = Arc::new(headers);
        self.headers = Some(Arc::clone(&headers));
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::options::DynamicTyping;
    use crate::engine::schema::ValidationOutcome;

    fn raw(line: usize, fields: &[&'static str]) -> RawRow<'static> {
        RawRow {
            fields: fields.iter().map(|f| Cow::Borrowed(*f)).collect(),
            line,
        }
    }

    fn decoder(options: ParseOptions) -> RowDecoder {
        RowDecoder::new(Arc::new(options))
    }

    fn expect_row(decoded: Decoded) -> Row {
        match decoded {
            Decoded::Row(row) => row,
            other => panic!("expected a row, got {:?}", other),
        }
    }

    #[test]
    fn test_header_then_rows() {
        let mut d = decoder(ParseOptions::default());
        assert_eq!(d.decode(raw(1, &["a", "b"])).unwrap(), Decoded::Dropped);
        let row = expect_row(d.decode(raw(2, &["1", "2"])).unwrap());
        assert_eq!(row.get("a"), Some(&Value::from("1")));
        assert_eq!(d.rows_emitted(), 1);
    }

    #[test]
    fn test_header_normalization() {
        let options = ParseOptions::default()
            .with_rename("b", "bee")
            .with_header_transform(|name, _| name.to_uppercase());
        let mut d = decoder(options);
        d.decode(raw(1, &["a", "", "b", "a", "A"])).unwrap();
        assert_eq!(
            d.headers().unwrap().names(),
            &["A", "COLUMN_1", "BEE", "A_1", "A_2"]
        );
    }

    #[test]
    fn test_explicit_and_synthetic_headers() {
        let mut d = decoder(ParseOptions::default().with_headers(["x", "y"]));
        let row = expect_row(d.decode(raw(1, &["1", "2"])).unwrap());
        assert_eq!(row.get("y"), Some(&Value::from("2")));

        let mut d = decoder(ParseOptions::default().with_header(HeaderMode::None));
        let row = expect_row(d.decode(raw(1, &["1", "2"])).unwrap());
        assert_eq!(row.get("column_1"), Some(&Value::from("2")));
    }

    #[test]
    fn test_column_mismatch_strict_and_relaxed() {
        let mut d = decoder(ParseOptions::default());
        d.decode(raw(1, &["a", "b", "c"])).unwrap();
        assert_eq!(d.decode(raw(2, &["1", "2"])).unwrap(), Decoded::Dropped);
        assert_eq!(d.errors()[0].code, ErrorCode::ColumnMismatch);
        assert_eq!(d.errors()[0].line, 2);
        assert_eq!(d.errors()[0].row, Some(1));

        let mut d = decoder(ParseOptions::default().with_relax_column_count(true));
        d.decode(raw(1, &["a", "b", "c"])).unwrap();
        let row = expect_row(d.decode(raw(2, &["1", "2"])).unwrap());
        assert_eq!(row.get("c"), Some(&Value::from("")));
        let row = expect_row(d.decode(raw(3, &["1", "2", "3", "4"])).unwrap());
        assert_eq!(row.len(), 3);
        assert!(d.errors().is_empty());
    }

    #[test]
    fn test_throw_mode() {
        let mut d = decoder(ParseOptions::default().with_on_error(OnError::Throw));
        d.decode(raw(1, &["a", "b"])).unwrap();
        let err = d.decode(raw(2, &["1"])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ColumnMismatch);
    }

    #[test]
    fn test_handler_recover_keeps_row() {
        let options = ParseOptions::default().with_error_handler(|_| ErrorAction::Recover);
        let mut d = decoder(options);
        d.decode(raw(1, &["a", "b"])).unwrap();
        let row = expect_row(d.decode(raw(2, &["1"])).unwrap());
        assert!(row.get("b").unwrap().as_str() == Some(""));
        assert_eq!(d.errors().len(), 1);
    }

    #[test]
    fn test_handler_abort() {
        let options = ParseOptions::default().with_error_handler(|_| ErrorAction::Abort);
        let mut d = decoder(options);
        d.decode(raw(1, &["a", "b"])).unwrap();
        assert!(d.decode(raw(2, &["1"])).is_err());
    }

    #[test]
    fn test_max_errors_circuit_breaker() {
        let mut d = decoder(ParseOptions::default().with_max_errors(2));
        d.decode(raw(1, &["a", "b"])).unwrap();
        assert_eq!(d.decode(raw(2, &["1"])).unwrap(), Decoded::Dropped);
        assert_eq!(d.decode(raw(3, &["1"])).unwrap(), Decoded::Stop);
        assert!(d.is_aborted());
        assert_eq!(d.decode(raw(4, &["1"])).unwrap(), Decoded::Stop);
        assert_eq!(d.errors().len(), 2);
    }

    #[test]
    fn test_dynamic_typing() {
        let options = ParseOptions::default().with_dynamic_typing(DynamicTyping::All);
        let mut d = decoder(options);
        d.decode(raw(1, &["age"])).unwrap();
        let row = expect_row(d.decode(raw(2, &["30"])).unwrap());
        assert_eq!(row.get("age"), Some(&Value::Int(30)));
        let row = expect_row(d.decode(raw(3, &["30"])).unwrap());
        assert_eq!(row.get("age"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_typing_per_column() {
        let options = ParseOptions::default()
            .with_dynamic_typing(DynamicTyping::Columns(vec!["n".to_string()]));
        let mut d = decoder(options);
        d.decode(raw(1, &["n", "s"])).unwrap();
        let row = expect_row(d.decode(raw(2, &["1", "1"])).unwrap());
        assert_eq!(row.get("n"), Some(&Value::Int(1)));
        assert_eq!(row.get("s"), Some(&Value::from("1")));
    }

    #[test]
    fn test_cast_hook() {
        let options = ParseOptions::default().with_cast(|text, ctx| {
            if ctx.column == "n" {
                text.parse::<i64>().map(Value::Int).map_err(|e| e.to_string())
            } else {
                Ok(Value::from(text))
            }
        });
        let mut d = decoder(options);
        d.decode(raw(1, &["n", "s"])).unwrap();
        let row = expect_row(d.decode(raw(2, &["7", "x"])).unwrap());
        assert_eq!(row.get("n"), Some(&Value::Int(7)));
        assert_eq!(d.decode(raw(3, &["x", "x"])).unwrap(), Decoded::Dropped);
        assert_eq!(d.errors()[0].code, ErrorCode::InvalidType);
        assert_eq!(d.errors()[0].field.as_deref(), Some("n"));
    }

    #[test]
    fn test_validation() {
        let options = ParseOptions::default().with_validator(|row: &Row| {
            if row.get("a").and_then(Value::as_str) == Some("bad") {
                ValidationOutcome::fail(["a is bad", "really"])
            } else {
                ValidationOutcome::pass()
            }
        });
        let mut d = decoder(options);
        d.decode(raw(1, &["a"])).unwrap();
        assert!(matches!(d.decode(raw(2, &["ok"])).unwrap(), Decoded::Row(_)));
        assert_eq!(d.decode(raw(3, &["bad"])).unwrap(), Decoded::Dropped);
        assert_eq!(d.errors()[0].code, ErrorCode::ValidationError);
        assert_eq!(d.errors()[0].message, "a is bad; really");
        assert_eq!(d.errors()[0].row, Some(2));
    }

    #[test]
    fn test_filter_and_transform() {
        let options = ParseOptions::default()
            .with_filter(|row| row.get("a").and_then(Value::as_str) != Some("skip"))
            .with_transform(|mut row| {
                if row.get("a").and_then(Value::as_str) == Some("drop") {
                    return None;
                }
                row.set("a", "changed");
                Some(row)
            });
        let mut d = decoder(options);
        d.decode(raw(1, &["a"])).unwrap();
        assert_eq!(d.decode(raw(2, &["skip"])).unwrap(), Decoded::Dropped);
        assert_eq!(d.decode(raw(3, &["drop"])).unwrap(), Decoded::Dropped);
        let row = expect_row(d.decode(raw(4, &["keep"])).unwrap());
        assert_eq!(row.get("a"), Some(&Value::from("changed")));
        assert_eq!(d.rows_emitted(), 1);
        assert!(d.errors().is_empty());
    }

    #[test]
    fn test_range_filters() {
        let options = ParseOptions::default().with_skip_lines(1).with_to_line(3);
        let mut d = decoder(options);
        assert_eq!(d.decode(raw(1, &["junk"])).unwrap(), Decoded::Dropped);
        d.decode(raw(2, &["a"])).unwrap();
        assert!(matches!(d.decode(raw(3, &["1"])).unwrap(), Decoded::Row(_)));
        assert_eq!(d.decode(raw(4, &["2"])).unwrap(), Decoded::Stop);
        assert!(d.is_truncated());
    }

    #[test]
    fn test_max_rows() {
        let mut d = decoder(ParseOptions::default().with_max_rows(1));
        d.decode(raw(1, &["a"])).unwrap();
        assert!(matches!(d.decode(raw(2, &["1"])).unwrap(), Decoded::Row(_)));
        assert_eq!(d.decode(raw(3, &["2"])).unwrap(), Decoded::Stop);
        assert!(d.is_truncated());
    }

    #[test]
    fn test_skip_empty_lines() {
        let mut d = decoder(ParseOptions::default().with_skip_empty_lines(true));
        d.decode(raw(1, &["a", "b"])).unwrap();
        assert_eq!(d.decode(raw(2, &["", " "])).unwrap(), Decoded::Dropped);
        assert!(d.errors().is_empty());
    }

    #[test]
    fn test_encoding_error_follows_record_range() {
        let options = ParseOptions::default().with_skip_lines(1).with_max_rows(1);
        let mut d = decoder(options);
        d.encoding_error(1, "UTF-8").unwrap();
        assert!(d.errors().is_empty());

        d.encoding_error(2, "UTF-8").unwrap();
        assert_eq!(d.errors()[0].code, ErrorCode::EncodingError);
        assert_eq!(d.errors()[0].row, None);
        d.decode(raw(2, &["a"])).unwrap();

        d.encoding_error(3, "UTF-8").unwrap();
        assert_eq!(d.errors()[1].line, 3);
        assert_eq!(d.errors()[1].row, Some(1));
        d.decode(raw(3, &["\u{FFFD}"])).unwrap();

        d.encoding_error(4, "UTF-8").unwrap();
        assert_eq!(d.errors().len(), 2);
    }

    #[test]
    fn test_encoding_error_in_throw_mode() {
        let mut d = decoder(ParseOptions::default().with_on_error(OnError::Throw));
        let err = d.encoding_error(1, "UTF-8").unwrap_err();
        assert_eq!(err.code, ErrorCode::EncodingError);
        assert!(d.is_aborted());
    }

    #[test]
    fn test_missing_header_row() {
        let mut d = decoder(ParseOptions::default());
        d.finish().unwrap();
        assert_eq!(d.errors()[0].code, ErrorCode::SchemaError);

        let mut d = decoder(ParseOptions::default().with_header(HeaderMode::None));
        d.finish().unwrap();
        assert!(d.errors().is_empty());
    }
}
