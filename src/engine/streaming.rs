//! Streaming coordinator
//!
//! Accepts input in arbitrary fragments and emits rows as soon as they are
//! complete, in one pass, holding at most one pending row in memory.
//!
//! # Overview
//!
//! ```text
//! feed(bytes) ──► encoding_rs decoder ──► text buffer
//!                                            │ (only once a row terminator arrived)
//!                                            ▼
//!                          partial-mode Lexer ──► RowDecoder ──► RowSink
//!                                            │
//!                          consumed prefix dropped, remainder kept
//! ```
//!
//! Each flush runs a fresh [`Lexer`] in partial mode over the buffer. The
//! lexer stops at the start of the first incomplete record (open quote,
//! trailing `\r`, a prefix of the custom terminator, or simply no terminator
//! yet), so everything before it is final and can be dropped. The
//! [`RowDecoder`] and the line counter carry over between flushes, which is
//! what makes the output independent of how the input was split.
//!
//! # Usage
//!
//! ```rust
//! use delimit::engine::{ParseOptions, StreamingParser};
//!
//! let mut parser = StreamingParser::new(ParseOptions::default(), Vec::new()).unwrap();
//! parser.feed(b"name,age\nAli").unwrap();
//! parser.feed(b"ce,30\n").unwrap();
//! let meta = parser.end().unwrap();
//! assert_eq!(meta.row_count, 1);
//! assert_eq!(parser.sink()[0].get("name").unwrap().as_str(), Some("Alice"));
//! ```

use std::collections::VecDeque;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use encoding_rs::{Decoder as TextDecoder, DecoderResult};

use super::decoder::RowDecoder;
use super::error::{ConfigError, ErrorCode, ParseError};
use super::lexer::{Lexer, Record};
use super::meta::{ParseMeta, PassTotals};
use super::options::ParseOptions;
use super::parse::drive;
use super::row::{Headers, Row};

/// Default bound on buffered, not yet decodable text (64 MB)
pub const DEFAULT_HIGH_WATER_MARK: usize = 64 * 1024 * 1024;

// ============================================================================
// Sinks
// ============================================================================

/// Whether the consumer wants more rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFlow {
    /// Keep going
    Continue,
    /// Stop the document; rows already delivered stay delivered
    Stop,
}

/// Push-based row consumer
pub trait RowSink {
    /// Receive one decoded row
    fn accept(&mut self, row: Row) -> SinkFlow;

    /// Receive a recorded error, in order with the rows around it
    fn error(&mut self, _error: &ParseError) {}
}

impl RowSink for Vec<Row> {
    #[inline]
    fn accept(&mut self, row: Row) -> SinkFlow {
        self.push(row);
        SinkFlow::Continue
    }
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    #[inline]
    fn accept(&mut self, row: Row) -> SinkFlow {
        (**self).accept(row)
    }

    #[inline]
    fn error(&mut self, error: &ParseError) {
        (**self).error(error)
    }
}

/// Adapts a closure into a [`RowSink`]
pub struct FnSink<F>(pub F);

impl<F> RowSink for FnSink<F>
where
    F: FnMut(Row) -> SinkFlow,
{
    #[inline]
    fn accept(&mut self, row: Row) -> SinkFlow {
        (self.0)(row)
    }
}

impl<F> std::fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnSink(..)")
    }
}

// ============================================================================
// Cancellation and configuration
// ============================================================================

/// Shared flag that stops a stream at the next record boundary
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Streaming limits
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Largest amount of buffered text allowed after a flush
    pub high_water_mark: usize,
    /// Expected input size in bytes, for progress reporting
    pub total_size: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            total_size: None,
        }
    }
}

impl StreamConfig {
    /// Default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the buffer bound
    pub fn with_high_water_mark(mut self, bytes: usize) -> Self {
        self.high_water_mark = bytes;
        self
    }

    /// Set the expected input size
    pub fn with_total_size(mut self, bytes: u64) -> Self {
        self.total_size = Some(bytes);
        self
    }
}

// ============================================================================
// Streaming parser
// ============================================================================

/// Incremental parser fed with byte or text fragments
///
/// Feeding raw bytes with [`feed`](Self::feed) and already decoded text with
/// [`feed_str`](Self::feed_str) should not be mixed within one document, since
/// bytes may hold an incomplete multi-byte sequence.
pub struct StreamingParser<S: RowSink = Vec<Row>> {
    options: Arc<ParseOptions>,
    decoder: RowDecoder,
    sink: S,
    config: StreamConfig,
    text_decoder: TextDecoder,
    buffer: String,
    malformed: MalformedInput,
    /// Line number of the first buffered byte
    line: usize,
    totals: PassTotals,
    announced: usize,
    saw_text: bool,
    cancel: CancelToken,
    started: Instant,
    finished: Option<ParseMeta>,
}

impl<S: RowSink> StreamingParser<S> {
    /// Create a parser with default limits
    pub fn new(options: ParseOptions, sink: S) -> Result<Self, ConfigError> {
        Self::with_config(options, sink, StreamConfig::default())
    }

    /// Create a parser with explicit limits
    pub fn with_config(
        options: ParseOptions,
        sink: S,
        config: StreamConfig,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let text_decoder = if options.strip_bom {
            options.encoding.new_decoder_with_bom_removal()
        } else {
            options.encoding.new_decoder_without_bom_handling()
        };
        let totals = PassTotals {
            encoding: options.encoding.name(),
            ..PassTotals::default()
        };
        let malformed = MalformedInput::new(options.encoding.name());
        let options = Arc::new(options);
        Ok(Self {
            decoder: RowDecoder::new(Arc::clone(&options)),
            options,
            sink,
            config,
            text_decoder,
            buffer: String::new(),
            malformed,
            line: 1,
            totals,
            announced: 0,
            saw_text: false,
            cancel: CancelToken::new(),
            started: Instant::now(),
            finished: None,
        })
    }

    /// Append a byte fragment and emit every row it completes
    ///
    /// Returns `Err` in `throw` mode, on a handler abort, and on fatal
    /// errors (`MEMORY_ERROR`). Fragments arriving after the document
    /// stopped are ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        if !self.accepting() {
            return Ok(());
        }
        self.totals.bytes_processed += bytes.len() as u64;
        let before = self.buffer.len();
        self.decode_bytes(bytes, false);
        self.after_append(before)
    }

    /// Append already decoded text
    pub fn feed_str(&mut self, text: &str) -> Result<(), ParseError> {
        if !self.accepting() {
            return Ok(());
        }
        self.totals.bytes_processed += text.len() as u64;
        let text = if !self.saw_text && self.options.strip_bom {
            text.strip_prefix('\u{FEFF}').unwrap_or(text)
        } else {
            text
        };
        if !text.is_empty() {
            self.saw_text = true;
        }
        let before = self.buffer.len();
        self.buffer.push_str(text);
        self.after_append(before)
    }

    /// Read a whole source in `chunk_size` pieces, then [`end`](Self::end)
    ///
    /// A read failure is recorded as a fatal `IO_ERROR`.
    pub fn read_from<R: Read>(
        &mut self,
        mut reader: R,
        chunk_size: usize,
    ) -> Result<ParseMeta, ParseError> {
        let mut chunk = vec![0u8; chunk_size.max(1)];
        while self.accepting() {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.feed(&chunk[..n])?,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    let error = ParseError::io(&err, self.line);
                    self.abort(error.clone());
                    return Err(error);
                }
            }
        }
        self.end()
    }

    /// Flush the remainder and close the document
    ///
    /// Calling `end` again returns the same metadata.
    pub fn end(&mut self) -> Result<ParseMeta, ParseError> {
        if let Some(meta) = &self.finished {
            return Ok(meta.clone());
        }
        if self.cancel.is_cancelled() {
            self.decoder.cancel();
        }
        if !self.decoder.is_stopped() {
            self.decode_bytes(&[], true);
            self.process(true)?;
            self.decoder.finish()?;
            self.announce();
        }
        let meta = ParseMeta::build(&self.decoder, &self.totals, self.started.elapsed());
        log_debug!(
            "stream ended: {} rows, {} errors, {} bytes",
            meta.row_count,
            meta.error_count,
            meta.bytes_processed
        );
        self.finished = Some(meta.clone());
        Ok(meta)
    }

    /// Errors recorded so far
    #[inline]
    pub fn errors(&self) -> &[ParseError] {
        self.decoder.errors()
    }

    /// Established headers
    #[inline]
    pub fn headers(&self) -> Option<&Arc<Headers>> {
        self.decoder.headers()
    }

    /// Rows handed to the sink so far
    #[inline]
    pub fn rows_emitted(&self) -> usize {
        self.decoder.rows_emitted()
    }

    /// Input bytes accepted so far
    #[inline]
    pub fn bytes_processed(&self) -> u64 {
        self.totals.bytes_processed
    }

    /// Fraction of `total_size` consumed, when the size is known
    pub fn progress(&self) -> Option<f64> {
        self.config.total_size.map(|total| {
            if total == 0 {
                1.0
            } else {
                (self.totals.bytes_processed as f64 / total as f64).min(1.0)
            }
        })
    }

    /// Whether the document stopped (limit, abort, or cancellation)
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.decoder.is_stopped()
    }

    /// Token that cancels this parser from elsewhere
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Use an existing token, so one token can stop several stages
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Line number the next buffered record starts on
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// The sink
    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The sink, mutably
    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the parser, returning the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Consume the parser, returning the sink and the recorded errors
    pub fn into_parts(mut self) -> (S, Vec<ParseError>) {
        let errors = self.decoder.take_errors();
        (self.sink, errors)
    }

    fn accepting(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            self.decoder.cancel();
        }
        self.finished.is_none() && !self.decoder.is_stopped()
    }

    /// Decode bytes into the text buffer
    ///
    /// Each malformed sequence becomes one U+FFFD whose offset is kept, so
    /// the error can be raised with the record that holds it.
    fn decode_bytes(&mut self, bytes: &[u8], last: bool) {
        let mut input = bytes;
        loop {
            let needed = self
                .text_decoder
                .max_utf8_buffer_length_without_replacement(input.len())
                .unwrap_or_else(|| input.len().saturating_mul(3));
            self.buffer.reserve(needed);
            let (result, read) = self.text_decoder.decode_to_string_without_replacement(
                input,
                &mut self.buffer,
                last,
            );
            input = &input[read..];
            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => {}
                DecoderResult::Malformed(_, _) => {
                    log_trace!("malformed input at buffer offset {}", self.buffer.len());
                    self.malformed.push(self.buffer.len());
                    self.buffer.push(char::REPLACEMENT_CHARACTER);
                }
            }
        }
        if !bytes.is_empty() {
            self.saw_text = true;
        }
    }

    /// Flush when the appended text can complete a row
    fn after_append(&mut self, before: usize) -> Result<(), ParseError> {
        if self.may_complete_row(before) {
            self.process(false)?;
        }
        if self.buffer.len() > self.config.high_water_mark && !self.decoder.is_stopped() {
            log_debug!(
                "buffer of {} bytes exceeds high water mark {}",
                self.buffer.len(),
                self.config.high_water_mark
            );
            let error = ParseError::new(
                ErrorCode::MemoryError,
                format!(
                    "pending row exceeds the buffer limit of {} bytes",
                    self.config.high_water_mark
                ),
                self.line,
                1,
            );
            self.abort(error.clone());
            return Err(error);
        }
        Ok(())
    }

    /// Whether the text appended after `before` holds a possible row end
    ///
    /// The scan starts a little before `before` so a pending `\r` or a
    /// split custom terminator is seen once its continuation arrives.
    fn may_complete_row(&self, before: usize) -> bool {
        let eol = self.options.dialect.eol_bytes();
        let back = eol.map_or(1, |e| e.len().saturating_sub(1).max(1));
        let tail = &self.buffer.as_bytes()[before.saturating_sub(back)..];
        if memchr::memchr2(b'\n', b'\r', tail).is_some() {
            return true;
        }
        match eol.and_then(|e| e.first()) {
            Some(&lead) => memchr::memchr(lead, tail).is_some(),
            None => false,
        }
    }

    /// Run one lexer pass over the buffer and drop what it consumed
    fn process(&mut self, last: bool) -> Result<(), ParseError> {
        let options = Arc::clone(&self.options);
        let cancel = self.cancel.clone();
        let Self {
            buffer,
            malformed,
            decoder,
            sink,
            totals,
            announced,
            line,
            ..
        } = self;

        log_debug!(
            "flushing {} buffered bytes from line {} (final: {})",
            buffer.len(),
            line,
            last
        );
        let mut lexer = Lexer::starting_at(buffer, &options.dialect, *line).partial(!last);
        let result = drive(
            &mut lexer,
            decoder,
            sink,
            Some(&cancel),
            Some(&mut *malformed),
            announced,
        );

        let consumed = lexer.offset();
        totals.lines = totals.lines.max(lexer.lines_consumed());
        totals.comments += lexer.comments();
        if totals.linebreak.is_none() {
            totals.linebreak = lexer.first_newline().map(str::to_string);
        }
        *line = lexer.line();
        drop(lexer);
        buffer.drain(..consumed);
        malformed.consumed(consumed);
        result
    }

    /// Record a fatal error (e.g. from the byte source) and close the document
    pub fn abort(&mut self, error: ParseError) {
        self.decoder.fatal(error);
        self.announce();
        self.buffer.clear();
        self.malformed.clear();
    }

    fn announce(&mut self) {
        announce(&self.decoder, &mut self.sink, &mut self.announced);
    }
}

impl<S: RowSink> std::fmt::Debug for StreamingParser<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingParser")
            .field("buffered", &self.buffer.len())
            .field("line", &self.line)
            .field("rows_emitted", &self.decoder.rows_emitted())
            .field("errors", &self.decoder.errors().len())
            .field("bytes_processed", &self.totals.bytes_processed)
            .finish()
    }
}

// ============================================================================
// Malformed input
// ============================================================================

/// Buffer offsets of U+FFFD characters that replaced malformed byte sequences
///
/// The error is raised when the record holding the bytes is read, so it sits
/// in row order and carries that record's line however the input was split.
/// Offsets inside skipped comment lines go to the record that follows.
#[derive(Debug)]
pub(crate) struct MalformedInput {
    offsets: VecDeque<usize>,
    encoding: &'static str,
}

impl MalformedInput {
    pub(crate) fn new(encoding: &'static str) -> Self {
        Self {
            offsets: VecDeque::new(),
            encoding,
        }
    }

    fn push(&mut self, offset: usize) {
        self.offsets.push_back(offset);
    }

    /// Drop offsets before `end`; true when there were any
    fn take_before(&mut self, end: usize) -> bool {
        let mut taken = false;
        while self.offsets.front().is_some_and(|&offset| offset < end) {
            self.offsets.pop_front();
            taken = true;
        }
        taken
    }

    /// Rebase after `consumed` bytes left the front of the buffer
    fn consumed(&mut self, consumed: usize) {
        for offset in &mut self.offsets {
            *offset = offset.saturating_sub(consumed);
        }
    }

    fn clear(&mut self) {
        self.offsets.clear();
    }

    /// Report malformed bytes up to the end of the record just read
    pub(crate) fn report(
        &mut self,
        record: &Result<Record<'_>, ParseError>,
        lexer: &Lexer<'_>,
        decoder: &mut RowDecoder,
    ) -> Result<(), ParseError> {
        if self.offsets.is_empty() {
            return Ok(());
        }
        let (line, end) = match record {
            Ok(Record::Row(raw)) => (raw.line, lexer.offset()),
            Ok(Record::Blank { line }) => (*line, lexer.offset()),
            Ok(Record::End) => (lexer.line(), usize::MAX),
            Ok(Record::NeedMore) => return Ok(()),
            Err(err) => (err.line, lexer.offset()),
        };
        if self.take_before(end) {
            decoder.encoding_error(line, self.encoding)?;
        }
        Ok(())
    }
}

/// Hand errors recorded since the last call to the sink
pub(crate) fn announce<S: RowSink>(decoder: &RowDecoder, sink: &mut S, announced: &mut usize) {
    for error in decoder.errors().iter().skip(*announced) {
        sink.error(error);
    }
    *announced = decoder.errors().len();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::options::OnError;
    use crate::engine::value::Value;

    fn stream(chunks: &[&[u8]], options: ParseOptions) -> (Vec<Row>, Vec<ParseError>, ParseMeta) {
        let mut parser = StreamingParser::new(options, Vec::new()).unwrap();
        for chunk in chunks {
            parser.feed(chunk).unwrap();
        }
        let meta = parser.end().unwrap();
        let (rows, errors) = parser.into_parts();
        (rows, errors, meta)
    }

    #[test]
    fn test_rows_split_across_fragments() {
        let (rows, errors, meta) = stream(
            &[b"na", b"me,age\r", b"\nAlice,3", b"0\r", b"\nBob,", b"25"],
            ParseOptions::default(),
        );
        assert!(errors.is_empty());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("age"), Some(&Value::from("25")));
        assert_eq!(meta.linebreak, "\r\n");
        assert_eq!(meta.lines, 3);
        assert_eq!(meta.bytes_processed, 26);
    }

    #[test]
    fn test_split_quote_and_custom_eol() {
        let options = ParseOptions::default().with_eol("|||");
        let (rows, errors, _) = stream(&[b"a,b||", b"|\"x|", b"||y\",2|", b"||3,4"], options);
        assert!(errors.is_empty());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("a"), Some(&Value::from("x|||y")));
        assert_eq!(rows[1].get("b"), Some(&Value::from("4")));
    }

    #[test]
    fn test_split_utf8_sequence() {
        let text = "name\nJosé\n".as_bytes();
        let (rows, errors, _) = stream(&[&text[..9], &text[9..]], ParseOptions::default());
        assert!(errors.is_empty());
        assert_eq!(rows[0].get("name"), Some(&Value::from("José")));
    }

    #[test]
    fn test_bom_and_encoding() {
        let (rows, _, meta) = stream(&[b"\xEF\xBB\xBFa\n1\n"], ParseOptions::default());
        assert_eq!(rows[0].get("a"), Some(&Value::from("1")));
        assert_eq!(meta.encoding, "UTF-8");

        let options = ParseOptions::default()
            .with_encoding_label("windows-1252")
            .unwrap();
        let (rows, _, meta) = stream(&[b"city\nZ\xFCrich\n"], options);
        assert_eq!(rows[0].get("city"), Some(&Value::from("Zürich")));
        assert_eq!(meta.encoding, "windows-1252");
    }

    fn codes_and_lines(errors: &[ParseError]) -> Vec<(ErrorCode, usize)> {
        errors.iter().map(|e| (e.code, e.line)).collect()
    }

    #[test]
    fn test_invalid_bytes_reported_on_their_record() {
        let input: &[u8] = b"a,b\n1\n\xFF,2\n\xFE,3\n";
        let expected = [
            (ErrorCode::ColumnMismatch, 2),
            (ErrorCode::EncodingError, 3),
            (ErrorCode::EncodingError, 4),
        ];

        let (rows, errors, _) = stream(&[input], ParseOptions::default());
        assert_eq!(codes_and_lines(&errors), expected);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("a"), Some(&Value::from("\u{FFFD}")));

        let pieces: Vec<&[u8]> = input.chunks(1).collect();
        let (split_rows, split_errors, _) = stream(&pieces, ParseOptions::default());
        assert_eq!(split_errors, errors);
        assert_eq!(split_rows, rows);
    }

    #[test]
    fn test_truncated_sequence_at_end() {
        let (rows, errors, _) = stream(&[b"a\nx\n\xE2\x82"], ParseOptions::default());
        assert_eq!(codes_and_lines(&errors), [(ErrorCode::EncodingError, 3)]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_replacement_char_in_text_is_not_an_error() {
        let mut parser = StreamingParser::new(ParseOptions::default(), Vec::new()).unwrap();
        parser.feed_str("a\n\u{FFFD}\n").unwrap();
        parser.end().unwrap();
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_throw_on_invalid_bytes_keeps_earlier_rows() {
        let input: &[u8] = b"a\n1\n2\n\xFF\n";
        for split in [input.len(), 6] {
            let options = ParseOptions::default().with_on_error(OnError::Throw);
            let mut parser = StreamingParser::new(options, Vec::new()).unwrap();
            let result = parser
                .feed(&input[..split])
                .and_then(|_| parser.feed(&input[split..]));
            let err = result.unwrap_err();
            assert_eq!(err.code, ErrorCode::EncodingError);
            assert_eq!(err.line, 4);
            assert_eq!(parser.sink().len(), 2, "split at {}", split);
        }
    }

    #[test]
    fn test_high_water_mark() {
        let config = StreamConfig::new().with_high_water_mark(8);
        let mut parser =
            StreamingParser::with_config(ParseOptions::default(), Vec::new(), config).unwrap();
        parser.feed(b"a\n1\n").unwrap();
        let err = parser.feed(b"0123456789").unwrap_err();
        assert_eq!(err.code, ErrorCode::MemoryError);
        parser.feed(b"\n2\n").unwrap();
        let meta = parser.end().unwrap();
        assert!(meta.aborted);
        assert_eq!(meta.row_count, 1);
    }

    #[test]
    fn test_cancel_token_stops_stream() {
        let mut parser = StreamingParser::new(ParseOptions::default(), Vec::new()).unwrap();
        let token = parser.cancel_token();
        parser.feed(b"a\n1\n").unwrap();
        token.cancel();
        parser.feed(b"2\n").unwrap();
        let meta = parser.end().unwrap();
        assert!(meta.cancelled);
        assert_eq!(parser.sink().len(), 1);
    }

    #[test]
    fn test_sink_stop() {
        let mut seen = 0;
        let sink = FnSink(|_row: Row| {
            seen += 1;
            if seen == 2 {
                SinkFlow::Stop
            } else {
                SinkFlow::Continue
            }
        });
        let mut parser = StreamingParser::new(ParseOptions::default(), sink).unwrap();
        parser.feed(b"a\n1\n2\n3\n4\n").unwrap();
        let meta = parser.end().unwrap();
        assert!(meta.cancelled);
        assert_eq!(meta.row_count, 2);
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut parser = StreamingParser::new(ParseOptions::default(), Vec::new()).unwrap();
        parser.feed_str("a\n1").unwrap();
        let first = parser.end().unwrap();
        let second = parser.end().unwrap();
        assert_eq!(first, second);
        assert_eq!(parser.sink().len(), 1);
    }

    #[test]
    fn test_throw_mode_surfaces_from_feed() {
        let options = ParseOptions::default().with_on_error(OnError::Throw);
        let mut parser = StreamingParser::new(options, Vec::new()).unwrap();
        let err = parser.feed(b"a,b\n1\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::ColumnMismatch);
        assert!(parser.is_stopped());
    }

    #[test]
    fn test_progress_and_reader() {
        let input: &[u8] = b"a,b\n1,2\n3,4\n";
        let config = StreamConfig::new().with_total_size(input.len() as u64);
        let mut parser =
            StreamingParser::with_config(ParseOptions::default(), Vec::new(), config).unwrap();
        assert_eq!(parser.progress(), Some(0.0));
        let meta = parser.read_from(input, 3).unwrap();
        assert_eq!(meta.row_count, 2);
        assert_eq!(parser.progress(), Some(1.0));
    }

    #[test]
    fn test_read_error_is_fatal() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
            }
        }
        let mut parser = StreamingParser::new(ParseOptions::default(), Vec::new()).unwrap();
        let err = parser.read_from(Broken, 16).unwrap_err();
        assert_eq!(err.code, ErrorCode::IoError);
        assert!(parser.end().unwrap().aborted);
    }

    #[test]
    fn test_errors_reach_the_sink_in_order() {
        #[derive(Default)]
        struct Log(Vec<String>);
        impl RowSink for Log {
            fn accept(&mut self, row: Row) -> SinkFlow {
                self.0.push(format!("row {}", row.get("a").unwrap()));
                SinkFlow::Continue
            }
            fn error(&mut self, error: &ParseError) {
                self.0.push(format!("error {}", error.line));
            }
        }
        let mut parser = StreamingParser::new(ParseOptions::default(), Log::default()).unwrap();
        parser.feed(b"a,b\n1,1\n2\n3,3\n").unwrap();
        parser.end().unwrap();
        assert_eq!(parser.sink().0, ["row 1", "error 3", "row 3"]);
    }
}
