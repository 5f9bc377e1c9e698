//! Delimited-text lexer
//!
//! A hand-rolled state machine over one in-memory text buffer. Field values
//! borrow the buffer (`Cow::Borrowed`) unless unescaping or appended text
//! forces a copy.
//!
//! # Quoted fields
//!
//! Quoted fields have two explicit paths:
//!
//! 1. **Fast path**: `memchr` finds the closing quote. When the content holds
//!    no doubled quote, escape byte or line break, the field is a slice of
//!    the input.
//! 2. **Slow path**: the cursor is restored to the opening quote and the field
//!    is rebuilt byte by byte, unescaping and tracking line breaks.
//!
//! # Partial mode
//!
//! A lexer in partial mode never assumes its buffer is the whole input. When
//! it reaches the end of the buffer before a row terminator (inside an open
//! quote, on a trailing `\r`, on a prefix of a custom line ending, or simply
//! mid-row) it rewinds to the row start and reports [`Record::NeedMore`].
//! The streaming coordinator relies on this to split input anywhere.

use std::borrow::Cow;

use memchr::{memchr, memchr2, memchr3};

use super::char_class::{char_count, is_blank, CharClass, CharClassTable};
use super::cursor::{CursorState, SourcePosition};
use super::error::ParseError;
use super::options::Dialect;

/// Kind of a lexical token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A field value
    Field,
    /// The field delimiter
    Delimiter,
    /// A row terminator
    Newline,
    /// End of the buffer
    EndOfInput,
}

/// A lexical token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token kind
    pub kind: TokenKind,
    /// Field value, or the delimiter / terminator text
    pub value: Cow<'a, str>,
    /// Line the token starts on
    pub line: usize,
    /// Column the token starts at
    pub column: usize,
    /// Whether the field was quoted
    pub quoted: bool,
}

impl<'a> Token<'a> {
    #[inline]
    fn new(kind: TokenKind, value: Cow<'a, str>, start: CursorState, quoted: bool) -> Self {
        Self {
            kind,
            value,
            line: start.line,
            column: start.column,
            quoted,
        }
    }

    #[inline]
    fn end(at: CursorState) -> Self {
        Self::new(TokenKind::EndOfInput, Cow::Borrowed(""), at, false)
    }
}

/// Fields of one record, before header mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow<'a> {
    /// Field values in order
    pub fields: Vec<Cow<'a, str>>,
    /// Physical line the record starts on
    pub line: usize,
}

impl<'a> RawRow<'a> {
    /// Number of fields
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether every field is empty or whitespace
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|f| f.trim().is_empty())
    }

    /// Copy the fields out of the input buffer
    pub fn into_owned(self) -> Vec<String> {
        self.fields.into_iter().map(Cow::into_owned).collect()
    }
}

/// Outcome of reading one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<'a> {
    /// A record with at least one field
    Row(RawRow<'a>),
    /// An empty line
    Blank {
        /// Line of the empty line
        line: usize,
    },
    /// Partial mode only: the buffer ends before the record does
    NeedMore,
    /// The input is exhausted
    End,
}

/// Result of matching a row terminator
enum Eol {
    No,
    Yes(usize),
    Incomplete,
}

/// Tokenizer over one text buffer
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    dialect: &'a Dialect,
    table: CharClassTable,
    eol: Option<&'a [u8]>,
    cursor: CursorState,
    partial: bool,
    comments: usize,
    first_newline: Option<&'a str>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over a complete input
    pub fn new(input: &'a str, dialect: &'a Dialect) -> Self {
        Self::starting_at(input, dialect, 1)
    }

    /// Create a lexer whose first line is numbered `line`
    pub fn starting_at(input: &'a str, dialect: &'a Dialect, line: usize) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            dialect,
            table: CharClassTable::new(dialect),
            eol: dialect.eol_bytes().filter(|eol| !eol.is_empty()),
            cursor: CursorState::at_line(line),
            partial: false,
            comments: 0,
            first_newline: None,
        }
    }

    /// Switch partial mode on or off
    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Snapshot the cursor
    #[inline]
    pub fn save_state(&self) -> CursorState {
        self.cursor
    }

    /// Return to a snapshot
    #[inline]
    pub fn restore_state(&mut self, state: CursorState) {
        self.cursor = state;
    }

    /// Current byte offset into the buffer
    #[inline]
    pub fn offset(&self) -> usize {
        self.cursor.offset
    }

    /// Current line
    #[inline]
    pub fn line(&self) -> usize {
        self.cursor.line
    }

    /// Current position
    #[inline]
    pub fn position(&self) -> SourcePosition {
        self.cursor.position()
    }

    /// Whether the whole buffer has been consumed
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.cursor.offset >= self.bytes.len()
    }

    /// Number of comment lines skipped so far
    #[inline]
    pub fn comments(&self) -> usize {
        self.comments
    }

    /// The first row terminator seen outside quotes
    #[inline]
    pub fn first_newline(&self) -> Option<&'a str> {
        self.first_newline
    }

    /// Number of physical lines consumed, counting a final unterminated line
    pub fn lines_consumed(&self) -> usize {
        if self.cursor.at_line_start() {
            self.cursor.line - 1
        } else {
            self.cursor.line
        }
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Read the next record, skipping comment lines
    pub fn next_record(&mut self) -> Result<Record<'a>, ParseError> {
        if !self.skip_comments() {
            return Ok(Record::NeedMore);
        }
        let start = self.save_state();
        if self.is_at_end() {
            return Ok(if self.partial {
                Record::NeedMore
            } else {
                Record::End
            });
        }

        let mut fields: Vec<Cow<'a, str>> = Vec::new();
        let mut expect_field = true;
        loop {
            let token = self.next_token()?;
            match token.kind {
                TokenKind::Field => {
                    fields.push(token.value);
                    expect_field = false;
                }
                TokenKind::Delimiter => {
                    if expect_field {
                        fields.push(Cow::Borrowed(""));
                    }
                    expect_field = true;
                }
                TokenKind::Newline => break,
                TokenKind::EndOfInput => {
                    if self.partial {
                        self.restore_state(start);
                        return Ok(Record::NeedMore);
                    }
                    break;
                }
            }
        }

        if expect_field && !fields.is_empty() {
            fields.push(Cow::Borrowed(""));
        }
        if fields.is_empty() {
            Ok(Record::Blank { line: start.line })
        } else {
            Ok(Record::Row(RawRow {
                fields,
                line: start.line,
            }))
        }
    }

    /// Read the next non-blank row; `None` at end of input (or, in partial
    /// mode, when more input is needed)
    pub fn parse_row(&mut self) -> Result<Option<RawRow<'a>>, ParseError> {
        loop {
            match self.next_record()? {
                Record::Row(row) => return Ok(Some(row)),
                Record::Blank { .. } => continue,
                Record::NeedMore | Record::End => return Ok(None),
            }
        }
    }

    /// Skip comment lines at the cursor; `false` when one is cut off in partial mode
    fn skip_comments(&mut self) -> bool {
        let Some(comment) = self.dialect.comment else {
            return true;
        };
        while self.cursor.at_line_start() && self.bytes.get(self.cursor.offset) == Some(&comment) {
            match self.line_end(self.cursor.offset) {
                Some((at, len)) => {
                    self.advance_to(at);
                    self.cursor.newline(len);
                }
                None if self.partial => return false,
                None => self.advance_to(self.bytes.len()),
            }
            self.comments += 1;
        }
        true
    }

    /// First complete row terminator at or after `from`
    fn line_end(&self, from: usize) -> Option<(usize, usize)> {
        let mut i = from;
        loop {
            let rest = &self.bytes[i..];
            let rel = match self.eol.and_then(|eol| eol.first()) {
                Some(&lead) => memchr3(b'\n', b'\r', lead, rest),
                None => memchr2(b'\n', b'\r', rest),
            }?;
            let at = i + rel;
            match self.match_eol(at) {
                Eol::Yes(len) => return Some((at, len)),
                Eol::Incomplete => return None,
                Eol::No => i = at + 1,
            }
        }
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    /// Read the next token
    ///
    /// An empty unquoted field produces no `Field` token: two delimiters in a
    /// row yield two `Delimiter` tokens. In partial mode `EndOfInput` is also
    /// returned where the buffer cuts a token short.
    pub fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.cursor;
        let at = start.offset;
        if at >= self.bytes.len() {
            return Ok(Token::end(start));
        }
        let input = self.input;

        match self.table.class(self.bytes[at]) {
            CharClass::Delimiter => {
                self.cursor.advance(1, 1);
                Ok(Token::new(
                    TokenKind::Delimiter,
                    Cow::Borrowed(&input[at..at + 1]),
                    start,
                    false,
                ))
            }
            CharClass::Newline => match self.match_eol(at) {
                Eol::Yes(len) => {
                    self.advance_to(at);
                    if self.first_newline.is_none() {
                        self.first_newline = Some(&input[at..at + len]);
                    }
                    self.cursor.newline(len);
                    Ok(Token::new(
                        TokenKind::Newline,
                        Cow::Borrowed(&input[at..at + len]),
                        start,
                        false,
                    ))
                }
                Eol::Incomplete => Ok(Token::end(start)),
                Eol::No => self.field(start),
            },
            _ => self.field(start),
        }
    }

    fn field(&mut self, start: CursorState) -> Result<Token<'a>, ParseError> {
        let bytes = self.bytes;
        let mut pos = start.offset;
        if self.dialect.trim.left() {
            while pos < bytes.len() && is_blank(bytes[pos]) {
                pos += 1;
            }
        }
        if let Some(quote) = self.dialect.quote {
            if pos < bytes.len() && bytes[pos] == quote {
                self.advance_to(pos);
                return self.quoted(start);
            }
        }
        Ok(self.unquoted(start, start.offset))
    }

    fn unquoted(&mut self, start: CursorState, from: usize) -> Token<'a> {
        let end = self.unquoted_end(from);
        self.advance_to(end);
        Token::new(TokenKind::Field, self.trimmed(from, end), start, false)
    }

    /// End of an unquoted run: the next delimiter or real row terminator
    fn unquoted_end(&self, from: usize) -> usize {
        let mut i = from;
        loop {
            let end = self.table.find_field_end(self.bytes, i);
            if end >= self.bytes.len() || self.table.class(self.bytes[end]) == CharClass::Delimiter
            {
                return end;
            }
            match self.match_eol(end) {
                Eol::No => i = end + 1,
                Eol::Yes(_) | Eol::Incomplete => return end,
            }
        }
    }

    fn trimmed(&self, mut a: usize, mut b: usize) -> Cow<'a, str> {
        let input = self.input;
        let bytes = self.bytes;
        let trim = self.dialect.trim;
        if trim.left() {
            while a < b && is_blank(bytes[a]) {
                a += 1;
            }
        }
        if trim.right() {
            while b > a && is_blank(bytes[b - 1]) {
                b -= 1;
            }
        }
        let mut s = &input[a..b];
        if trim.left() && s.starts_with(char::is_whitespace) {
            s = s.trim_start();
        }
        if trim.right() && s.ends_with(char::is_whitespace) {
            s = s.trim_end();
        }
        Cow::Borrowed(s)
    }

    /// Cursor is on the opening quote
    fn quoted(&mut self, start: CursorState) -> Result<Token<'a>, ParseError> {
        let open = self.save_state();
        let Some(quote) = self.dialect.quote else {
            return Ok(self.unquoted(start, start.offset));
        };
        let input = self.input;
        let bytes = self.bytes;

        self.cursor.advance(1, 1);
        let content = self.cursor.offset;
        if let Some(rel) = memchr(quote, &bytes[content..]) {
            let close = content + rel;
            let segment = &bytes[content..close];
            let doubled = bytes.get(close + 1) == Some(&quote);
            let at_edge = self.partial && close + 1 == bytes.len();
            let escaped = match self.dialect.escape {
                Some(escape) if escape != quote => memchr(escape, segment).is_some(),
                _ => false,
            };
            if !doubled && !at_edge && !escaped && memchr2(b'\n', b'\r', segment).is_none() {
                self.advance_to(close + 1);
                let value = Cow::Borrowed(&input[content..close]);
                return Ok(self.after_quote(start, value));
            }
        }

        self.restore_state(open);
        self.quoted_slow(start, open, quote)
    }

    fn quoted_slow(
        &mut self,
        start: CursorState,
        open: CursorState,
        quote: u8,
    ) -> Result<Token<'a>, ParseError> {
        let input = self.input;
        let bytes = self.bytes;
        let len = bytes.len();
        let escape = self.dialect.escape.filter(|&e| e != quote);
        log_trace!("slow quoted path at line {}, column {}", open.line, open.column);

        self.cursor.advance(1, 1);
        let mut out = String::new();
        let mut run = self.cursor.offset;
        let mut i = run;
        loop {
            if i >= len {
                return self.unterminated(start, open);
            }
            let b = bytes[i];

            if Some(b) == escape {
                match bytes.get(i + 1) {
                    Some(&next) if next == quote || Some(next) == escape => {
                        out.push_str(&input[run..i]);
                        // the escaped byte opens the next run
                        run = i + 1;
                        i += 2;
                    }
                    _ => i += 1,
                }
                continue;
            }

            if b == quote {
                if bytes.get(i + 1) == Some(&quote) {
                    out.push_str(&input[run..=i]);
                    run = i + 2;
                    i += 2;
                    continue;
                }
                if self.partial && i + 1 == len {
                    return Ok(self.cut_short(open));
                }
                out.push_str(&input[run..i]);
                self.advance_to(i + 1);
                return Ok(self.after_quote(start, Cow::Owned(out)));
            }

            if b == b'\n' || b == b'\r' {
                let nl = if b == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                self.advance_to(i);
                self.cursor.newline(nl);
                i += nl;
                continue;
            }

            i += 1;
        }
    }

    /// Text between a closing quote and the field end is kept literally
    fn after_quote(&mut self, start: CursorState, mut value: Cow<'a, str>) -> Token<'a> {
        let input = self.input;
        let from = self.cursor.offset;
        let end = self.unquoted_end(from);
        if end > from {
            self.advance_to(end);
            let mut tail = &input[from..end];
            if self.dialect.trim.right() {
                tail = tail.trim_end();
            }
            if !tail.is_empty() {
                value.to_mut().push_str(tail);
            }
        }
        Token::new(TokenKind::Field, value, start, true)
    }

    fn unterminated(
        &mut self,
        start: CursorState,
        open: CursorState,
    ) -> Result<Token<'a>, ParseError> {
        if self.partial {
            return Ok(self.cut_short(open));
        }
        if self.dialect.relax_quotes {
            log_trace!("relaxing unclosed quote at line {}", open.line);
            self.restore_state(open);
            self.cursor.advance(1, 1);
            let from = self.cursor.offset;
            return Ok(self.unquoted(start, from));
        }
        // The rest of the input belongs to the open quote; line breaks up to
        // here are already counted.
        self.advance_to(self.bytes.len());
        Err(ParseError::unclosed_quote(open.line, open.column))
    }

    fn cut_short(&mut self, open: CursorState) -> Token<'a> {
        self.restore_state(open);
        Token::end(open)
    }

    // ========================================================================
    // Cursor helpers
    // ========================================================================

    /// Move the cursor forward over content containing no line break
    #[inline]
    fn advance_to(&mut self, target: usize) {
        let from = self.cursor.offset;
        if target > from {
            let chars = char_count(&self.bytes[from..target]);
            self.cursor.advance(target - from, chars);
        }
    }

    fn match_eol(&self, at: usize) -> Eol {
        let rest = &self.bytes[at..];
        if let Some(eol) = self.eol {
            if rest.starts_with(eol) {
                return Eol::Yes(eol.len());
            }
            if self.partial && rest.len() < eol.len() && eol.starts_with(rest) {
                return Eol::Incomplete;
            }
        }
        match rest.first() {
            Some(b'\n') => Eol::Yes(1),
            Some(b'\r') => match rest.get(1) {
                Some(b'\n') => Eol::Yes(2),
                Some(_) => Eol::Yes(1),
                None if self.partial => Eol::Incomplete,
                None => Eol::Yes(1),
            },
            _ => Eol::No,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<RawRow<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parse_row().transpose()
    }
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("cursor", &self.cursor)
            .field("len", &self.bytes.len())
            .field("partial", &self.partial)
            .finish()
    }
}
