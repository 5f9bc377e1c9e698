//! Character class lookup table for O(1) byte classification
//!
//! The lexer consults one 256-entry table per scanned byte instead of
//! comparing against the delimiter, quote and line terminator separately.
//! A table is built per [`Dialect`](super::options::Dialect); there is no
//! shared or global table, so lexers with different dialects never interfere.

use memchr::memchr3;

use super::options::{Dialect, LineEnding};

/// Classification of a single byte under a dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CharClass {
    /// Ordinary field content
    Other = 0,
    /// The field delimiter
    Delimiter = 1,
    /// `\r`, `\n`, or the first byte of a custom end-of-line string
    Newline = 2,
    /// The quote byte
    Quote = 3,
}

/// Pre-computed byte classification for one dialect
///
/// # Example
///
/// ```rust
/// use delimit::engine::char_class::{CharClass, CharClassTable};
/// use delimit::engine::options::Dialect;
///
/// let table = CharClassTable::new(&Dialect::default());
/// assert_eq!(table.class(b','), CharClass::Delimiter);
/// assert_eq!(table.class(b'"'), CharClass::Quote);
/// assert_eq!(table.class(b'\n'), CharClass::Newline);
/// assert_eq!(table.class(b'a'), CharClass::Other);
/// ```
#[derive(Clone, Copy)]
pub struct CharClassTable {
    classes: [CharClass; 256],
    /// Set when the only field-end bytes are this delimiter, `\n` and `\r`
    memchr_delimiter: Option<u8>,
}

impl CharClassTable {
    /// Build the table for a dialect
    ///
    /// Later assignments win: the quote and delimiter bytes override a custom
    /// EOL lead byte. [`Dialect::validate`] rejects the overlapping cases, so
    /// the order only matters for unvalidated dialects.
    pub fn new(dialect: &Dialect) -> Self {
        let mut classes = [CharClass::Other; 256];

        classes[b'\n' as usize] = CharClass::Newline;
        classes[b'\r' as usize] = CharClass::Newline;
        if let LineEnding::Custom(eol) = &dialect.eol {
            if let Some(&first) = eol.as_bytes().first() {
                classes[first as usize] = CharClass::Newline;
            }
        }
        if let Some(quote) = dialect.quote {
            classes[quote as usize] = CharClass::Quote;
        }
        classes[dialect.delimiter as usize] = CharClass::Delimiter;

        let field_ends = classes
            .iter()
            .filter(|c| matches!(c, CharClass::Delimiter | CharClass::Newline))
            .count();
        let plain = field_ends == 3
            && classes[b'\n' as usize] == CharClass::Newline
            && classes[b'\r' as usize] == CharClass::Newline;

        Self {
            classes,
            memchr_delimiter: plain.then_some(dialect.delimiter),
        }
    }

    /// Classify a byte
    #[inline(always)]
    pub fn class(&self, b: u8) -> CharClass {
        self.classes[b as usize]
    }

    /// Whether the byte ends an unquoted field (delimiter or newline lead)
    #[inline(always)]
    pub fn is_field_end(&self, b: u8) -> bool {
        matches!(
            self.classes[b as usize],
            CharClass::Delimiter | CharClass::Newline
        )
    }

    /// Position of the first byte at or after `from` that may end an unquoted field
    #[inline]
    pub fn find_field_end(&self, bytes: &[u8], from: usize) -> usize {
        if let (Some(delimiter), Some(rest)) = (self.memchr_delimiter, bytes.get(from..)) {
            return memchr3(delimiter, b'\n', b'\r', rest).map_or(bytes.len(), |at| from + at);
        }

        let mut i = from;
        let len = bytes.len();

        // Unrolled by 4 for the common long-field case
        while i + 4 <= len {
            if self.is_field_end(bytes[i]) {
                return i;
            }
            if self.is_field_end(bytes[i + 1]) {
                return i + 1;
            }
            if self.is_field_end(bytes[i + 2]) {
                return i + 2;
            }
            if self.is_field_end(bytes[i + 3]) {
                return i + 3;
            }
            i += 4;
        }
        while i < len && !self.is_field_end(bytes[i]) {
            i += 1;
        }
        i
    }
}

impl std::fmt::Debug for CharClassTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let special: Vec<(u8, CharClass)> = (0u8..=255)
            .filter(|&b| self.class(b) != CharClass::Other)
            .map(|b| (b, self.class(b)))
            .collect();
        f.debug_struct("CharClassTable")
            .field("special", &special)
            .finish()
    }
}

/// Whether a byte is ASCII space or tab (the fast trim set)
#[inline(always)]
pub fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Number of chars in a UTF-8 byte slice (counts non-continuation bytes)
#[inline]
pub fn char_count(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| (b as i8) >= -0x40).count()
}
