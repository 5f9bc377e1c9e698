//! Parse results and document metadata

use std::time::Duration;

use serde::Serialize;

use super::decoder::RowDecoder;
use super::error::ParseError;
use super::row::Row;

/// Everything a batch parse produced
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutput {
    /// Decoded rows in input order
    pub rows: Vec<Row>,
    /// Recorded errors in input order
    pub errors: Vec<ParseError>,
    /// Document metadata
    pub meta: ParseMeta,
}

/// Summary of one parsed document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMeta {
    /// Field delimiter in effect
    pub delimiter: String,
    /// Row terminator: the custom EOL, else the first one seen, else `"\n"`
    pub linebreak: String,
    /// Established headers (empty when none were established)
    pub headers: Vec<String>,
    /// Rows handed out
    pub row_count: usize,
    /// Header count
    pub column_count: usize,
    /// A line range or `max_rows` ended the document early
    pub truncated: bool,
    /// `max_errors`, a fatal error or a thrown error ended the document
    pub aborted: bool,
    /// The consumer stopped the document
    pub cancelled: bool,
    /// Encoding the input was decoded with
    pub encoding: String,
    /// Wall-clock parse time
    pub parse_time_ms: f64,
    /// Input bytes consumed
    pub bytes_processed: u64,
    /// Physical lines read
    pub lines: usize,
    /// Comment lines skipped
    pub comments: usize,
    /// Errors recorded
    pub error_count: usize,
}

/// Lexer-side counters accumulated over one or more passes
#[derive(Debug, Clone, Default)]
pub(crate) struct PassTotals {
    pub bytes_processed: u64,
    pub lines: usize,
    pub comments: usize,
    pub linebreak: Option<String>,
    pub encoding: &'static str,
}

impl ParseMeta {
    pub(crate) fn build(decoder: &RowDecoder, totals: &PassTotals, elapsed: Duration) -> Self {
        let dialect = &decoder.options().dialect;
        let linebreak = dialect
            .eol
            .custom()
            .map(str::to_string)
            .or_else(|| totals.linebreak.clone())
            .unwrap_or_else(|| "\n".to_string());
        let headers: Vec<String> = decoder
            .headers()
            .map(|h| h.names().to_vec())
            .unwrap_or_default();

        Self {
            delimiter: char::from(dialect.delimiter).to_string(),
            linebreak,
            column_count: headers.len(),
            headers,
            row_count: decoder.rows_emitted(),
            truncated: decoder.is_truncated(),
            aborted: decoder.is_aborted(),
            cancelled: decoder.is_cancelled(),
            encoding: totals.encoding.to_string(),
            parse_time_ms: elapsed.as_secs_f64() * 1000.0,
            bytes_processed: totals.bytes_processed,
            lines: totals.lines,
            comments: totals.comments,
            error_count: decoder.errors().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::options::ParseOptions;
    use std::sync::Arc;

    #[test]
    fn test_meta_defaults_without_headers() {
        let decoder = RowDecoder::new(Arc::new(ParseOptions::default().with_delimiter(b';')));
        let totals = PassTotals {
            encoding: "UTF-8",
            ..PassTotals::default()
        };
        let meta = ParseMeta::build(&decoder, &totals, Duration::from_millis(2));
        assert_eq!(meta.delimiter, ";");
        assert_eq!(meta.linebreak, "\n");
        assert!(meta.headers.is_empty());
        assert_eq!(meta.parse_time_ms, 2.0);
    }

    #[test]
    fn test_meta_prefers_custom_eol() {
        let options = ParseOptions::default().with_eol("|||");
        let decoder = RowDecoder::new(Arc::new(options));
        let totals = PassTotals {
            linebreak: Some("\r\n".to_string()),
            ..PassTotals::default()
        };
        let meta = ParseMeta::build(&decoder, &totals, Duration::ZERO);
        assert_eq!(meta.linebreak, "|||");
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let decoder = RowDecoder::new(Arc::new(ParseOptions::default().with_headers(["a"])));
        let meta = ParseMeta::build(&decoder, &PassTotals::default(), Duration::ZERO);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["columnCount"], 1);
        assert_eq!(json["rowCount"], 0);
        assert_eq!(json["headers"][0], "a");
    }
}
