//! Property-based tests using proptest
//!
//! These tests check that the output is independent of how the input is
//! fragmented, and that quoting any field text reads back the same text.

use delimit::{parse, parse_bytes, Dialect, ParseOptions, StreamingParser};
use delimit::engine::Lexer;
use proptest::prelude::*;

/// Quote a field the way a conforming writer would
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn stream_in_pieces(
    input: &[u8],
    cuts: &[usize],
    options: &ParseOptions,
) -> (Vec<delimit::Row>, Vec<delimit::ParseError>) {
    let mut parser = StreamingParser::new(options.clone(), Vec::new()).unwrap();
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (input.len() + 1)).collect();
    points.sort_unstable();
    let mut from = 0;
    for point in points {
        parser.feed(&input[from..point]).unwrap();
        from = point;
    }
    parser.feed(&input[from..]).unwrap();
    parser.end().unwrap();
    parser.into_parts()
}

/// Documents mixing quotes, separators, line ending styles and multi-byte text
fn document() -> impl Strategy<Value = String> {
    let field = prop_oneof![
        "[a-z0-9 ]{0,6}",
        "[a-zé東,\"\r\n]{0,6}".prop_map(|s| quote(&s)),
        Just(String::new()),
    ];
    let row = prop::collection::vec(field, 1..4).prop_map(|fields| fields.join(","));
    let eol = prop_oneof![Just("\n"), Just("\r\n"), Just("\r")];
    prop::collection::vec((row, eol), 1..6).prop_map(|rows| {
        rows.into_iter()
            .map(|(row, eol)| format!("{}{}", row, eol))
            .collect()
    })
}

/// The same documents with byte sequences that are not valid UTF-8 spliced in
fn document_bytes() -> impl Strategy<Value = Vec<u8>> {
    let bad = prop_oneof![
        Just(&b"\xFF"[..]),
        Just(&b"\x80"[..]),
        Just(&b"\xC3"[..]),
        Just(&b"\xE2\x82"[..]),
    ];
    (document(), prop::collection::vec((any::<usize>(), bad), 0..4)).prop_map(|(text, inserts)| {
        let mut bytes = text.into_bytes();
        for (at, bad) in inserts {
            let at = at % (bytes.len() + 1);
            bytes.splice(at..at, bad.iter().copied());
        }
        bytes
    })
}

// =============================================================================
// Fragmentation invariance
// =============================================================================

proptest! {
    /// Any split of the bytes yields the rows and errors of the one-shot parse
    #[test]
    fn test_chunk_invariance(
        input in document(),
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let options = ParseOptions::default().with_relax_column_count(true);
        let batch = parse(&input, &options).unwrap();
        let (rows, errors) = stream_in_pieces(input.as_bytes(), &cuts, &options);
        prop_assert_eq!(rows, batch.rows);
        prop_assert_eq!(errors, batch.errors);
    }

    /// Invalid bytes are reported the same way however the input is split
    #[test]
    fn test_chunk_invariance_invalid_bytes(
        input in document_bytes(),
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let options = ParseOptions::default().with_relax_column_count(true);
        let batch = parse_bytes(&input, &options).unwrap();
        let (rows, errors) = stream_in_pieces(&input, &cuts, &options);
        prop_assert_eq!(rows, batch.rows);
        prop_assert_eq!(errors, batch.errors);
    }

    /// Same with a multi-byte custom terminator that may be split anywhere
    #[test]
    fn test_chunk_invariance_custom_eol(
        fields in prop::collection::vec("[a-z|]{0,5}", 1..12),
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let options = ParseOptions::default()
            .with_eol("|||")
            .with_header(delimit::HeaderMode::None)
            .with_relax_column_count(true);
        let input = fields
            .chunks(2)
            .map(|pair| pair.iter().map(|f| quote(f)).collect::<Vec<_>>().join(","))
            .collect::<Vec<_>>()
            .join("|||");
        let batch = parse(&input, &options).unwrap();
        let (rows, errors) = stream_in_pieces(input.as_bytes(), &cuts, &options);
        prop_assert_eq!(rows, batch.rows);
        prop_assert_eq!(errors, batch.errors);
    }
}

// =============================================================================
// Quote round-trip
// =============================================================================

proptest! {
    /// A quoted field reads back exactly
    #[test]
    fn test_quote_round_trip(fields in prop::collection::vec("[ -~é\r\n]{0,12}", 1..5)) {
        let line = fields.iter().map(|f| quote(f)).collect::<Vec<_>>().join(",");
        let dialect = Dialect::default();
        let mut lexer = Lexer::new(&line, &dialect);
        let row = lexer.parse_row().unwrap().unwrap().into_owned();
        prop_assert_eq!(row, fields);
        prop_assert!(lexer.parse_row().unwrap().is_none());
    }

    /// Unquoted fields without special bytes pass through untouched
    #[test]
    fn test_plain_fields_pass_through(fields in prop::collection::vec("[a-zA-Z0-9 .;-]{1,10}", 1..6)) {
        let line = fields.join(",");
        let dialect = Dialect::default();
        let row = Lexer::new(&line, &dialect).parse_row().unwrap().unwrap().into_owned();
        prop_assert_eq!(row, fields);
    }
}
