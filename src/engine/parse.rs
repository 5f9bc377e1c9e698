//! One-shot parsing entry points
//!
//! [`parse`] runs a single final-mode lexer over an in-memory string.
//! [`parse_bytes`] goes through the [`StreamingParser`] so the configured
//! encoding is honored. Both share [`drive`], the loop that moves records
//! from a lexer through the decoder into a sink.

use std::sync::Arc;
use std::time::Instant;

use super::decoder::{Decoded, RowDecoder};
use super::error::{Error, ParseError};
use super::lexer::{Lexer, Record};
use super::meta::{ParseMeta, ParseOutput, PassTotals};
use super::options::ParseOptions;
use super::streaming::{
    announce, CancelToken, MalformedInput, RowSink, SinkFlow, StreamingParser,
};

/// Parse a complete document held in memory
///
/// Returns `Err` for invalid options, in `throw` mode, and when an error
/// handler aborts. Every other problem is recorded in
/// [`ParseOutput::errors`] and the parse continues.
///
/// ```rust
/// use delimit::engine::{parse, ParseOptions, Value};
///
/// let output = parse("name,age\nAlice,30\n", &ParseOptions::default()).unwrap();
/// assert_eq!(output.rows.len(), 1);
/// assert_eq!(output.rows[0].get("age"), Some(&Value::from("30")));
/// assert_eq!(output.meta.headers, ["name", "age"]);
/// ```
pub fn parse(text: &str, options: &ParseOptions) -> Result<ParseOutput, Error> {
    options.validate()?;
    let started = Instant::now();
    let bytes_processed = text.len() as u64;
    let text = if options.strip_bom {
        text.strip_prefix('\u{FEFF}').unwrap_or(text)
    } else {
        text
    };
    log_debug!("parse: input_len={}", text.len());

    let options = Arc::new(options.clone());
    let mut decoder = RowDecoder::new(Arc::clone(&options));
    let mut rows = Vec::new();
    let mut announced = 0;

    let mut lexer = Lexer::new(text, &options.dialect);
    drive(&mut lexer, &mut decoder, &mut rows, None, None, &mut announced)?;
    decoder.finish()?;

    let totals = PassTotals {
        bytes_processed,
        lines: lexer.lines_consumed(),
        comments: lexer.comments(),
        linebreak: lexer.first_newline().map(str::to_string),
        encoding: encoding_rs::UTF_8.name(),
    };
    let meta = ParseMeta::build(&decoder, &totals, started.elapsed());
    Ok(ParseOutput {
        rows,
        errors: decoder.take_errors(),
        meta,
    })
}

/// Parse a complete document given as bytes in the configured encoding
pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> Result<ParseOutput, Error> {
    let mut parser = StreamingParser::new(options.clone(), Vec::new())?;
    parser.feed(bytes)?;
    let meta = parser.end()?;
    let (rows, errors) = parser.into_parts();
    Ok(ParseOutput { rows, errors, meta })
}

/// Move records from `lexer` through `decoder` into `sink`
///
/// Stops when the lexer runs dry (or needs more input), the decoder stops,
/// the sink asks to stop, or `cancel` fires. Errors recorded along the way
/// are handed to the sink in order with the rows. Malformed bytes noted by
/// the byte decoder are reported just before the record that holds them.
pub(crate) fn drive<S: RowSink>(
    lexer: &mut Lexer<'_>,
    decoder: &mut RowDecoder,
    sink: &mut S,
    cancel: Option<&CancelToken>,
    mut malformed: Option<&mut MalformedInput>,
    announced: &mut usize,
) -> Result<(), ParseError> {
    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            decoder.cancel();
        }
        if decoder.is_stopped() {
            break;
        }
        let record = lexer.next_record();
        if let Some(malformed) = malformed.as_deref_mut() {
            malformed.report(&record, lexer, decoder)?;
        }
        let decoded = match record {
            Ok(Record::Row(raw)) => decoder.decode(raw),
            Ok(Record::Blank { .. }) => continue,
            Ok(Record::NeedMore) | Ok(Record::End) => break,
            Err(err) => decoder.lexical_error(err),
        };
        let decoded = decoded?;
        announce(decoder, sink, announced);
        match decoded {
            Decoded::Row(row) => {
                if sink.accept(row) == SinkFlow::Stop {
                    decoder.cancel();
                }
            }
            Decoded::Dropped => {}
            Decoded::Stop => break,
        }
    }
    announce(decoder, sink, announced);
    Ok(())
}
