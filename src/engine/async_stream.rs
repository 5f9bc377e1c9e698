//! Async streaming adapter
//!
//! Drives a [`StreamingParser`] from a `tokio` [`AsyncRead`] and delivers
//! [`StreamEvent`]s through a bounded channel.
//!
//! # Backpressure
//!
//! At most `read_chunk_size` bytes are read at a time. The rows decoded
//! from one read are sent before the next read starts, and each send waits
//! for channel capacity, so a slow consumer slows the reader down instead of
//! growing a queue.
//!
//! # Cancellation
//!
//! The [`CancelToken`] stops the loop before the next read and before the
//! next record. Dropping the receiver has the same effect. Rows decoded
//! before either are still delivered when the receiver is alive.
//!
//! ```rust,ignore
//! use delimit::engine::async_stream::{row_stream, AsyncStreamConfig, StreamEvent};
//! use futures::StreamExt;
//!
//! let file = tokio::fs::File::open("data.csv").await?;
//! let (mut events, _cancel) = row_stream(file, options, AsyncStreamConfig::default())?;
//! while let Some(event) = events.next().await {
//!     match event {
//!         StreamEvent::Row(row) => println!("{:?}", row),
//!         StreamEvent::Error(err) => eprintln!("{}", err),
//!         StreamEvent::End(meta) => println!("{} rows", meta.row_count),
//!     }
//! }
//! ```

use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use super::error::{ConfigError, Error, ErrorCode, ParseError};
use super::meta::ParseMeta;
use super::options::ParseOptions;
use super::row::Row;
use super::streaming::{
    CancelToken, RowSink, SinkFlow, StreamConfig, StreamingParser, DEFAULT_HIGH_WATER_MARK,
};

/// Async reader settings
#[derive(Debug, Clone)]
pub struct AsyncStreamConfig {
    /// Largest single read
    pub read_chunk_size: usize,
    /// Bound of the event channel
    pub channel_capacity: usize,
    /// Largest amount of buffered text allowed after a flush
    pub high_water_mark: usize,
    /// Expected input size in bytes, for progress reporting
    pub total_size: Option<u64>,
    /// Longest wait for a single read
    pub read_timeout: Option<Duration>,
}

impl Default for AsyncStreamConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 8 * 1024,
            channel_capacity: 64,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            total_size: None,
            read_timeout: None,
        }
    }
}

impl AsyncStreamConfig {
    /// Default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the read size
    pub fn with_read_chunk_size(mut self, bytes: usize) -> Self {
        self.read_chunk_size = bytes;
        self
    }

    /// Set the channel bound
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
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

    /// Fail a read that takes longer than `timeout`
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    fn stream_config(&self) -> StreamConfig {
        let config = StreamConfig::new().with_high_water_mark(self.high_water_mark);
        match self.total_size {
            Some(total) => config.with_total_size(total),
            None => config,
        }
    }
}

/// One item of an async parse
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A decoded row
    Row(Row),
    /// A recorded error
    Error(ParseError),
    /// The document is closed; always the last event
    End(ParseMeta),
}

/// Sink collecting the events of one read until they are sent
#[derive(Debug, Default)]
struct EventBuffer(Vec<StreamEvent>);

impl RowSink for EventBuffer {
    fn accept(&mut self, row: Row) -> SinkFlow {
        self.0.push(StreamEvent::Row(row));
        SinkFlow::Continue
    }

    fn error(&mut self, error: &ParseError) {
        self.0.push(StreamEvent::Error(error.clone()));
    }
}

/// Parse `reader` to the end, sending events through `sender`
///
/// Returns the final metadata, which is also sent as [`StreamEvent::End`].
/// When the receiver goes away the parse is cancelled.
pub async fn stream_reader<R>(
    mut reader: R,
    options: ParseOptions,
    config: AsyncStreamConfig,
    sender: mpsc::Sender<StreamEvent>,
    cancel: CancelToken,
) -> Result<ParseMeta, Error>
where
    R: AsyncRead + Unpin,
{
    let mut parser = StreamingParser::with_config(options, EventBuffer::default(), config.stream_config())?
        .with_cancel_token(cancel.clone());
    let mut chunk = vec![0u8; config.read_chunk_size.max(1)];
    let mut failure: Option<ParseError> = None;

    while !cancel.is_cancelled() && !parser.is_stopped() {
        let read = match config.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, reader.read(&mut chunk)).await {
                Ok(read) => read,
                Err(_) => {
                    let error = ParseError::new(
                        ErrorCode::TimeoutError,
                        format!("no input within {:?}", limit),
                        parser.line(),
                        1,
                    );
                    parser.abort(error.clone());
                    failure = Some(error);
                    break;
                }
            },
            None => reader.read(&mut chunk).await,
        };
        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let error = ParseError::io(&err, parser.line());
                parser.abort(error.clone());
                failure = Some(error);
                break;
            }
        };

        let fed = parser.feed(&chunk[..n]);
        if !send_pending(&mut parser, &sender).await {
            log_debug!("event receiver dropped, cancelling");
            cancel.cancel();
            break;
        }
        if let Err(error) = fed {
            failure = Some(error);
            break;
        }
    }

    let ended = parser.end();
    let delivered = send_pending(&mut parser, &sender).await;
    if let Some(error) = &failure {
        if delivered && !parser.errors().contains(error) {
            let _ = sender.send(StreamEvent::Error(error.clone())).await;
        }
    }
    let meta = match ended {
        Ok(meta) => meta,
        Err(error) => {
            if delivered {
                let _ = sender.send(StreamEvent::Error(error.clone())).await;
            }
            return Err(error.into());
        }
    };
    if delivered {
        let _ = sender.send(StreamEvent::End(meta.clone())).await;
    }
    match failure {
        Some(error) => Err(error.into()),
        None => Ok(meta),
    }
}

/// Spawn [`stream_reader`] on the current runtime and expose its events as a
/// stream
///
/// The returned token cancels the background task. The stream ends after
/// [`StreamEvent::End`].
pub fn row_stream<R>(
    reader: R,
    options: ParseOptions,
    config: AsyncStreamConfig,
) -> Result<(BoxStream<'static, StreamEvent>, CancelToken), ConfigError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    options.validate()?;
    let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
    let cancel = CancelToken::new();
    let task_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = stream_reader(reader, options, config, sender, task_cancel).await;
    });

    let events = stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|event| (event, receiver))
    })
    .boxed();
    Ok((events, cancel))
}

/// Send everything the last feed produced; false once the receiver is gone
async fn send_pending(
    parser: &mut StreamingParser<EventBuffer>,
    sender: &mpsc::Sender<StreamEvent>,
) -> bool {
    let events = std::mem::take(&mut parser.sink_mut().0);
    for event in events {
        if sender.send(event).await.is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static [u8], config: AsyncStreamConfig) -> Vec<StreamEvent> {
        let (sender, mut receiver) = mpsc::channel(4);
        let task = tokio::spawn(stream_reader(
            input,
            ParseOptions::default(),
            config,
            sender,
            CancelToken::new(),
        ));
        let mut events = Vec::new();
        while let Some(event) = receiver.recv().await {
            events.push(event);
        }
        task.await.unwrap().unwrap();
        events
    }

    #[tokio::test]
    async fn test_events_in_order() {
        let config = AsyncStreamConfig::new().with_read_chunk_size(3);
        let events = collect(b"a,b\n1,2\n3\n4,5\n", config).await;
        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                StreamEvent::Row(_) => "row",
                StreamEvent::Error(_) => "error",
                StreamEvent::End(_) => "end",
            })
            .collect();
        assert_eq!(kinds, ["row", "error", "row", "end"]);
    }

    #[tokio::test]
    async fn test_end_carries_meta() {
        let events = collect(b"x\n1\n2\n", AsyncStreamConfig::default()).await;
        match events.last() {
            Some(StreamEvent::End(meta)) => {
                assert_eq!(meta.row_count, 2);
                assert_eq!(meta.bytes_processed, 6);
            }
            other => panic!("expected end event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_receiver_cancels() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let cancel = CancelToken::new();
        let meta = stream_reader(
            &b"a\n1\n2\n"[..],
            ParseOptions::default(),
            AsyncStreamConfig::default(),
            sender,
            cancel.clone(),
        )
        .await
        .unwrap();
        assert!(cancel.is_cancelled());
        assert!(meta.cancelled);
    }
}
