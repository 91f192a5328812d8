//! Stdio channel between the controlling process and the viewer.
//!
//! DESIGN
//! ======
//! Two tasks bridge the byte streams to the run loop's queues:
//! - the reader decodes frames from stdin and pushes them, or the error that
//!   ended the stream, onto an unbounded queue;
//! - the writer drains responses from an unbounded queue onto stdout.
//!
//! The reader always finishes by pushing an error (end of input included),
//! so the run loop reports the disconnect once and shuts down.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use frames::{CodecError, ErrorCode, Frame, MAX_DELIMITER_LEN, Response};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::Wire;

/// Largest protobuf frame accepted from the controller.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("command channel closed")]
    Closed,
    #[error("channel i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    Oversized(usize),
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Closed => "E_CHANNEL_CLOSED",
            Self::Io(_) => "E_CHANNEL_IO",
            Self::Codec(e) => e.error_code(),
            Self::Oversized(_) => "E_FRAME_TOO_LARGE",
        }
    }
}

/// One item of the inbound queue.
pub type Inbound = Result<Frame, TransportError>;

// =============================================================================
// READER
// =============================================================================

pub fn spawn_reader<R>(input: R, wire: Wire, tx: UnboundedSender<Inbound>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move { read_frames(input, wire, &tx).await })
}

/// Decode frames from `input` until it ends or fails, then push the final
/// error. Stops early when the queue's receiver is gone.
pub async fn read_frames<R: AsyncRead + Unpin>(input: R, wire: Wire, tx: &UnboundedSender<Inbound>) {
    let mut input = BufReader::new(input);
    loop {
        let next = match wire {
            Wire::Json => next_json(&mut input).await,
            Wire::Proto => next_proto(&mut input).await,
        };
        let done = next.is_err();
        if tx.send(next).is_err() {
            debug!("inbound queue closed, reader stopping");
            return;
        }
        if done {
            return;
        }
    }
}

async fn next_json<R: AsyncRead + Unpin>(input: &mut BufReader<R>) -> Inbound {
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line).await? == 0 {
            return Err(TransportError::Closed);
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            trace!(len = trimmed.len(), "json frame received");
            return Ok(frames::decode_json_line(trimmed)?);
        }
    }
}

async fn next_proto<R: AsyncRead + Unpin>(input: &mut BufReader<R>) -> Inbound {
    let mut prefix = Vec::with_capacity(MAX_DELIMITER_LEN);
    loop {
        let byte = match input.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && prefix.is_empty() => {
                return Err(TransportError::Closed);
            }
            Err(e) => return Err(e.into()),
        };
        prefix.push(byte);
        if byte & 0x80 == 0 || prefix.len() == MAX_DELIMITER_LEN {
            break;
        }
    }
    let len = frames::read_delimiter(&prefix)?;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::Oversized(len));
    }
    let mut body = vec![0; len];
    input.read_exact(&mut body).await?;
    trace!(len, "proto frame received");
    Ok(frames::decode_frame(&body)?)
}

// =============================================================================
// WRITER
// =============================================================================

pub fn spawn_writer<W>(mut output: W, wire: Wire, rx: UnboundedReceiver<Response>) -> JoinHandle<Result<(), TransportError>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move { write_responses(&mut output, wire, rx).await })
}

/// Encode responses onto `output` until every sender is dropped.
///
/// # Errors
///
/// Returns the first write or encode failure.
pub async fn write_responses<W: AsyncWrite + Unpin>(
    output: &mut W,
    wire: Wire,
    mut rx: UnboundedReceiver<Response>,
) -> Result<(), TransportError> {
    while let Some(response) = rx.recv().await {
        let bytes = match wire {
            Wire::Json => {
                let mut line = frames::encode_json_response(&response)?;
                line.push('\n');
                line.into_bytes()
            }
            Wire::Proto => frames::delimit(&frames::encode_response(&response))?,
        };
        output.write_all(&bytes).await?;
        output.flush().await?;
        trace!(?response, "response sent");
    }
    Ok(())
}
