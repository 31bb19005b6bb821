//! One-shot messages across the dispatcher/worker process boundary
//!
//! Each direction carries exactly one JSON line: the request on the
//! worker's stdin, the handshake on the worker's stdout. Senders are
//! consumed by `send` so a second message cannot be written.

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::AgentError;
use crate::models::deployment::{DeploymentRequest, HandshakeMessage};

/// Write side of a one-shot channel
pub struct OneShotSender<W, T> {
    writer: W,
    _message: std::marker::PhantomData<fn(T)>,
}

impl<W, T> OneShotSender<W, T>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            _message: std::marker::PhantomData,
        }
    }

    /// Write the message and close the write side
    pub async fn send(mut self, message: &T) -> Result<(), AgentError> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Read side of a one-shot channel
pub struct OneShotReceiver<R, T> {
    reader: R,
    _message: std::marker::PhantomData<fn() -> T>,
}

impl<R, T> OneShotReceiver<R, T>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            _message: std::marker::PhantomData,
        }
    }

    /// Wait for the single message.
    ///
    /// Fails if the peer closes the channel first or sends something that
    /// does not parse.
    pub async fn recv(mut self) -> Result<T, AgentError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(AgentError::HandshakeError(
                "channel closed before a message arrived".to_string(),
            ));
        }
        let message = serde_json::from_str(line.trim_end())?;
        Ok(message)
    }
}

/// Worker to dispatcher
pub type HandshakeSender<W> = OneShotSender<W, HandshakeMessage>;
pub type HandshakeReceiver<R> = OneShotReceiver<R, HandshakeMessage>;

/// Dispatcher to worker
pub type RequestSender<W> = OneShotSender<W, DeploymentRequest>;
pub type RequestReceiver<R> = OneShotReceiver<R, DeploymentRequest>;
