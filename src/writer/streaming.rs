//! Channel-backed response sink used by the host adapter.
//!
//! The handler side runs on a blocking thread and writes into a
//! `StreamingResponseWriter`. The head travels through a `oneshot` channel as soon as it
//! is committed; body chunks follow through a bounded `mpsc` channel and become the
//! frames of the hyper response body. A full channel blocks the writer, which is how
//! a slow client pushes back on the handler.

use std::io::{self, Write};

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::{body::TakoBody, types::Response, writer::ResponseWriter};

/// Sink whose output is consumed asynchronously through a [`PendingResponse`].
///
/// Writes use `blocking_send`, so this type must only be driven from outside the async
/// runtime (e.g. inside `tokio::task::spawn_blocking`).
pub struct StreamingResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    head_tx: Option<oneshot::Sender<http::Response<()>>>,
    body_tx: mpsc::Sender<Bytes>,
}

/// The async half of a [`StreamingResponseWriter`].
pub struct PendingResponse {
    head_rx: oneshot::Receiver<http::Response<()>>,
    body_rx: mpsc::Receiver<Bytes>,
}

impl StreamingResponseWriter {
    /// Creates a connected writer/response pair. `buffer` is the number of body chunks
    /// that may be queued before writes block.
    pub fn channel(buffer: usize) -> (Self, PendingResponse) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(buffer.max(1));

        let writer = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            head_tx: Some(head_tx),
            body_tx,
        };
        (writer, PendingResponse { head_rx, body_rx })
    }

    /// Commits the head if nothing was written and closes the body.
    pub fn finish(mut self) {
        let _ = self.commit();
    }

    fn commit(&mut self) -> io::Result<()> {
        let Some(tx) = self.head_tx.take() else {
            return Ok(());
        };

        let mut head = http::Response::new(());
        *head.status_mut() = self.status;
        *head.headers_mut() = self.headers.clone();
        tx.send(head).map_err(|_| closed())
    }
}

impl Write for StreamingResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.commit()?;
        if buf.is_empty() {
            return Ok(0);
        }

        self.body_tx
            .blocking_send(Bytes::copy_from_slice(buf))
            .map_err(|_| closed())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()
    }
}

impl ResponseWriter for StreamingResponseWriter {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.head_tx.is_some() {
            self.status = status;
            let _ = self.commit();
        }
    }

    fn status(&self) -> StatusCode {
        self.status
    }
}

impl PendingResponse {
    /// Waits for the head and attaches the streaming body to it.
    ///
    /// Returns `None` if the writer was dropped before committing, which happens when
    /// the handler panics before writing anything.
    pub async fn into_response(self) -> Option<Response> {
        let head = self.head_rx.await.ok()?;
        let body = TakoBody::from_stream(ReceiverStream::new(self.body_rx));
        Some(head.map(|()| body))
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "response receiver closed")
}
