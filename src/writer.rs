//! Response sinks handlers write into.
//!
//! A `ResponseWriter` is the write side of a single response: headers and status are
//! staged on it and body bytes go through its `std::io::Write` implementation. The head
//! is committed by the first `write_header` call or the first body write, whichever
//! comes first. After that, header edits and further `write_header` calls have no effect
//! on what the client sees.
//!
//! # Examples
//!
//! ```rust
//! use std::io::Write;
//! use http::StatusCode;
//! use tako_gzip::writer::{ResponseRecorder, ResponseWriter};
//!
//! let mut rec = ResponseRecorder::new();
//! rec.headers_mut().insert("content-type", "text/plain".parse().unwrap());
//! rec.write_header(StatusCode::CREATED);
//! rec.write_all(b"done").unwrap();
//!
//! assert_eq!(rec.status(), StatusCode::CREATED);
//! assert_eq!(rec.body(), b"done");
//! ```

use std::io::{self, Write};

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

pub mod streaming;

pub use streaming::StreamingResponseWriter;

/// The write side of one HTTP response.
pub trait ResponseWriter: Write + Send {
    /// Headers staged for the response.
    fn headers(&self) -> &HeaderMap;

    /// Mutable access to the staged headers. Edits after the head is committed are
    /// not sent.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits the head with `status`. Only the first call has an effect.
    fn write_header(&mut self, status: StatusCode);

    /// Status the response was committed with, or will be committed with.
    fn status(&self) -> StatusCode;
}

/// In-memory sink that records everything written to it.
#[derive(Debug, Clone)]
pub struct ResponseRecorder {
    status: StatusCode,
    headers: HeaderMap,
    /// Header snapshot taken when the head was committed.
    committed: Option<HeaderMap>,
    body: Vec<u8>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            committed: None,
            body: Vec::new(),
        }
    }

    /// Whether the head has been committed.
    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    /// Headers as the client would see them: the snapshot taken at commit time, or
    /// the staged headers if nothing was committed yet.
    pub fn sent_headers(&self) -> &HeaderMap {
        self.committed.as_ref().unwrap_or(&self.headers)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consumes the recorder into an `http::Response` carrying the committed head.
    pub fn into_response(self) -> http::Response<Bytes> {
        let headers = self.committed.unwrap_or(self.headers);
        let mut res = http::Response::new(Bytes::from(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = headers;
        res
    }

    fn commit(&mut self) {
        if self.committed.is_none() {
            self.committed = Some(self.headers.clone());
        }
    }
}

impl Default for ResponseRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for ResponseRecorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.commit();
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseWriter for ResponseRecorder {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.committed.is_none() {
            self.status = status;
            self.commit();
        }
    }

    fn status(&self) -> StatusCode {
        self.status
    }
}
