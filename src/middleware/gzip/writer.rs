//! Response sink that gzip-encodes body writes on their way to the wrapped sink.

use std::io::{self, Write};

use flate2::{Compression, write::GzEncoder};
use http::{
    HeaderMap, HeaderValue, StatusCode,
    header::{CONTENT_ENCODING, CONTENT_LENGTH},
};

use crate::writer::ResponseWriter;

/// Decorator over a [`ResponseWriter`] that compresses the body.
///
/// The encoder's inner writer is the wrapped sink itself, so compressed frames land on
/// the same sink the headers go to. Header and status calls are delegated; when the head
/// is committed the writer makes sure `Content-Encoding: gzip` is present and drops any
/// `Content-Length`, which would describe the uncompressed body.
///
/// The gzip stream is terminated by [`finish`](Self::finish) or, failing that, on drop.
/// Body writes after that fail with an error.
pub struct GzipResponseWriter<'a> {
    encoder: GzEncoder<&'a mut dyn ResponseWriter>,
    committed: bool,
    finished: bool,
}

impl<'a> GzipResponseWriter<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            encoder: GzEncoder::new(inner, Compression::default()),
            committed: false,
            finished: false,
        }
    }

    /// Writes the gzip trailer and any buffered output to the wrapped sink.
    ///
    /// Only the first call does anything; later calls return `Ok(())` and leave the
    /// already written stream alone.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.commit_head();
        self.encoder.try_finish()
    }

    /// The wrapped sink.
    pub fn get_ref(&self) -> &dyn ResponseWriter {
        &**self.encoder.get_ref()
    }

    fn commit_head(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;

        let headers = self.encoder.get_mut().headers_mut();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        headers.remove(CONTENT_LENGTH);
    }
}

impl Write for GzipResponseWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(already_finished());
        }
        self.commit_head();
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.finished {
            return Err(already_finished());
        }
        self.commit_head();
        self.encoder.flush()
    }
}

impl ResponseWriter for GzipResponseWriter<'_> {
    fn headers(&self) -> &HeaderMap {
        self.encoder.get_ref().headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.encoder.get_mut().headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.commit_head();
        self.encoder.get_mut().write_header(status);
    }

    fn status(&self) -> StatusCode {
        self.encoder.get_ref().status()
    }
}

impl Drop for GzipResponseWriter<'_> {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

fn already_finished() -> io::Error {
    io::Error::other("gzip stream already finished")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ResponseRecorder;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    /// Sink that accepts a fixed number of bytes and then fails.
    struct FailingSink {
        headers: HeaderMap,
        budget: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer gone"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ResponseWriter for FailingSink {
        fn headers(&self) -> &HeaderMap {
            &self.headers
        }

        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_header(&mut self, _status: StatusCode) {}

        fn status(&self) -> StatusCode {
            StatusCode::OK
        }
    }

    #[test]
    fn body_round_trips_through_encoder() {
        let mut rec = ResponseRecorder::new();
        {
            let mut gz = GzipResponseWriter::new(&mut rec);
            gz.write_all(b"hello ").unwrap();
            gz.write_all(b"world").unwrap();
            gz.finish().unwrap();
        }

        assert_ne!(rec.body(), b"hello world");
        assert_eq!(gunzip(rec.body()), b"hello world");
    }

    #[test]
    fn second_finish_leaves_output_intact() {
        let mut rec = ResponseRecorder::new();
        {
            let mut gz = GzipResponseWriter::new(&mut rec);
            gz.write_all(b"payload").unwrap();
            gz.finish().unwrap();
            gz.finish().unwrap();
        }

        assert_eq!(gunzip(rec.body()), b"payload");
    }

    #[test]
    fn drop_terminates_stream() {
        let mut rec = ResponseRecorder::new();
        {
            let mut gz = GzipResponseWriter::new(&mut rec);
            gz.write_all(b"dropped without finish").unwrap();
        }

        assert_eq!(gunzip(rec.body()), b"dropped without finish");
    }

    #[test]
    fn empty_body_is_valid_gzip() {
        let mut rec = ResponseRecorder::new();
        GzipResponseWriter::new(&mut rec).finish().unwrap();

        assert!(!rec.body().is_empty());
        assert!(gunzip(rec.body()).is_empty());
        assert_eq!(rec.sent_headers()[CONTENT_ENCODING], "gzip");
    }

    #[test]
    fn headers_and_status_are_delegated() {
        let mut rec = ResponseRecorder::new();
        {
            let mut gz = GzipResponseWriter::new(&mut rec);
            gz.headers_mut()
                .insert("x-request-id", HeaderValue::from_static("abc"));
            assert_eq!(gz.headers()["x-request-id"], "abc");
            gz.write_header(StatusCode::IM_A_TEAPOT);
            assert_eq!(gz.status(), StatusCode::IM_A_TEAPOT);
            assert!(gz.get_ref().headers().contains_key("x-request-id"));
        }

        assert_eq!(rec.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(rec.sent_headers()["x-request-id"], "abc");
    }

    #[test]
    fn encoding_header_is_forced_at_commit() {
        let mut rec = ResponseRecorder::new();
        {
            let mut gz = GzipResponseWriter::new(&mut rec);
            gz.headers_mut()
                .insert(CONTENT_ENCODING, HeaderValue::from_static("identity"));
            gz.headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from_static("11"));
            gz.write_all(b"hello world").unwrap();
        }

        assert_eq!(rec.sent_headers()[CONTENT_ENCODING], "gzip");
        assert!(!rec.sent_headers().contains_key(CONTENT_LENGTH));
    }

    #[test]
    fn writes_after_finish_are_rejected() {
        let mut rec = ResponseRecorder::new();
        {
            let mut gz = GzipResponseWriter::new(&mut rec);
            gz.write_all(b"a").unwrap();
            gz.finish().unwrap();

            let err = gz.write(b"b").unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::Other);
            assert!(gz.flush().is_err());
        }

        assert_eq!(gunzip(rec.body()), b"a");
    }

    #[test]
    fn sink_errors_surface_from_write() {
        let mut sink = FailingSink {
            headers: HeaderMap::new(),
            budget: 0,
        };
        let mut gz = GzipResponseWriter::new(&mut sink);

        // The gzip header goes out with the first write, so that write fails.
        let err = gz.write_all(b"some bytes").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(gz.finish().is_err());
    }
}
