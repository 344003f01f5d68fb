//! HTTP server that hosts a single [`Handler`].
//!
//! Built on hyper's HTTP/1.1 connection driver: every accepted connection is served on
//! its own tokio task. Handlers are synchronous writers, so each request body is read in
//! full (up to [`MAX_REQUEST_BODY`]), the handler runs on the blocking pool against a
//! [`StreamingResponseWriter`], and its output is streamed back to hyper as it is
//! produced.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::io::Write;
//! use tako_gzip::{serve, types::Request, writer::ResponseWriter};
//! use tokio::net::TcpListener;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//! serve(listener, |rw: &mut dyn ResponseWriter, _req: &Request| {
//!     let _ = rw.write_all(b"Hello, World!");
//! })
//! .await;
//! # Ok(())
//! # }
//! ```

use std::{convert::Infallible, sync::Arc};

use bytes::Bytes;
use http::StatusCode;
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::{body::Incoming, server::conn::http1, service::service_fn};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::{
    body::TakoBody,
    handler::Handler,
    types::{BoxError, Request, Response},
    writer::StreamingResponseWriter,
};

/// Number of body chunks queued between a handler and its connection before the
/// handler's writes block.
const BODY_CHANNEL_CAPACITY: usize = 16;

/// Largest request body read before dispatch; larger bodies get `413`.
pub const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Starts the server with the given listener and handler.
///
/// Runs until accepting a connection fails, which is logged.
pub async fn serve<H: Handler>(listener: TcpListener, handler: H) {
    if let Err(err) = run(listener, handler).await {
        error!("server stopped: {err}");
    }
}

/// Runs the accept loop, serving each connection on its own task.
///
/// # Errors
///
/// Returns an error if reading the local address or accepting a connection fails.
pub async fn run<H: Handler>(listener: TcpListener, handler: H) -> Result<(), BoxError> {
    #[cfg(feature = "gzip-tracing")]
    crate::tracing::init_tracing();

    let handler = Arc::new(handler);

    info!("listening on {}", listener.local_addr()?);

    loop {
        let (stream, addr) = listener.accept().await?;
        let io = hyper_util::rt::TokioIo::new(stream);
        let handler = handler.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req: hyper::Request<Incoming>| {
                let handler = handler.clone();
                async move { Ok::<_, Infallible>(dispatch(handler, req).await) }
            });

            let mut http = http1::Builder::new();
            http.keep_alive(true);

            if let Err(err) = http.serve_connection(io, svc).await {
                error!(%addr, "error serving connection: {err}");
            }
        });
    }
}

/// Runs `handler` for one request and turns what it wrote into a hyper response.
pub async fn dispatch<H: Handler>(handler: Arc<H>, req: hyper::Request<Incoming>) -> Response {
    let (parts, body) = req.into_parts();
    let body = match read_body(body, MAX_REQUEST_BODY).await {
        Ok(body) => body,
        Err(status) => return status_response(status),
    };
    let req = Request::from_parts(parts, body);

    let (mut writer, pending) = StreamingResponseWriter::channel(BODY_CHANNEL_CAPACITY);
    tokio::task::spawn_blocking(move || {
        handler.serve(&mut writer, &req);
        writer.finish();
    });

    match pending.into_response().await {
        Some(res) => res,
        None => {
            error!("handler exited without producing a response");
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Reads at most `limit` bytes of `body`, mapping failures to the status to answer with.
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, StatusCode>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.is::<LengthLimitError>() => {
            debug!(limit, "request body too large");
            Err(StatusCode::PAYLOAD_TOO_LARGE)
        }
        Err(err) => {
            error!("failed to read request body: {err}");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

fn status_response(status: StatusCode) -> Response {
    let mut res = Response::new(TakoBody::empty());
    *res.status_mut() = status;
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{Full, StreamBody};

    #[tokio::test]
    async fn body_within_limit_is_read() {
        let body = Full::new(Bytes::from_static(b"0123456789"));
        let bytes = read_body(body, 10).await.unwrap();
        assert_eq!(&bytes[..], b"0123456789");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let body = Full::new(Bytes::from(vec![b'x'; 11]));
        assert_eq!(
            read_body(body, 10).await.unwrap_err(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn failing_body_is_a_bad_request() {
        let frames = futures_util::stream::iter(vec![
            Ok(http_body::Frame::data(Bytes::from_static(b"abc"))),
            Err(std::io::Error::other("connection dropped")),
        ]);
        assert_eq!(
            read_body(StreamBody::new(frames), MAX_REQUEST_BODY)
                .await
                .unwrap_err(),
            StatusCode::BAD_REQUEST
        );
    }
}
