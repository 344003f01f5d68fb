/// This module provides the `TakoBody` struct, the boxed HTTP body the host adapter
/// hands to hyper. It can wrap a fixed buffer or a stream of body chunks produced
/// while a handler is still writing.
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;

use futures_util::{Stream, StreamExt};
use http_body::{Body, Frame, SizeHint};
use http_body_util::{BodyExt, Empty, StreamBody};

use crate::types::{BoxBody, BoxError};

/// The `TakoBody` struct is a wrapper around a boxed HTTP body (`BoxBody`).
///
/// # Example
///
/// ```rust
/// use tako_gzip::body::TakoBody;
///
/// let empty_body = TakoBody::empty();
/// ```
pub struct TakoBody(BoxBody);

impl TakoBody {
    /// Creates a new `TakoBody` from a given body.
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self(body.map_err(|e| e.into()).boxed_unsync())
    }

    /// Creates a body that yields each chunk of `stream` as a data frame.
    ///
    /// The body ends when the stream does.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Bytes> + Send + 'static,
    {
        let frames = stream.map(|chunk| Ok::<_, BoxError>(Frame::data(chunk)));
        Self::new(StreamBody::new(frames))
    }

    /// Creates an empty `TakoBody`.
    pub fn empty() -> Self {
        Self::new(Empty::new())
    }
}

impl Default for TakoBody {
    fn default() -> Self {
        Self::empty()
    }
}

/// Delegates all body operations to the inner `BoxBody`.
impl Body for TakoBody {
    type Data = Bytes;
    type Error = BoxError;

    #[inline]
    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.0).poll_frame(cx)
    }

    #[inline]
    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }

    #[inline]
    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }
}
