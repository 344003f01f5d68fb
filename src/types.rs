use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;

use crate::body::TakoBody;

pub type BoxBody = UnsyncBoxBody<Bytes, BoxError>;
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request value handed to handlers. The body is fully read before dispatch.
pub type Request = http::Request<Bytes>;

pub type Response = http::Response<TakoBody>;
