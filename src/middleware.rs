//! Middleware that wraps a [`Handler`](crate::handler::Handler) and changes how its
//! response is written.
//!
//! A middleware is itself a `Handler`: it is constructed once around the next handler in
//! the chain and then serves every request routed to it, deciding per request whether
//! to hand the downstream handler the real response sink or a decorated one.

/// Transparent gzip compression of response bodies.
pub mod gzip;
