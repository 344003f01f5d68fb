//! The gzip middleware compresses response bodies for clients that accept gzip.
//!
//! When the request's `Accept-Encoding` header mentions `gzip`, the middleware sets
//! `Content-Encoding: gzip` and hands the downstream handler a [`GzipResponseWriter`]
//! in place of the real sink. Everything the handler writes is compressed on the way
//! through, and the gzip stream is terminated when the handler returns.
//!
//! # Example
//! ```rust
//! use std::io::Write;
//! use tako_gzip::middleware::gzip::GzipBuilder;
//! use tako_gzip::types::Request;
//! use tako_gzip::writer::ResponseWriter;
//!
//! let gzip = GzipBuilder::new()
//!     .name("assets")
//!     .mime_types(["text/html", "text/css"])
//!     .build(|rw: &mut dyn ResponseWriter, _req: &Request| {
//!         let _ = rw.write_all(b"<h1>hi</h1>");
//!     })
//!     .unwrap();
//! ```

use std::collections::HashSet;

use anyhow::Result;
use http::{HeaderValue, header::ACCEPT_ENCODING, header::CONTENT_ENCODING};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::{handler::Handler, types::Request, writer::ResponseWriter};

pub mod writer;

pub use writer::GzipResponseWriter;

const GZIP: &str = "gzip";

/// Configuration for the gzip middleware.
///
/// Deserializes from `{"mimeTypes": [...]}`; a missing field falls back to the
/// default list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Content types eligible for compression. Held by the middleware but not
    /// consulted by the compression decision.
    pub mime_types: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mime_types: vec![
                "text/html".to_string(),
                "text/css".to_string(),
                "application/javascript".to_string(),
            ],
        }
    }
}

/// Builder for configuring and creating a [`GzipMiddleware`].
pub struct GzipBuilder {
    config: Config,
    name: String,
}

impl GzipBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            name: GZIP.to_string(),
        }
    }

    /// Starts from an already loaded configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            name: GZIP.to_string(),
        }
    }

    /// Replaces the MIME type list.
    pub fn mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the instance name used in log output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builds the middleware around `next`.
    pub fn build<H: Handler>(self, next: H) -> Result<GzipMiddleware<H>> {
        GzipMiddleware::new(next, &self.config, self.name)
    }
}

impl Default for GzipBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler that gzip-encodes the responses of the handler it wraps.
pub struct GzipMiddleware<H> {
    next: H,
    mime_types: HashSet<String>,
    name: String,
}

impl<H: Handler> GzipMiddleware<H> {
    /// Creates the middleware around `next`.
    ///
    /// Construction does not fail today; callers should still handle the error so
    /// that validating the configuration later is not a breaking change.
    pub fn new(next: H, config: &Config, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mime_types: HashSet<String> = config.mime_types.iter().cloned().collect();

        debug!(instance = %name, mime_types = ?config.mime_types, "gzip middleware created");

        Ok(Self {
            next,
            mime_types,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured MIME types.
    pub fn mime_types(&self) -> &HashSet<String> {
        &self.mime_types
    }
}

impl<H: Handler> Handler for GzipMiddleware<H> {
    fn serve(&self, rw: &mut dyn ResponseWriter, req: &Request) {
        let accept = accept_encoding(req);
        if !accepts_gzip(accept) {
            trace!(
                instance = %self.name,
                accept_encoding = %String::from_utf8_lossy(accept),
                "gzip skipped"
            );
            self.next.serve(rw, req);
            return;
        }

        trace!(
            instance = %self.name,
            accept_encoding = %String::from_utf8_lossy(accept),
            "gzip selected"
        );
        rw.headers_mut()
            .insert(CONTENT_ENCODING, HeaderValue::from_static(GZIP));

        // Dropping the writer also finishes the stream, so an unwinding handler
        // still leaves a terminated gzip member behind.
        let mut gz = GzipResponseWriter::new(rw);
        self.next.serve(&mut gz, req);
        // The handler contract has no error channel; a failed trailer write shows up
        // to the client as a truncated stream.
        let _ = gz.finish();
    }
}

/// Reports whether an `Accept-Encoding` value selects gzip.
///
/// This is a plain case-sensitive substring test over the raw header bytes: token
/// boundaries and quality values are not parsed, so `gzip;q=0` also selects gzip, and
/// non-ASCII bytes elsewhere in the value do not prevent a match.
pub fn accepts_gzip(accept_encoding: impl AsRef<[u8]>) -> bool {
    accept_encoding
        .as_ref()
        .windows(GZIP.len())
        .any(|w| w == GZIP.as_bytes())
}

/// The raw bytes of the request's first `Accept-Encoding` value, empty when absent.
fn accept_encoding(req: &Request) -> &[u8] {
    req.headers()
        .get(ACCEPT_ENCODING)
        .map(HeaderValue::as_bytes)
        .unwrap_or_default()
}
