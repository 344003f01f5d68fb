pub mod body;
pub mod handler;
pub mod middleware;
pub mod server;
pub mod types;
pub mod writer;

pub use handler::Handler;
pub use middleware::gzip::{Config, GzipBuilder, GzipMiddleware, GzipResponseWriter, accepts_gzip};
pub use server::serve;
pub use writer::{ResponseRecorder, ResponseWriter};

#[cfg(feature = "gzip-tracing")]
pub mod tracing;
