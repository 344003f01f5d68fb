use std::io::Write;

use anyhow::Result;
use http::{HeaderValue, header::CONTENT_TYPE};
use tako_gzip::{
    middleware::gzip::{Config, GzipMiddleware},
    types::Request,
    writer::ResponseWriter,
};
use tokio::net::TcpListener;

fn index(rw: &mut dyn ResponseWriter, req: &Request) {
    rw.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));

    let page = format!(
        "<html><body><h1>Hello from {}</h1>{}</body></html>",
        req.uri().path(),
        "<p>This page is long enough to be worth compressing.</p>".repeat(32),
    );
    let _ = rw.write_all(page.as_bytes());
}

#[tokio::main]
async fn main() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:8080").await?;

    let gzip = GzipMiddleware::new(index, &Config::default(), "demo")?;

    tako_gzip::serve(listener, gzip).await;

    Ok(())
}
