use crate::{types::Request, writer::ResponseWriter};

/// A request handler: reads the request and writes the response into `rw`.
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, rw: &mut dyn ResponseWriter, req: &Request);
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn serve(&self, rw: &mut dyn ResponseWriter, req: &Request) {
        (self)(rw, req)
    }
}
