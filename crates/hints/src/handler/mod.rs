//! Request handlers that answer with interim responses before the final one.
//!
//! A [`Handler`] receives the request and a [`Hints`] handle. It may push any number of
//! 1xx heads through the handle, at any point and across awaits, and returns the final
//! response. [`Exchange`] turns such a running call into the step stream that
//! [`ResponseSequencer::drive`](crate::connection::ResponseSequencer::drive) consumes.

use std::future::Future;

use async_trait::async_trait;
use http::Request;
use http_body::Body;

use crate::protocol::{BoxError, Response};

mod exchange;

pub use exchange::Exchange;
pub use exchange::Hints;

#[async_trait]
pub trait Handler<ReqBody>: Send + Sync {
    type RespBody: Body;
    type Error: Into<BoxError>;

    async fn call(&self, req: Request<ReqBody>, hints: Hints) -> Result<Response<Self::RespBody>, Self::Error>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<ReqBody, RespBody, Err, F, Fut> Handler<ReqBody> for HandlerFn<F>
where
    RespBody: Body,
    ReqBody: Send + 'static,
    F: Fn(Request<ReqBody>, Hints) -> Fut + Send + Sync,
    Err: Into<BoxError>,
    Fut: Future<Output = Result<Response<RespBody>, Err>> + Send,
{
    type RespBody = RespBody;
    type Error = Err;

    async fn call(&self, req: Request<ReqBody>, hints: Hints) -> Result<Response<Self::RespBody>, Self::Error> {
        (self.f)(req, hints).await
    }
}

/// Wraps an async function taking the request and the hints handle into a [`Handler`].
pub fn make_handler<F, ReqBody, RespBody, Err, Ret>(f: F) -> HandlerFn<F>
where
    RespBody: Body,
    Err: Into<BoxError>,
    Ret: Future<Output = Result<Response<RespBody>, Err>>,
    F: Fn(Request<ReqBody>, Hints) -> Ret,
{
    HandlerFn { f }
}
