//! Service trait.
use std::convert::Infallible;

use crate::BoxError;
use crate::body::{Incoming, OutBody};
use crate::common::{Map, map};
use crate::http::{Request, Response};

// ===== Service =====

pub trait Service<Request> {
    type Response;

    type Error;

    type Future: Future<Output = Result<Self::Response, Self::Error>>;

    fn call(&self, request: Request) -> Self::Future;
}

/// A [`Service`] the HTTP/1.1 engine can drive.
pub trait HttpService:
    Service<Request<Incoming>, Response = Response<OutBody>, Error: Into<BoxError>>
{
}

impl<S> HttpService for S where
    S: Service<Request<Incoming>, Response = Response<OutBody>, Error: Into<BoxError>>
{
}

// ===== FromFn =====

/// Create a [`Service`] from an async function.
#[inline]
pub fn from_fn<F>(f: F) -> FromFn<F> {
    FromFn { f }
}

/// [`Service`] returned by [`from_fn`].
#[derive(Debug, Clone, Default)]
pub struct FromFn<F> {
    f: F,
}

impl<F, Fut, Req, Res> Service<Req> for FromFn<F>
where
    F: Fn(Req) -> Fut,
    Fut: Future<Output = Res>,
{
    type Response = Res;

    type Error = Infallible;

    type Future = Map<Fut, fn(Res) -> Result<Res, Infallible>>;

    #[inline]
    fn call(&self, request: Req) -> Self::Future {
        map((self.f)(request), Ok)
    }
}
