//! Binds a [`Router`] to handler resources and to the [`Service`] trait
//! the HTTP/1.1 engine drives.
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use super::error::RouteError;
use super::input::RouteInput;
use super::route::{PathSpec, Route};
use super::router::Router;
use crate::BoxError;
use crate::body::{Incoming, OutBody};
use crate::http::{Request, Response, StatusCode};
use crate::log::emit;
use crate::service::Service;
use crate::uri::normalize_path;

/// Future returned by handler resources.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response<OutBody>, BoxError>> + Send>>;

/// A user supplied handler closure bound to a route.
pub trait Handler: Send + Sync {
    fn call(&self, request: Request<Incoming>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request<Incoming>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<OutBody>, BoxError>> + Send + 'static,
{
    fn call(&self, request: Request<Incoming>) -> HandlerFuture {
        Box::pin((self)(request))
    }
}

/// Shared immutable reference to a handler.
pub type Resource = Arc<dyn Handler>;

/// Values captured by a path pattern, stored in request extensions.
#[derive(Debug, Clone, Default)]
pub struct PathParams(pub Vec<(String, String)>);

impl PathParams {
    /// Value of a named parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Maps handler errors to responses when the response head is not yet
/// written.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: BoxError) -> Response<OutBody>;
}

struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, error: BoxError) -> Response<OutBody> {
        emit!(error, "handler error: {error}");
        let mut response = Response::new(OutBody::full("internal server error"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    }
}

/// Router surface the server dispatches through.
///
/// Resolution errors become taxonomy responses (404, 405 with `Allow`,
/// 415, 406, 400); handler errors go through the error handler.
#[derive(Clone)]
pub struct WebRouter {
    router: Arc<Router<Resource>>,
    errors: Arc<dyn ErrorHandler>,
}

impl WebRouter {
    /// Create an empty router with the default error handler.
    pub fn new() -> WebRouter {
        Self {
            router: Arc::new(Router::new()),
            errors: Arc::new(DefaultErrorHandler),
        }
    }

    /// Replace the error handler.
    pub fn with_error_handler(mut self, errors: impl ErrorHandler + 'static) -> Self {
        self.errors = Arc::new(errors);
        self
    }

    /// Bind a route to a handler.
    ///
    /// A pattern route wraps the handler so captured parameters land in
    /// the request extensions as [`PathParams`].
    pub fn route(self, route: Route, handler: impl Handler + 'static) -> Self {
        let resource: Resource = match route.path_spec() {
            Some(PathSpec::Pattern {
                pattern,
                trailing_slash,
            }) => Arc::new(ParamHandler {
                pattern: pattern.clone(),
                trailing_slash: *trailing_slash,
                inner: handler,
            }),
            _ => Arc::new(handler),
        };
        self.router.set(&route, resource);
        self
    }

    /// Unbind a route.
    pub fn remove(&self, route: &Route) -> bool {
        self.router.remove(route).is_some()
    }

    /// Enable a route.
    pub fn enable(&self, route: &Route) -> bool {
        self.router.enable(route)
    }

    /// Disable a route without removing it.
    pub fn disable(&self, route: &Route) -> bool {
        self.router.disable(route)
    }

    /// Enumerate bound routes.
    pub fn routes(&self) -> Vec<(Route, Resource, bool)> {
        self.router.routes()
    }

    /// The underlying criterion router.
    pub fn router(&self) -> &Router<Resource> {
        &self.router
    }
}

impl Default for WebRouter {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WebRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebRouter").finish_non_exhaustive()
    }
}

impl Service<Request<Incoming>> for WebRouter {
    type Response = Response<OutBody>;

    type Error = Infallible;

    type Future = RouteFuture;

    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let input = match RouteInput::from_parts(request.parts()) {
            Ok(input) => input,
            Err(err) => return RouteFuture::ready(err.into_response()),
        };
        match self.router.resolve(&input) {
            Ok(resource) => RouteFuture::handler(resource.call(request), self.errors.clone()),
            Err(err) => RouteFuture::ready(err.into_response()),
        }
    }
}

/// Future returned by [`WebRouter`].
#[must_use = "futures do nothing unless polled"]
pub struct RouteFuture {
    state: RouteFutureState,
}

enum RouteFutureState {
    Ready(Option<Response<OutBody>>),
    Handler(HandlerFuture, Arc<dyn ErrorHandler>),
}

impl RouteFuture {
    fn ready(response: Response<OutBody>) -> RouteFuture {
        Self {
            state: RouteFutureState::Ready(Some(response)),
        }
    }

    fn handler(future: HandlerFuture, errors: Arc<dyn ErrorHandler>) -> RouteFuture {
        Self {
            state: RouteFutureState::Handler(future, errors),
        }
    }
}

impl Future for RouteFuture {
    type Output = Result<Response<OutBody>, Infallible>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            RouteFutureState::Ready(response) => {
                Poll::Ready(Ok(response.take().expect("RouteFuture polled after completion")))
            }
            RouteFutureState::Handler(future, errors) => {
                let response = match ready!(future.as_mut().poll(cx)) {
                    Ok(response) => response,
                    Err(err) => errors.handle(err),
                };
                Poll::Ready(Ok(response))
            }
        }
    }
}

impl std::fmt::Debug for RouteFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteFuture").finish_non_exhaustive()
    }
}

/// Wraps a pattern route's handler to extract path parameters.
struct ParamHandler<H> {
    pattern: super::route::PathPattern,
    trailing_slash: bool,
    inner: H,
}

impl<H: Handler> Handler for ParamHandler<H> {
    fn call(&self, mut request: Request<Incoming>) -> HandlerFuture {
        let path = normalize_path(request.uri().path());
        if let Some(params) = self.pattern.captures(&path, self.trailing_slash) {
            request.extensions_mut().insert(PathParams(params));
        }
        self.inner.call(request)
    }
}

// ===== RouteError → response glue =====

impl From<RouteError> for Response<OutBody> {
    #[inline]
    fn from(value: RouteError) -> Self {
        value.into_response()
    }
}
