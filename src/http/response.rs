//! HTTP Response.
use crate::{
    headers::HeaderMap,
    http::{Extensions, StatusCode, Version},
};

/// How an exchange ended, handed to its [`Finalizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCause {
    /// The tail byte of the response was flushed.
    Flushed,
    /// The exchange failed after the head was written.
    Failed,
    /// The connection was cancelled before the exchange completed.
    Cancelled,
}

/// Completion hook invoked exactly once after the exchange's terminal
/// event.
pub type Finalizer = Box<dyn FnOnce(EndCause) + Send>;

/// Marker aborting an exchange.
///
/// Carried in response extensions: with the head not yet written the
/// engine synthesises `204 No Content`; once bytes are on the wire the
/// only way out is failing the body, which closes the connection.
#[derive(Debug)]
pub struct Reset;

/// Build a response that resets the exchange.
pub fn reset() -> Response<crate::body::OutBody> {
    let mut response = Response::new(crate::body::OutBody::empty());
    response.extensions_mut().insert(Reset);
    response
}

/// HTTP Response Parts.
#[derive(Default)]
pub struct Parts {
    pub version: Version,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Fields emitted after the last chunk. Only legal under chunked
    /// encoding, and only sent when the peer negotiated `TE: trailers`.
    pub trailers: HeaderMap,
    pub extensions: Extensions,
    pub(crate) finalizers: Vec<Finalizer>,
}

impl std::fmt::Debug for Parts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parts")
            .field("version", &self.version)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("trailers", &self.trailers)
            .finish_non_exhaustive()
    }
}

/// HTTP Response.
///
/// Headers are freely mutable until the engine emits the head; the engine
/// owns the response from that point and rejects further mutation by
/// construction (the response has been consumed).
#[derive(Debug, Default)]
pub struct Response<T> {
    parts: Parts,
    body: T,
}

/// Constructor
impl<T> Response<T> {
    /// Create [`Response`] with the given body and default parts.
    #[inline]
    pub fn new(body: T) -> Self {
        Self {
            parts: Parts::default(),
            body,
        }
    }

    /// Create [`Response`] from [`Parts`] and a body.
    #[inline]
    pub fn from_parts(parts: Parts, body: T) -> Self {
        Self { parts, body }
    }
}

impl<T> Response<T> {
    /// Returns shared reference to [`Parts`].
    #[inline]
    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    /// Returns mutable reference to [`Parts`].
    #[inline]
    pub fn parts_mut(&mut self) -> &mut Parts {
        &mut self.parts
    }

    delegate! {
        /// Returns shared reference to [`Version`].
        version(),
        /// Returns mutable reference to [`Version`].
        version_mut() -> Version;

        /// Returns shared reference to [`StatusCode`].
        status(),
        /// Returns mutable reference to [`StatusCode`].
        status_mut() -> StatusCode;

        /// Returns shared reference to [`HeaderMap`].
        headers(),
        /// Returns mutable reference to [`HeaderMap`].
        headers_mut() -> HeaderMap;

        /// Returns shared reference to the trailer fields.
        trailers(),
        /// Returns mutable reference to the trailer fields.
        trailers_mut() -> HeaderMap;

        /// Returns shared reference to [`Extensions`].
        extensions(),
        /// Returns mutable reference to [`Extensions`].
        extensions_mut() -> Extensions;
    }

    /// Register a hook running exactly once after the exchange's terminal
    /// event, successful or not.
    #[inline]
    pub fn on_end(&mut self, finalizer: impl FnOnce(EndCause) + Send + 'static) {
        self.parts.finalizers.push(Box::new(finalizer));
    }

    /// Returns shared reference to the body.
    #[inline]
    pub fn body(&self) -> &T {
        &self.body
    }

    /// Returns mutable reference to the body.
    #[inline]
    pub fn body_mut(&mut self) -> &mut T {
        &mut self.body
    }

    /// Map the body.
    #[inline]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            parts: self.parts,
            body: f(self.body),
        }
    }
}

/// Destructor
impl<T> Response<T> {
    /// Destruct response into [`Parts`] and the body.
    #[inline]
    pub fn into_parts(self) -> (Parts, T) {
        (self.parts, self.body)
    }

    /// Destruct response into the body.
    #[inline]
    pub fn into_body(self) -> T {
        self.body
    }
}

// ===== Macros =====

macro_rules! delegate {
    (@CORE
        $(#[$rdoc:meta])*
        $mref:ident(),
        $(#[$mdoc:meta])*
        $mmut:ident() -> $ty:ty
    ) => {
        $(#[$rdoc])*
        #[inline]
        pub fn $mref(&self) -> &$ty {
            &self.parts.$mref
        }

        $(#[$mdoc])*
        #[inline]
        pub fn $mmut(&mut self) -> &mut $ty {
            &mut self.parts.$mref
        }
    };
    (
        $(
            $(#[$rdoc:meta])*
            $mref:ident(),
            $(#[$mdoc:meta])*
            $mmut:ident() -> $ty:ty;
        )*
    ) => {
        $(
            delegate! {
                @CORE
                $(#[$rdoc])*
                $mref(),
                $(#[$mdoc])*
                $mmut() -> $ty
            }
        )*
    };
}

use {delegate};
