//! HTTP Request.
use crate::{
    headers::HeaderMap,
    http::{Extensions, Method, Version},
    uri::Uri,
};

/// HTTP Request Parts.
#[derive(Debug, Default)]
pub struct Parts {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub extensions: Extensions,
}

/// HTTP Request.
///
/// The body is consumed at most once; the request owns it for the
/// lifetime of the exchange.
#[derive(Debug, Default)]
pub struct Request<B> {
    parts: Parts,
    body: B,
}

/// Constructor
impl<B> Request<B> {
    /// Create [`Request`] from [`Parts`] and a body.
    #[inline]
    pub fn from_parts(parts: Parts, body: B) -> Self {
        Self { parts, body }
    }
}

impl<B> Request<B> {
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
        /// Returns shared reference to [`Method`].
        method(),
        /// Returns mutable reference to [`Method`].
        method_mut() -> Method;

        /// Returns shared reference to [`Uri`].
        uri(),
        /// Returns mutable reference to [`Uri`].
        uri_mut() -> Uri;

        /// Returns shared reference to [`Version`].
        version(),
        /// Returns mutable reference to [`Version`].
        version_mut() -> Version;

        /// Returns shared reference to [`HeaderMap`].
        headers(),
        /// Returns mutable reference to [`HeaderMap`].
        headers_mut() -> HeaderMap;

        /// Returns shared reference to [`Extensions`].
        extensions(),
        /// Returns mutable reference to [`Extensions`].
        extensions_mut() -> Extensions;
    }

    /// Returns shared reference to the body.
    #[inline]
    pub fn body(&self) -> &B {
        &self.body
    }

    /// Returns mutable reference to the body.
    #[inline]
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }
}

/// Destructor
impl<B> Request<B> {
    /// Destruct request into [`Parts`] and the body.
    #[inline]
    pub fn into_parts(self) -> (Parts, B) {
        (self.parts, self.body)
    }

    /// Destruct request into the body.
    #[inline]
    pub fn into_body(self) -> B {
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
