/// HTTP Method.
///
/// This API follows the [RFC9110] method registry plus PATCH from
/// [RFC5789]. Arbitrary methods are not supported.
///
/// [RFC5789]: <https://www.rfc-editor.org/rfc/rfc5789>
/// [RFC9110]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-methods>
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Method(u8);

macro_rules! methods {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = ($idx:literal, $value:literal);
        )*
    ) => {
        impl Method {
            $(
                $(#[$doc])*
                pub const $name: Self = Self($idx);
            )*

            /// Create [`Method`] from bytes.
            #[inline]
            pub const fn from_bytes(src: &[u8]) -> Option<Method> {
                match src {
                    $(
                        $value => Some(Self::$name),
                    )*
                    _ => None,
                }
            }

            /// Returns string representation of the method.
            #[inline]
            pub const fn as_str(&self) -> &'static str {
                match self.0 {
                    $(
                        $idx => {
                            // SAFETY: method names are ASCII
                            unsafe { str::from_utf8_unchecked($value) }
                        }
                    )*
                    // SAFETY: value is privately constructed and immutable
                    _ => unsafe { std::hint::unreachable_unchecked() },
                }
            }
        }
    };
}

methods! {
    /// The `GET` method requests transfer of a current selected
    /// representation for the target resource.
    GET = (0, b"GET");
    /// The `HEAD` method is identical to GET except that the server MUST
    /// NOT send content in the response.
    HEAD = (1, b"HEAD");
    /// The `POST` method requests that the target resource process the
    /// representation enclosed in the request.
    POST = (2, b"POST");
    /// The `PUT` method requests that the state of the target resource be
    /// created or replaced with the enclosed representation.
    PUT = (3, b"PUT");
    /// The `DELETE` method requests removal of the association between the
    /// target resource and its functionality.
    DELETE = (4, b"DELETE");
    /// The `CONNECT` method requests a tunnel to the destination origin.
    CONNECT = (5, b"CONNECT");
    /// The `OPTIONS` method requests information about the communication
    /// options available for the target resource.
    OPTIONS = (6, b"OPTIONS");
    /// The `TRACE` method requests a remote application-level loop-back.
    TRACE = (7, b"TRACE");
    /// The `PATCH` method requests that a set of changes be applied to the
    /// target resource.
    PATCH = (8, b"PATCH");
}

impl Method {
    /// Returns `true` if the method semantics are read-only.
    #[inline]
    pub const fn is_safe(&self) -> bool {
        matches!(*self, Self::GET | Self::HEAD | Self::OPTIONS | Self::TRACE)
    }
}

impl std::str::FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes()).ok_or(UnknownMethod)
    }
}

impl std::fmt::Debug for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        str::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        str::fmt(self.as_str(), f)
    }
}

// ===== Error =====

/// Method outside the supported registry.
#[derive(Debug)]
pub struct UnknownMethod;

impl std::error::Error for UnknownMethod {}

impl std::fmt::Display for UnknownMethod {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("unknown method")
    }
}
