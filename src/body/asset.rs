use super::OutBody;
use crate::headers::HeaderValue;
use crate::headers::standard::{CONTENT_LENGTH, CONTENT_TYPE};
use crate::http::{Response, StatusCode};

/// An opaque readable blob a response can be filled from.
///
/// Media-type guessing and resource storage live outside the serving
/// core; this is the minimal contract the response convenience needs.
pub trait Asset: Send {
    /// Whether the blob is present at all.
    fn exists(&self) -> bool;

    /// Size in bytes, when known upfront.
    fn size(&self) -> Option<u64>;

    /// Media type of the content, when known.
    fn media_type(&self) -> Option<&str>;

    /// Consume into the streamed body.
    fn into_body(self: Box<Self>) -> OutBody;
}

impl Asset for super::FileRegion {
    fn exists(&self) -> bool {
        true
    }

    fn size(&self) -> Option<u64> {
        Some(self.len())
    }

    fn media_type(&self) -> Option<&str> {
        None
    }

    fn into_body(self: Box<Self>) -> OutBody {
        OutBody::file(*self)
    }
}

impl Response<OutBody> {
    /// Fill the response from an asset.
    ///
    /// `Content-Length` and `Content-Type` are set when absent and known;
    /// a missing asset turns the response into a plain `404`.
    pub fn send_asset(&mut self, asset: impl Asset + 'static) {
        let asset = Box::new(asset);
        if !asset.exists() {
            *self.status_mut() = StatusCode::NOT_FOUND;
            *self.body_mut() = OutBody::empty();
            return;
        }

        if !self.headers().contains_key(CONTENT_TYPE) {
            if let Some(media_type) = asset.media_type() {
                if let Ok(value) = HeaderValue::from_string(media_type.to_owned()) {
                    self.headers_mut().insert(CONTENT_TYPE, value);
                }
            }
        }
        if !self.headers().contains_key(CONTENT_LENGTH) {
            if let Some(size) = asset.size() {
                let value = HeaderValue::from_string(itoa::Buffer::new().format(size).to_owned())
                    .expect("digits are a valid value");
                self.headers_mut().insert(CONTENT_LENGTH, value);
            }
        }
        *self.body_mut() = asset.into_body();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use bytes::Bytes;

    struct InMemory {
        present: bool,
        media_type: &'static str,
        data: &'static [u8],
    }

    impl Asset for InMemory {
        fn exists(&self) -> bool {
            self.present
        }

        fn size(&self) -> Option<u64> {
            Some(self.data.len() as u64)
        }

        fn media_type(&self) -> Option<&str> {
            Some(self.media_type)
        }

        fn into_body(self: Box<Self>) -> OutBody {
            OutBody::full(Bytes::from_static(self.data))
        }
    }

    #[test]
    fn fills_headers_and_body() {
        let mut response = Response::new(OutBody::empty());
        response.send_asset(InMemory {
            present: true,
            media_type: "text/css",
            data: b"body{}",
        });

        assert_eq!(
            response.headers().get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/css"))
        );
        assert_eq!(
            response.headers().get(CONTENT_LENGTH),
            Some(&HeaderValue::from_static("6"))
        );
        assert_eq!(response.body().size_hint(), (6, Some(6)));
    }

    #[test]
    fn user_content_type_wins() {
        let mut response = Response::new(OutBody::empty());
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        response.send_asset(InMemory {
            present: true,
            media_type: "text/css",
            data: b"x",
        });
        assert_eq!(
            response.headers().get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/plain"))
        );
    }

    #[test]
    fn missing_asset_is_not_found() {
        let mut response = Response::new(OutBody::empty());
        response.send_asset(InMemory {
            present: false,
            media_type: "text/css",
            data: b"",
        });
        assert_eq!(*response.status(), StatusCode::NOT_FOUND);
        assert!(response.body().is_end_stream());
    }
}
