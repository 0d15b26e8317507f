use bytes::BytesMut;

use super::{ParseError, parse_header, parse_reqline};
use crate::common::ParseResult;
use crate::http::{Method, Version};

macro_rules! ok {
    ($result:expr) => {
        match $result {
            ParseResult::Ok(ok) => ok,
            other => panic!("expected Ok, got {other:?}"),
        }
    };
}

#[test]
fn reqline() {
    let mut bytes = BytesMut::from(&b"GET /hello HTTP/1.1\r\nHost: x\r\n"[..]);
    let reqline = ok!(parse_reqline(&mut bytes));
    assert_eq!(reqline.method, Method::GET);
    assert_eq!(reqline.target, "/hello");
    assert_eq!(reqline.version, Version::HTTP_11);
    assert_eq!(&bytes[..], b"Host: x\r\n");
}

#[test]
fn reqline_http10() {
    let mut bytes = BytesMut::from(&b"POST /submit?a=1 HTTP/1.0\r\n"[..]);
    let reqline = ok!(parse_reqline(&mut bytes));
    assert_eq!(reqline.method, Method::POST);
    assert_eq!(reqline.target, "/submit?a=1");
    assert_eq!(reqline.version, Version::HTTP_10);
}

#[test]
fn reqline_incremental() {
    let mut bytes = BytesMut::from(&b"GET /hel"[..]);
    assert!(parse_reqline(&mut bytes).is_pending());
    // pending leaves the buffer untouched
    assert_eq!(&bytes[..], b"GET /hel");

    bytes.extend_from_slice(b"lo HTTP/1.1\r\n");
    let reqline = ok!(parse_reqline(&mut bytes));
    assert_eq!(reqline.target, "/hello");
}

#[test]
fn reqline_rejects() {
    let mut bytes = BytesMut::from(&b"BREW /pot HTTP/1.1\r\n"[..]);
    assert!(matches!(
        parse_reqline(&mut bytes),
        ParseResult::Err(ParseError::UnknownMethod)
    ));

    let mut bytes = BytesMut::from(&b"GET /x HTTP/9.9\r\n"[..]);
    assert!(matches!(
        parse_reqline(&mut bytes),
        ParseResult::Err(ParseError::UnsupportedVersion)
    ));

    let mut bytes = BytesMut::from(&b"GET /a b HTTP/1.1\r\n"[..]);
    assert!(matches!(
        parse_reqline(&mut bytes),
        ParseResult::Err(ParseError::InvalidTarget)
    ));
}

#[test]
fn header_fields() {
    let mut bytes = BytesMut::from(&b"Host: example\r\nX-Empty:\r\nPadded:  v  \r\n\r\nrest"[..]);

    let field = ok!(parse_header(&mut bytes)).unwrap();
    assert_eq!(&field.name[..], b"Host");
    assert_eq!(&field.value[..], b"example");

    let field = ok!(parse_header(&mut bytes)).unwrap();
    assert_eq!(&field.name[..], b"X-Empty");
    assert_eq!(&field.value[..], b"");

    let field = ok!(parse_header(&mut bytes)).unwrap();
    assert_eq!(&field.name[..], b"Padded");
    assert_eq!(&field.value[..], b"v");

    assert!(ok!(parse_header(&mut bytes)).is_none());
    assert_eq!(&bytes[..], b"rest");
}

#[test]
fn header_rejects_bad_name() {
    let mut bytes = BytesMut::from(&b"Bad Name: v\r\n"[..]);
    assert!(matches!(
        parse_header(&mut bytes),
        ParseResult::Err(ParseError::InvalidHeaderName)
    ));

    let mut bytes = BytesMut::from(&b"no-colon-here\r\n"[..]);
    assert!(matches!(
        parse_header(&mut bytes),
        ParseResult::Err(ParseError::InvalidHeaderName)
    ));
}

#[test]
fn lone_lf_tolerated() {
    let mut bytes = BytesMut::from(&b"GET / HTTP/1.1\nHost: x\n\n"[..]);
    let reqline = ok!(parse_reqline(&mut bytes));
    assert_eq!(reqline.target, "/");
    let field = ok!(parse_header(&mut bytes)).unwrap();
    assert_eq!(&field.name[..], b"Host");
    assert!(ok!(parse_header(&mut bytes)).is_none());
}
