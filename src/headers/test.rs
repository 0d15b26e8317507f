use super::standard::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use super::{ContentType, HeaderMap, HeaderName, HeaderValue, MediaRange};

const fn is_send_sync<T: Send + Sync>() {}
const _: () = {
    is_send_sync::<HeaderMap>();
    is_send_sync::<HeaderName>();
    is_send_sync::<HeaderValue>();
};

#[test]
fn header_map() {
    let mut map = HeaderMap::new();

    map.append(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    assert!(map.contains_key("content-type"));
    assert!(map.contains_key("CONTENT-TYPE"));
    assert!(map.get(CONTENT_TYPE).is_some());

    map.append(HOST, HeaderValue::from_static("example"));
    map.append(CONTENT_LENGTH, HeaderValue::from_static("3"));
    map.append(CONTENT_LENGTH, HeaderValue::from_static("4"));

    // duplicates preserved in insertion order
    let all: Vec<&str> = map.get_all(CONTENT_LENGTH).filter_map(|v| v.to_str()).collect();
    assert_eq!(all, ["3", "4"]);

    // insert replaces every duplicate
    let replaced = map.insert(CONTENT_LENGTH, HeaderValue::from_static("7"));
    assert_eq!(replaced, Some(HeaderValue::from_static("3")));
    let all: Vec<&str> = map.get_all("content-length").filter_map(|v| v.to_str()).collect();
    assert_eq!(all, ["7"]);

    // removal returns the first value
    assert_eq!(map.remove("Host"), Some(HeaderValue::from_static("example")));
    assert!(!map.contains_key(HOST));
    assert_eq!(map.len(), 2);
}

#[test]
fn insertion_order_iteration() {
    let mut map = HeaderMap::new();
    map.append("b", HeaderValue::from_static("1"));
    map.append("a", HeaderValue::from_static("2"));
    map.append("b", HeaderValue::from_static("3"));

    let names: Vec<&str> = map.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["b", "a", "b"]);
}

#[test]
fn name_preserves_casing() {
    let name = HeaderName::from_bytes(&b"X-Custom-Header"[..]).unwrap();
    assert_eq!(name.as_str(), "X-Custom-Header");
    assert_eq!(name, "x-custom-header");
    assert!(CONTENT_TYPE.matches("content-type"));
}

#[test]
fn value_rejects_control_bytes() {
    assert!(HeaderValue::from_bytes(&b"ok value"[..]).is_ok());
    assert!(HeaderValue::from_bytes(&b"bad\r\nvalue"[..]).is_err());
    assert!(HeaderValue::from_bytes(&b"bad\0value"[..]).is_err());
}

#[test]
fn content_type_round_trip() {
    let raw = "text/HTML; Charset=UTF-8; boundary=\"xyz\"";
    let ct = ContentType::parse(raw).unwrap();
    assert_eq!(ct.kind(), "text");
    assert_eq!(ct.subkind(), "html");
    assert_eq!(ct.essence(), "text/html");
    assert_eq!(ct.charset(), Some("UTF-8"));
    assert_eq!(ct.params()[1], ("boundary".to_owned(), "xyz".to_owned()));
    // raw form is preserved bit-exact
    assert_eq!(ct.as_str(), raw);
}

#[test]
fn media_range_matching() {
    let ct = ContentType::parse("application/json; charset=utf-8").unwrap();

    assert!(MediaRange::parse("*/*").unwrap().matches(&ct));
    assert!(MediaRange::parse("application/*").unwrap().matches(&ct));
    assert!(MediaRange::parse("application/json").unwrap().matches(&ct));
    assert!(
        MediaRange::parse("application/json; charset=UTF-8")
            .unwrap()
            .matches(&ct)
    );
    assert!(!MediaRange::parse("text/*").unwrap().matches(&ct));
    assert!(
        !MediaRange::parse("application/json; charset=ascii")
            .unwrap()
            .matches(&ct)
    );
}

#[test]
fn media_range_specificity() {
    let with_params = MediaRange::parse("text/html; level=1").unwrap();
    let concrete = MediaRange::parse("text/html").unwrap();
    let partial = MediaRange::parse("text/*").unwrap();
    let any = MediaRange::parse("*/*").unwrap();
    assert!(with_params.specificity() > concrete.specificity());
    assert!(concrete.specificity() > partial.specificity());
    assert!(partial.specificity() > any.specificity());
}

#[test]
fn media_range_inclusion() {
    let any = MediaRange::parse("*/*").unwrap();
    let text = MediaRange::parse("text/*").unwrap();
    let html = MediaRange::parse("text/html").unwrap();
    assert!(any.includes(&html));
    assert!(text.includes(&html));
    assert!(!html.includes(&text));
    assert!(!text.includes(&any));
}
