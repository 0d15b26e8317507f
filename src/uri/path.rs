use percent_encoding::percent_decode_str;

/// Normalise a request path for routing.
///
/// Percent-encoded octets are decoded and dot-segments are collapsed per
/// [RFC3986 Section 5.2.4]. Decoded bytes that are not valid UTF-8 are
/// replaced, routing operates on the lossy form.
///
/// [RFC3986 Section 5.2.4]: <https://www.rfc-editor.org/rfc/rfc3986.html#section-5.2.4>
pub fn normalize_path(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();

    let mut segments: Vec<&str> = Vec::new();
    let trailing_slash = decoded.ends_with('/');

    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut out = String::with_capacity(decoded.len());
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    } else if trailing_slash {
        out.push('/');
    }
    out
}

/// Decode `key=value` pairs of a query string.
///
/// Pairs are returned in declaration order, keys without `=` map to an
/// empty value.
pub fn query_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = match pair.split_once('=') {
                Some((key, value)) => (key, value),
                None => (pair, ""),
            };
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let plus_decoded;
    let raw = if raw.contains('+') {
        plus_decoded = raw.replace('+', " ");
        plus_decoded.as_str()
    } else {
        raw
    };
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::{normalize_path, query_pairs};

    #[test]
    fn dot_segments() {
        assert_eq!(normalize_path("/a/b/../c"), "/a/c");
        assert_eq!(normalize_path("/a/./b"), "/a/b");
        assert_eq!(normalize_path("/../a"), "/a");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(normalize_path("/a%20b"), "/a b");
        assert_eq!(normalize_path("/caf%C3%A9"), "/café");
    }

    #[test]
    fn trailing_slash_preserved() {
        assert_eq!(normalize_path("/x/"), "/x/");
        assert_eq!(normalize_path("/x"), "/x");
    }

    #[test]
    fn query_decoding() {
        assert_eq!(
            query_pairs("a=1&b=two+words&c"),
            vec![
                ("a".to_owned(), "1".to_owned()),
                ("b".to_owned(), "two words".to_owned()),
                ("c".to_owned(), String::new()),
            ]
        );
        assert_eq!(query_pairs(""), Vec::<(String, String)>::new());
    }
}
