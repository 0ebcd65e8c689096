/// Splits a request path into its decoded segments, dropping the leading
/// and any trailing empty segment (`/a/b/` has segments `["a", "b"]`).
pub fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(decode_component)
        .collect()
}

/// Splits a raw query string (without the leading `?`) into an ordered
/// list of `(key, value)` pairs, decoding percent-escapes and `+` as space.
/// Repeated keys are preserved in order rather than overwriting.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_query_component(k), decode_query_component(v)),
            None => (decode_query_component(pair), String::new()),
        })
        .collect()
}

/// Splits `path?query` into its two parts; `query` is `None` if there is no
/// `?` in the input.
pub fn split_path_and_query(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

fn decode_component(s: &str) -> String {
    percent_decode(s, false)
}

fn decode_query_component(s: &str) -> String {
    percent_decode(s, true)
}

/// Minimal percent-decoder. `plus_as_space` controls whether `+` decodes to
/// a literal space, which only applies to query components.
fn percent_decode(s: &str, plus_as_space: bool) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(bytes[i]);
                        i += 1;
                    }
                }
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_decodes_segments() {
        assert_eq!(
            split_segments("/hello%20world/foo/"),
            vec!["hello world".to_string(), "foo".to_string()]
        );
    }

    #[test]
    fn empty_path_has_no_segments() {
        assert!(split_segments("/").is_empty());
        assert!(split_segments("").is_empty());
    }

    #[test]
    fn parses_query_preserving_repeats_and_order() {
        let parsed = parse_query("a=1&b=2&a=3");
        assert_eq!(
            parsed,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn query_plus_decodes_as_space_but_path_does_not() {
        assert_eq!(parse_query("q=a+b")[0].1, "a b");
        assert_eq!(split_segments("/a+b"), vec!["a+b".to_string()]);
    }

    #[test]
    fn splits_target_on_question_mark() {
        assert_eq!(split_path_and_query("/a/b?x=1"), ("/a/b", Some("x=1")));
        assert_eq!(split_path_and_query("/a/b"), ("/a/b", None));
    }
}
