//! Percent-encoding for URL path segments and query values.

/// Escapes `s` so it can be placed inside a single path segment.
pub fn path_escape(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Escapes each `/`-separated segment of `s`, keeping the separators.
pub fn path_escape_segments(s: &str) -> String {
    s.split('/').map(path_escape).collect::<Vec<_>>().join("/")
}

/// Escapes `s` for use as a query-string or form value. Spaces become `+`.
pub fn query_escape(s: &str) -> String {
    // A literal `%` is encoded as `%25`, so every `%20` here came from a space.
    urlencoding::encode(s).replace("%20", "+")
}

/// Decodes a query-string or form value, reading `+` as a space.
pub fn query_unescape(s: &str) -> String {
    let plus_decoded = s.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(plus_decoded.as_bytes())).into_owned()
}

/// Splits `query` into decoded key/value pairs. Empty segments are dropped.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (query_unescape(k), query_unescape(v)),
            None => (query_unescape(pair), String::new()),
        })
        .collect()
}

/// Joins decoded pairs into an encoded query string.
pub fn encode_query<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", query_escape(k.as_ref()), query_escape(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}
