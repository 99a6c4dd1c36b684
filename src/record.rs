//! The per-request capture logged to stdout.

use std::io::{self, Write};

use http::{HeaderMap, Method, Uri};
use serde_json::{Map, Value};

use crate::body::Body;

/// Everything captured about a single request: method, path, headers, query
/// parameters and the raw body. Built once per request, logged, dropped.
pub struct RequestRecord {
    pub method: Method,
    pub path: String,
    pub headers: Map<String, Value>,
    pub query_params: Map<String, Value>,
    pub body: Body,
}

impl RequestRecord {
    pub fn new(method: &Method, uri: &Uri, headers: &HeaderMap, body: &Body) -> Self {
        RequestRecord {
            method: method.clone(),
            path: uri.path().to_owned(),
            headers: headers_to_map(headers),
            query_params: uri.query().map(parse_query).unwrap_or_default(),
            body: body.clone(),
        }
    }

    /// Renders the log block. The body is shown as text; non-UTF-8 bytes
    /// come out as replacement characters.
    pub fn render(&self) -> String {
        format!(
            "[{}] {}\nHeaders: {}\nQuery Params: {}\nBody: {}\n",
            self.method,
            self.path,
            Value::Object(self.headers.clone()),
            Value::Object(self.query_params.clone()),
            String::from_utf8_lossy(self.body.as_bytes()),
        )
    }

    /// Writes the whole block under a single stdout lock, so blocks from
    /// concurrently handled requests never interleave mid-line.
    pub fn log(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        stdout.write_all(self.render().as_bytes())?;
        stdout.flush()
    }
}

fn headers_to_map(headers: &HeaderMap) -> Map<String, Value> {
    let mut map = Map::new();

    for name in headers.keys() {
        let value = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_owned(), Value::String(value));
    }

    map
}

/// Parses an urlencoded query string. Pairs without `=` map to empty
/// values and duplicate keys keep their last occurrence.
pub(crate) fn parse_query(query: &str) -> Map<String, Value> {
    let mut params = Map::new();

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = match pair.split_once('=') {
            Some((key, value)) => (key, value),
            None => (pair, ""),
        };
        params.insert(
            decode_component(key),
            Value::String(decode_component(value)),
        );
    }

    params
}

// Urlencoded decoding: `+` means space, `%XX` a byte. Invalid escapes pass
// through verbatim, a malformed query must never fail the request.
fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    out.push(hi * 16 + lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderValue, Request};
    use indoc::indoc;

    use super::*;

    fn record(req: &Request<Body>) -> RequestRecord {
        RequestRecord::new(req.method(), req.uri(), req.headers(), req.body())
    }

    #[test]
    fn captures_method_path_and_query() {
        let req = Request::builder()
            .method(Method::PUT)
            .uri("/items/42?force=true")
            .body(Body::empty())
            .unwrap();

        let record = record(&req);

        assert_eq!(record.method, Method::PUT);
        assert_eq!(record.path, "/items/42");
        assert_eq!(record.query_params["force"], "true");
    }

    #[test]
    fn renders_the_log_block_in_order() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/items?a=1&b=2")
            .header("host", "localhost:4567")
            .body(Body::from("hello world"))
            .unwrap();

        assert_eq!(
            record(&req).render(),
            indoc! {r#"
                [POST] /items
                Headers: {"host":"localhost:4567"}
                Query Params: {"a":"1","b":"2"}
                Body: hello world
            "#}
        );
    }

    #[test]
    fn renders_empty_bodies_and_queries() {
        let req = Request::builder()
            .method(Method::DELETE)
            .uri("/items/42")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            record(&req).render(),
            "[DELETE] /items/42\nHeaders: {}\nQuery Params: {}\nBody: \n"
        );
    }

    #[test]
    fn logs_non_utf8_bodies_lossily_but_keeps_the_bytes() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/blob")
            .body(Body::from(vec![b'h', b'i', 0xff, 0xfe]))
            .unwrap();

        let record = record(&req);

        assert_eq!(record.body.as_bytes(), &[b'h', b'i', 0xff, 0xfe]);
        assert!(record
            .render()
            .ends_with("Body: hi\u{fffd}\u{fffd}\n"));
    }

    #[test]
    fn joins_repeated_headers() {
        let mut req = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(Body::empty())
            .unwrap();
        req.headers_mut()
            .append("x-tag", HeaderValue::from_static("one"));
        req.headers_mut()
            .append("x-tag", HeaderValue::from_static("two"));

        let record = record(&req);
        assert_eq!(record.headers["x-tag"], "one, two");
    }

    #[test]
    fn decodes_url_escapes() {
        let params = parse_query("name=widget+mk%20II&q=%2Fsearch");
        assert_eq!(params["name"], "widget mk II");
        assert_eq!(params["q"], "/search");
    }

    #[test]
    fn keeps_malformed_escapes_verbatim() {
        let params = parse_query("broken=%zz&trailing=%2");
        assert_eq!(params["broken"], "%zz");
        assert_eq!(params["trailing"], "%2");
    }

    #[test]
    fn handles_flag_params_and_duplicates() {
        let params = parse_query("flag&a=1&a=2");
        assert_eq!(params["flag"], "");
        assert_eq!(params["a"], "2");
    }
}
