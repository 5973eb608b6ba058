//! Request accessors as the dev server uses them on `/api` traffic

use devproxy::http::parser::parse_http_request;
use devproxy::http::request::{Method, Request, RequestBuilder};

fn api_get(version: &str, headers: &[(&str, &str)]) -> Request {
    headers
        .iter()
        .fold(
            RequestBuilder::new()
                .method(Method::GET)
                .path("/api/session")
                .version(version),
            |builder, (k, v)| builder.header(*k, *v),
        )
        .build()
        .unwrap()
}

#[test]
fn test_host_header_lookup_ignores_case() {
    let req = api_get("HTTP/1.1", &[("host", "localhost:5173")]);

    assert_eq!(req.header("Host"), Some("localhost:5173"));
    assert_eq!(req.header("HOST"), Some("localhost:5173"));
    assert_eq!(req.header("Origin"), None);
}

#[test]
fn test_content_length_of_json_post() {
    let raw = b"POST /api/session HTTP/1.1\r\nContent-Type: application/json\r\ncontent-length: 16\r\n\r\n{\"user\":\"alice\"}";
    let (req, _) = parse_http_request(raw).unwrap();

    assert_eq!(req.method, Method::POST);
    assert_eq!(req.content_length(), 16);
    assert_eq!(req.body, br#"{"user":"alice"}"#.to_vec());
}

#[test]
fn test_content_length_unusable_values_read_as_zero() {
    assert_eq!(api_get("HTTP/1.1", &[]).content_length(), 0);
    assert_eq!(
        api_get("HTTP/1.1", &[("Content-Length", "lots")]).content_length(),
        0
    );
}

#[test]
fn test_chunked_upload_is_reframed() {
    let raw = b"PUT /api/avatar HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\npng\r\n4\r\ndata\r\n0\r\n\r\n";
    let (req, consumed) = parse_http_request(raw).unwrap();

    assert_eq!(consumed, raw.len());
    assert_eq!(req.body, b"pngdata".to_vec());
    assert_eq!(req.header("Transfer-Encoding"), None);
    assert_eq!(req.content_length(), 7);
}

#[test]
fn test_keep_alive_by_version_and_connection_header() {
    let cases = [
        ("HTTP/1.1", None, true),
        ("HTTP/1.1", Some("close"), false),
        ("HTTP/1.1", Some("Upgrade, Close"), false),
        ("HTTP/1.1", Some("keep-alive"), true),
        ("HTTP/1.0", None, false),
        ("HTTP/1.0", Some("Keep-Alive"), true),
        ("HTTP/1.0", Some("te, keep-alive"), true),
    ];

    for (version, connection, expected) in cases {
        let headers: Vec<(&str, &str)> = connection.map(|c| ("Connection", c)).into_iter().collect();
        let req = api_get(version, &headers);
        assert_eq!(
            req.keep_alive(),
            expected,
            "{version} with Connection: {connection:?}"
        );
    }
}

#[test]
fn test_path_only_drops_query_and_fragment() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/api/session?id=7#top")
        .build()
        .unwrap();

    assert_eq!(req.path_only(), "/api/session");
    assert_eq!(req.path, "/api/session?id=7#top");
}

#[test]
fn test_method_tokens() {
    assert_eq!(Method::from_str("DELETE"), Some(Method::DELETE));
    assert_eq!(
        Method::from_str("PROPFIND"),
        Some(Method::Other("PROPFIND".to_string()))
    );
    // method tokens are case-sensitive
    assert_eq!(Method::from_str("get"), Some(Method::Other("get".to_string())));
    assert_ne!(Method::from_str("get"), Some(Method::GET));

    assert_eq!(Method::from_str(""), None);
    assert_eq!(Method::from_str("GE T"), None);
    assert_eq!(Method::from_str("(GET)"), None);
}

#[test]
fn test_method_display_matches_request_line() {
    assert_eq!(Method::PATCH.to_string(), "PATCH");
    assert_eq!(Method::Other("MKCOL".to_string()).to_string(), "MKCOL");
}

#[test]
fn test_builder_defaults_version_and_requires_method() {
    let req = RequestBuilder::new()
        .method(Method::DELETE)
        .path("/api/session")
        .build()
        .unwrap();
    assert_eq!(req.version, "HTTP/1.1");

    assert!(RequestBuilder::new().path("/api").build().is_err());
}
