//! Tests for upstream request construction and response reading

use devproxy::http::request::{Method, RequestBuilder};
use devproxy::http::response::StatusCode;
use devproxy::proxy::rule::{PathRewrite, ProxyRule};
use devproxy::proxy::table::Route;
use devproxy::proxy::upstream::{ProxyHandler, read_http_response};
use std::time::Duration;

fn handler() -> ProxyHandler {
    ProxyHandler::new(Duration::from_secs(5))
}

fn api_rule(change_origin: bool) -> ProxyRule {
    ProxyRule::new("/api", "http://localhost:5000", change_origin, PathRewrite::StripPrefix)
        .unwrap()
}

fn route_for<'a>(rule: &'a ProxyRule, path: &str) -> Route<'a> {
    Route {
        rule,
        forward_path: rule.forward_path(path).unwrap(),
    }
}

#[test]
fn test_build_http_request_rewrites_path_and_host() {
    let rule = api_rule(true);
    let request = RequestBuilder::new()
        .method(Method::GET)
        .path("/api/session")
        .header("Host", "localhost:5173")
        .header("User-Agent", "Test")
        .build()
        .unwrap();

    let bytes = handler().build_http_request(&request, &route_for(&rule, &request.path));
    let text = String::from_utf8_lossy(&bytes);

    assert!(text.starts_with("GET /session HTTP/1.1\r\n"));
    assert!(text.contains("Host: localhost:5000\r\n"));
    assert!(!text.contains("localhost:5173"));
    assert!(text.contains("User-Agent: Test\r\n"));
    assert!(text.contains("Connection: close\r\n"));
}

#[test]
fn test_build_http_request_keeps_client_host_without_change_origin() {
    let rule = api_rule(false);
    let request = RequestBuilder::new()
        .method(Method::GET)
        .path("/api/session")
        .header("host", "localhost:5173")
        .build()
        .unwrap();

    let bytes = handler().build_http_request(&request, &route_for(&rule, &request.path));
    let text = String::from_utf8_lossy(&bytes);

    assert!(text.contains("Host: localhost:5173\r\n"));
    assert!(!text.contains("host: localhost"));
}

#[test]
fn test_build_http_request_exact_prefix_goes_to_root() {
    let rule = api_rule(true);
    let request = RequestBuilder::new()
        .method(Method::GET)
        .path("/api")
        .build()
        .unwrap();

    let bytes = handler().build_http_request(&request, &route_for(&rule, &request.path));
    let text = String::from_utf8_lossy(&bytes);

    assert!(text.starts_with("GET / HTTP/1.1\r\n"));
}

#[test]
fn test_build_http_request_removes_hop_by_hop_headers() {
    let rule = api_rule(true);
    let request = RequestBuilder::new()
        .method(Method::GET)
        .path("/api/stream")
        .header("Connection", "keep-alive, X-Session-Hint")
        .header("X-Session-Hint", "abc")
        .header("Upgrade", "websocket")
        .header("Keep-Alive", "timeout=5")
        .header("Accept", "*/*")
        .build()
        .unwrap();

    let bytes = handler().build_http_request(&request, &route_for(&rule, &request.path));
    let text = String::from_utf8_lossy(&bytes);

    assert!(text.contains("Connection: close\r\n"));
    assert!(!text.contains("keep-alive"));
    assert!(!text.contains("Upgrade"));
    assert!(!text.contains("X-Session-Hint"));
    assert!(!text.contains("Keep-Alive"));
    assert!(text.contains("Accept: */*\r\n"));
}

#[test]
fn test_build_http_request_with_body() {
    let rule = api_rule(true);
    let request = RequestBuilder::new()
        .method(Method::POST)
        .path("/api/session")
        .header("Content-Type", "application/json")
        .header("content-length", "16")
        .body(br#"{"user":"alice"}"#.to_vec())
        .build()
        .unwrap();

    let bytes = handler().build_http_request(&request, &route_for(&rule, &request.path));
    let text = String::from_utf8_lossy(&bytes);

    assert!(text.starts_with("POST /session HTTP/1.1\r\n"));
    assert!(text.contains("Content-Length: 16\r\n"));
    assert!(!text.contains("content-length"));
    assert!(text.ends_with("\r\n\r\n{\"user\":\"alice\"}"));
}

#[test]
fn test_build_http_request_drops_expect() {
    let rule = api_rule(true);
    let request = RequestBuilder::new()
        .method(Method::POST)
        .path("/api/upload")
        .header("Expect", "100-continue")
        .header("Content-Length", "4")
        .body(b"data".to_vec())
        .build()
        .unwrap();

    let bytes = handler().build_http_request(&request, &route_for(&rule, &request.path));
    let text = String::from_utf8_lossy(&bytes);

    assert!(!text.contains("Expect"));
    assert!(!text.contains("100-continue"));
    assert!(text.ends_with("\r\n\r\ndata"));
}

#[test]
fn test_build_http_request_extension_method() {
    let rule = api_rule(true);
    let request = RequestBuilder::new()
        .method(Method::from_str("PROPFIND").unwrap())
        .path("/api/files")
        .header("Depth", "1")
        .build()
        .unwrap();

    let bytes = handler().build_http_request(&request, &route_for(&rule, &request.path));
    let text = String::from_utf8_lossy(&bytes);

    assert!(text.starts_with("PROPFIND /files HTTP/1.1\r\n"));
    assert!(text.contains("Depth: 1\r\n"));
}

#[tokio::test]
async fn test_read_response_with_content_length() {
    let raw = b"HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}";
    let mut stream = &raw[..];

    let response = read_http_response(&mut stream, &Method::POST).await.unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.body, b"{}".to_vec());
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert_eq!(response.header("Connection"), None);
}

#[tokio::test]
async fn test_read_response_passes_status_through() {
    let raw = b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\n\r\n";
    let mut stream = &raw[..];

    let response = read_http_response(&mut stream, &Method::GET).await.unwrap();

    assert_eq!(response.status.as_u16(), 401);
    assert_eq!(response.status.reason_phrase(), "Unauthorized");
}

#[tokio::test]
async fn test_read_response_chunked_is_reframed() {
    let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nsess\r\n3\r\nion\r\n0\r\n\r\n";
    let mut stream = &raw[..];

    let response = read_http_response(&mut stream, &Method::GET).await.unwrap();

    assert_eq!(response.body, b"session".to_vec());
    assert_eq!(response.header("Transfer-Encoding"), None);
    assert_eq!(response.header("Content-Length"), Some("7"));
}

#[tokio::test]
async fn test_read_response_until_eof() {
    let raw = b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nall of it";
    let mut stream = &raw[..];

    let response = read_http_response(&mut stream, &Method::GET).await.unwrap();

    assert_eq!(response.body, b"all of it".to_vec());
    assert_eq!(response.header("Content-Length"), Some("9"));
}

#[tokio::test]
async fn test_read_response_to_head_has_no_body() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 1234\r\n\r\n";
    let mut stream = &raw[..];

    let response = read_http_response(&mut stream, &Method::HEAD).await.unwrap();

    assert!(response.body.is_empty());
    assert_eq!(response.header("Content-Length"), Some("1234"));
}

#[tokio::test]
async fn test_read_response_keeps_set_cookie_headers() {
    let raw = b"HTTP/1.1 204 No Content\r\nSet-Cookie: sid=1; HttpOnly\r\nSet-Cookie: theme=dark\r\n\r\n";
    let mut stream = &raw[..];

    let response = read_http_response(&mut stream, &Method::POST).await.unwrap();

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let cookies: Vec<&str> = response.header_values("Set-Cookie").collect();
    assert_eq!(cookies, vec!["sid=1; HttpOnly", "theme=dark"]);
}

#[tokio::test]
async fn test_read_response_truncated_body_is_error() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort";
    let mut stream = &raw[..];

    assert!(read_http_response(&mut stream, &Method::GET).await.is_err());
}

#[tokio::test]
async fn test_read_response_garbage_is_error() {
    let raw = b"SSH-2.0-OpenSSH\r\n\r\n";
    let mut stream = &raw[..];

    assert!(read_http_response(&mut stream, &Method::GET).await.is_err());
}

#[tokio::test]
async fn test_read_response_skips_continue() {
    let raw = b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\nok";
    let mut stream = &raw[..];

    let response = read_http_response(&mut stream, &Method::POST).await.unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.body, b"ok".to_vec());
}

#[tokio::test]
async fn test_read_response_skips_several_interim_heads() {
    let raw = b"HTTP/1.1 103 Early Hints\r\nLink: </app.css>; rel=preload\r\n\r\nHTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
    let mut stream = &raw[..];

    let response = read_http_response(&mut stream, &Method::GET).await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("Link"), None);
}

#[tokio::test]
async fn test_read_response_huge_chunk_size_is_error() {
    let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\nabc\r\n0\r\n\r\n";
    let mut stream = &raw[..];

    let err = read_http_response(&mut stream, &Method::GET).await.unwrap_err();

    assert!(format!("{err:#}").contains("Malformed chunked response body"));
}
