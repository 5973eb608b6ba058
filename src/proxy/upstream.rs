//! Upstream connection and request forwarding
//!
//! Sends a rewritten request to the origin its rule names and relays the
//! answer. There is one target per rule and no retry: a failed exchange
//! becomes a gateway error for the client.

use crate::http::chunked;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::proxy::table::Route;
use anyhow::{Context, Result};
use bytes::BytesMut;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{error::Elapsed, timeout};

/// Default buffer size for reads
const BUFFER_SIZE: usize = 8192;

/// Largest upstream response head accepted
const MAX_RESPONSE_HEAD: usize = 64 * 1024;

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "Connection",
    "Keep-Alive",
    "Proxy-Connection",
    "Transfer-Encoding",
    "Upgrade",
    "TE",
    "Trailer",
];

/// Handles proxying requests to backend origins
#[derive(Debug, Clone)]
pub struct ProxyHandler {
    /// Upper bound on establishing the TCP connection
    connect_timeout: Duration,
}

impl ProxyHandler {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Forward an HTTP request along `route`.
    ///
    /// Never fails: transport errors are logged and turned into 502 or 504
    /// responses.
    pub async fn forward(&self, request: &Request, route: &Route<'_>) -> Response {
        let rule = route.rule;

        tracing::debug!(
            prefix = rule.match_prefix(),
            target = %rule.target_origin(),
            method = %request.method,
            path = %request.path,
            forward_path = %route.forward_path,
            "Forwarding request"
        );

        match self.proxy_to_target(request, route).await {
            Ok(response) => {
                tracing::info!(
                    prefix = rule.match_prefix(),
                    target = %rule.target_origin(),
                    status = response.status.as_u16(),
                    method = %request.method,
                    path = %request.path,
                    "Request forwarded"
                );
                response
            }
            Err(e) => {
                tracing::warn!(
                    prefix = rule.match_prefix(),
                    target = %rule.target_origin(),
                    error = %format!("{e:#}"),
                    method = %request.method,
                    path = %request.path,
                    "Failed to proxy request"
                );
                self.handle_proxy_error(&e)
            }
        }
    }

    async fn proxy_to_target(&self, request: &Request, route: &Route<'_>) -> Result<Response> {
        let addr = route.rule.connect_addr();

        let mut stream = self
            .bounded_connect(&addr, TcpStream::connect(addr.as_str()))
            .await?;

        tracing::trace!(addr = %addr, "Connected to upstream");

        let request_bytes = self.build_http_request(request, route);
        stream.write_all(&request_bytes).await?;
        stream.flush().await?;

        read_http_response(&mut stream, &request.method).await
    }

    /// Runs `connect` under the connect timeout.
    async fn bounded_connect<F>(&self, addr: &str, connect: F) -> Result<TcpStream>
    where
        F: Future<Output = std::io::Result<TcpStream>>,
    {
        timeout(self.connect_timeout, connect)
            .await
            .with_context(|| format!("Timed out connecting to {addr}"))?
            .with_context(|| format!("Failed to connect to {addr}"))
    }

    /// Serialise the request as the upstream should see it.
    ///
    /// The request line carries the rewritten path. `Host` becomes the
    /// target's when the rule changes origin; hop-by-hop headers are dropped
    /// and the upstream connection is closed after one exchange. `Expect` is
    /// dropped too: the body is already buffered and goes out with the head.
    pub fn build_http_request(&self, request: &Request, route: &Route<'_>) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(512 + request.body.len());

        buffer.extend_from_slice(
            format!("{} {} HTTP/1.1\r\n", request.method, route.forward_path).as_bytes(),
        );

        // Headers named in Connection are hop-by-hop as well
        let listed: Vec<String> = request
            .header("Connection")
            .map(|v| v.split(',').map(|t| t.trim().to_string()).collect())
            .unwrap_or_default();

        let skip = |name: &str| {
            name.eq_ignore_ascii_case("Host")
                || name.eq_ignore_ascii_case("Content-Length")
                || name.eq_ignore_ascii_case("Expect")
                || HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
                || listed.iter().any(|h| h.eq_ignore_ascii_case(name))
        };

        let host = if route.rule.change_origin() {
            route.rule.host_header()
        } else {
            request
                .header("Host")
                .map(str::to_string)
                .unwrap_or_else(|| route.rule.host_header())
        };

        let mut headers: Vec<(&str, String)> = vec![("Host", host)];
        headers.extend(
            request
                .headers
                .iter()
                .filter(|(k, _)| !skip(k.as_str()))
                .map(|(k, v)| (k.as_str(), v.clone())),
        );
        if !request.body.is_empty() || request.header("Content-Length").is_some() {
            headers.push(("Content-Length", request.body.len().to_string()));
        }
        headers.push(("Connection", "close".to_string()));

        for (key, value) in &headers {
            buffer.extend_from_slice(format!("{key}: {value}\r\n").as_bytes());
        }

        // End of headers
        buffer.extend_from_slice(b"\r\n");

        buffer.extend_from_slice(&request.body);

        buffer
    }

    /// Map a failed exchange to the response the client gets.
    fn handle_proxy_error(&self, error: &anyhow::Error) -> Response {
        if error.downcast_ref::<Elapsed>().is_some() {
            Response::plain(
                StatusCode::GATEWAY_TIMEOUT,
                "The backend server did not accept the connection in time.",
            )
        } else {
            Response::plain(
                StatusCode::BAD_GATEWAY,
                "Failed to get a response from the backend server.",
            )
        }
    }
}

/// Read one HTTP response off `stream`.
///
/// Interim 1xx responses other than 101 are skipped. The body is framed by
/// chunked encoding, Content-Length, or the end of the stream, in that order
/// of preference. Responses to HEAD and bodiless statuses carry no body.
/// Hop-by-hop headers are removed and the body is re-framed with
/// Content-Length.
pub async fn read_http_response<S>(stream: &mut S, method: &Method) -> Result<Response>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    let (status, mut headers) = loop {
        let (status, headers) = read_response_head(stream, &mut buffer).await?;
        let code = status.as_u16();
        if (100..200).contains(&code) && code != 101 {
            tracing::trace!(status = code, "Skipping interim upstream response");
            continue;
        }
        break (status, headers);
    };

    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };

    let body = if *method == Method::HEAD || status.is_bodiless() {
        Vec::new()
    } else if header("Transfer-Encoding")
        .map(|v| v.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false)
    {
        read_chunked_body(stream, &mut buffer).await?
    } else if let Some(len) = header("Content-Length") {
        let len = len
            .trim()
            .parse::<usize>()
            .context("Invalid Content-Length in response")?;
        read_sized_body(stream, &mut buffer, len).await?
    } else {
        let mut body = buffer.to_vec();
        stream.read_to_end(&mut body).await?;
        body
    };

    headers.retain(|(k, _)| !HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(k)));
    if *method != Method::HEAD && !status.is_bodiless() {
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case("Content-Length"));
    }

    Ok(ResponseBuilder::new(status)
        .headers(headers)
        .body(body)
        .build())
}

/// Read up to the end of the next response head and parse it.
async fn read_response_head<S>(
    stream: &mut S,
    buffer: &mut BytesMut,
) -> Result<(StatusCode, Vec<(String, String)>)>
where
    S: AsyncRead + Unpin,
{
    let headers_end = loop {
        if let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break end;
        }

        if buffer.len() > MAX_RESPONSE_HEAD {
            anyhow::bail!("Response headers too large");
        }

        let n = stream.read_buf(buffer).await?;
        if n == 0 {
            anyhow::bail!("Connection closed before complete response received");
        }
    };

    let head = buffer.split_to(headers_end + 4);
    parse_response_head(&head)
}

/// Parse the status line and headers of a response head.
fn parse_response_head(head: &[u8]) -> Result<(StatusCode, Vec<(String, String)>)> {
    let text = std::str::from_utf8(head).context("Invalid UTF-8 in response headers")?;

    let mut lines = text.split("\r\n");

    let status_line = lines.next().context("Empty response")?;
    let mut parts = status_line.splitn(3, ' ');

    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        anyhow::bail!("Invalid status line: {status_line}");
    }

    let code: u16 = parts
        .next()
        .context("Missing status code")?
        .parse()
        .context("Invalid status code")?;
    let status = StatusCode::from_u16(code)
        .with_context(|| format!("Status code out of range: {code}"))?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    Ok((status, headers))
}

async fn read_sized_body<S>(stream: &mut S, buffer: &mut BytesMut, len: usize) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    while buffer.len() < len {
        let n = stream.read_buf(buffer).await?;
        if n == 0 {
            anyhow::bail!("Connection closed before complete body received");
        }
    }

    Ok(buffer.split_to(len).to_vec())
}

async fn read_chunked_body<S>(stream: &mut S, buffer: &mut BytesMut) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut decoder = chunked::Decoder::new();

    loop {
        match decoder.feed(&buffer[..]) {
            Ok(Some(_consumed)) => return Ok(decoder.into_body()),
            Ok(None) => {}
            Err(e) => anyhow::bail!("Malformed chunked response body: {e:?}"),
        }

        let n = stream.read_buf(buffer).await?;
        if n == 0 {
            anyhow::bail!("Connection closed inside chunked response body");
        }
    }
}
