//! Serves the front-end's files for requests no proxy rule claims.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::http::mime;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn serve(&self, request: &Request) -> Response {
        if !matches!(request.method, Method::GET | Method::HEAD) {
            return ResponseBuilder::new(StatusCode::METHOD_NOT_ALLOWED)
                .header("Allow", "GET, HEAD")
                .body(b"405 Method Not Allowed".to_vec())
                .build();
        }

        let Some(relative) = resolve(request.path_only()) else {
            tracing::warn!(path = %request.path, "Rejected path outside the static root");
            return Response::plain(StatusCode::FORBIDDEN, "Path escapes the static root.");
        };

        let mut path = self.root.join(relative);
        if tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            path.push("index.html");
        }

        match tokio::fs::read(&path).await {
            Ok(contents) => ResponseBuilder::new(StatusCode::OK)
                .header("Content-Type", mime::from_path(&path))
                .header("Cache-Control", "no-cache")
                .body(contents)
                .build(),
            Err(e) if e.kind() == ErrorKind::NotFound => Response::not_found(),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read static file");
                Response::internal_error()
            }
        }
    }
}

/// Turns a URL path into a relative filesystem path, or `None` if any
/// segment would climb out of the root or the decoded path is not UTF-8.
fn resolve(url_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url_path).ok()?;
    let mut relative = PathBuf::new();

    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_plain_and_encoded_paths() {
        assert_eq!(resolve("/"), Some(PathBuf::new()));
        assert_eq!(resolve("/assets/app.js"), Some(PathBuf::from("assets/app.js")));
        assert_eq!(resolve("/my%20file.txt"), Some(PathBuf::from("my file.txt")));
    }

    #[test]
    fn rejects_traversal() {
        assert_eq!(resolve("/../etc/passwd"), None);
        assert_eq!(resolve("/assets/%2e%2e/%2e%2e/secret"), None);
        assert_eq!(resolve("/assets/..%2f..%2fsecret"), None);
    }

    #[test]
    fn decoding_edge_cases() {
        // not UTF-8 once decoded
        assert_eq!(resolve("/caf%C3"), None);
        assert_eq!(resolve("/caf%C3%A9.txt"), Some(PathBuf::from("café.txt")));
        // malformed escapes stay literal
        assert_eq!(resolve("/bad%zz"), Some(PathBuf::from("bad%zz")));
    }
}
