//! A single prefix-based proxy rule.
//!
//! A rule claims every request whose path starts with its prefix as a whole
//! segment, rewrites the path, and names the origin the request goes to.
//! Evaluation is pure string work: no I/O, no shared state.

use anyhow::{Context, Result};
use url::Url;

use crate::config::{RewriteConfig, RewriteMode};

/// What happens to a matched path before forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRewrite {
    /// Forward the path unchanged.
    Keep,
    /// Remove the leading prefix: `/api/session` becomes `/session`.
    StripPrefix,
    /// Swap the leading prefix for another literal.
    Replace(String),
}

impl From<RewriteConfig> for PathRewrite {
    fn from(cfg: RewriteConfig) -> Self {
        match cfg {
            RewriteConfig::Mode(RewriteMode::Keep) => PathRewrite::Keep,
            RewriteConfig::Mode(RewriteMode::StripPrefix) => PathRewrite::StripPrefix,
            RewriteConfig::Replace { replace } => PathRewrite::Replace(replace),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyRule {
    match_prefix: String,
    target_origin: Url,
    change_origin: bool,
    rewrite: PathRewrite,
}

impl ProxyRule {
    /// Builds a rule, checking that the prefix is an anchored path segment
    /// and the target an absolute `http` URL.
    pub fn new(
        match_prefix: impl Into<String>,
        target: &str,
        change_origin: bool,
        rewrite: PathRewrite,
    ) -> Result<Self> {
        let match_prefix = match_prefix.into();

        if !match_prefix.starts_with('/') {
            anyhow::bail!("Proxy prefix `{match_prefix}` must start with '/'");
        }
        if match_prefix.len() > 1 && match_prefix.ends_with('/') {
            anyhow::bail!("Proxy prefix `{match_prefix}` must not end with '/'");
        }
        if match_prefix.contains(['?', '#']) {
            anyhow::bail!("Proxy prefix `{match_prefix}` must be a plain path");
        }

        let target_origin = Url::parse(target)
            .with_context(|| format!("Invalid proxy target `{target}`"))?;
        if target_origin.scheme() != "http" {
            anyhow::bail!(
                "Proxy target `{target}` uses unsupported scheme `{}`",
                target_origin.scheme()
            );
        }
        if target_origin.host_str().is_none() {
            anyhow::bail!("Proxy target `{target}` has no host");
        }

        Ok(Self {
            match_prefix,
            target_origin,
            change_origin,
            rewrite,
        })
    }

    pub fn match_prefix(&self) -> &str {
        &self.match_prefix
    }

    pub fn target_origin(&self) -> &Url {
        &self.target_origin
    }

    pub fn change_origin(&self) -> bool {
        self.change_origin
    }

    pub fn path_rewrite(&self) -> &PathRewrite {
        &self.rewrite
    }

    /// Whether `path` starts with the prefix as a whole segment.
    ///
    /// `/api`, `/api/x` and `/api?q` match `/api`; `/apixyz` does not.
    pub fn matches(&self, path: &str) -> bool {
        self.remainder(path).is_some()
    }

    /// The rewritten path, or `None` when the rule does not apply.
    ///
    /// With [`PathRewrite::StripPrefix`] a path equal to the prefix yields an
    /// empty string.
    pub fn rewrite(&self, path: &str) -> Option<String> {
        let rest = self.remainder(path)?;
        let rewritten = match &self.rewrite {
            PathRewrite::Keep => path.to_string(),
            PathRewrite::StripPrefix => rest.to_string(),
            PathRewrite::Replace(with) => format!("{with}{rest}"),
        };
        Some(rewritten)
    }

    /// Like [`rewrite`](Self::rewrite), normalised for a request line:
    /// an empty path becomes `/` and a bare query gains a leading `/`.
    pub fn forward_path(&self, path: &str) -> Option<String> {
        let rewritten = self.rewrite(path)?;
        Some(if rewritten.is_empty() {
            "/".to_string()
        } else if rewritten.starts_with('/') {
            rewritten
        } else {
            format!("/{rewritten}")
        })
    }

    /// `host[:port]` of the target, used as the Host header when
    /// `change_origin` is set.
    pub fn host_header(&self) -> String {
        // checked in `new`
        let host = self.target_origin.host_str().unwrap_or_default();
        match self.target_origin.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// `host:port` to open a TCP connection to.
    pub fn connect_addr(&self) -> String {
        let host = self.target_origin.host_str().unwrap_or_default();
        let port = self.target_origin.port_or_known_default().unwrap_or(80);
        format!("{host}:{port}")
    }

    fn remainder<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.match_prefix == "/" {
            return path.starts_with('/').then_some(path);
        }
        let rest = path.strip_prefix(self.match_prefix.as_str())?;
        match rest.chars().next() {
            None | Some('/') | Some('?') | Some('#') => Some(rest),
            _ => None,
        }
    }
}
