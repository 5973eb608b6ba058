//! The ordered set of proxy rules the server consults for every request.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::proxy::rule::{PathRewrite, ProxyRule};

/// A request the table decided to proxy.
#[derive(Debug, Clone)]
pub struct Route<'a> {
    pub rule: &'a ProxyRule,
    /// Path written on the upstream request line.
    pub forward_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProxyTable {
    rules: Vec<ProxyRule>,
}

impl ProxyTable {
    pub fn new(rules: Vec<ProxyRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let rules = cfg
            .proxy
            .0
            .iter()
            .map(|(prefix, rule)| {
                ProxyRule::new(
                    prefix.as_str(),
                    rule.target(),
                    rule.change_origin(),
                    PathRewrite::from(rule.rewrite()),
                )
                .with_context(|| format!("Invalid proxy rule for `{prefix}`"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(rules))
    }

    /// First rule, in declaration order, that claims `path`.
    pub fn route(&self, path: &str) -> Option<Route<'_>> {
        self.rules.iter().find_map(|rule| {
            rule.forward_path(path)
                .map(|forward_path| Route { rule, forward_path })
        })
    }

    pub fn rules(&self) -> &[ProxyRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
