//! Static configuration, loaded once at startup.
//!
//! The file is YAML. Without one, the defaults describe the usual front-end
//! setup: a React plugin, every interface on port 5173, and `/api` forwarded
//! to a backend on `localhost:5000` with the prefix stripped.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Config file read when `DEVPROXY_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "devproxy.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// UI framework plugins the front-end build declares. Reported at
    /// startup; their behaviour belongs to the build tool.
    #[serde(default)]
    pub plugins: Vec<String>,

    #[serde(default)]
    pub server: ServerConfig,

    /// Proxy rules keyed by path prefix, in file order.
    #[serde(default)]
    pub proxy: ProxyRules,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: HostSetting,
    pub port: u16,
    /// Directory served for requests no proxy rule claims.
    pub root: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    pub log_level: String,
}

/// Where to listen: `true` for every interface, `false` for loopback only,
/// or an explicit address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HostSetting {
    AllInterfaces(bool),
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProxyRuleConfig {
    /// `"/prefix": "http://host:port"`, forwarded as is.
    Target(String),
    Full {
        target: String,
        #[serde(default)]
        change_origin: bool,
        #[serde(default)]
        rewrite: RewriteConfig,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RewriteConfig {
    Mode(RewriteMode),
    /// `rewrite: { replace: /v1 }` swaps the prefix for another one.
    Replace { replace: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    Keep,
    StripPrefix,
}

/// Proxy rules in the order they were declared. The first matching prefix
/// wins, so order matters and a plain map would lose it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyRules(pub Vec<(String, ProxyRuleConfig)>);

impl Default for Config {
    fn default() -> Self {
        Self {
            plugins: vec!["react".to_string()],
            server: ServerConfig::default(),
            proxy: ProxyRules(vec![(
                "/api".to_string(),
                ProxyRuleConfig::Full {
                    target: "http://localhost:5000".to_string(),
                    change_origin: true,
                    rewrite: RewriteConfig::Mode(RewriteMode::StripPrefix),
                },
            )]),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: HostSetting::AllInterfaces(true),
            port: 5173,
            root: None,
            connect_timeout_secs: 10,
            log_level: "info".to_string(),
        }
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        RewriteConfig::Mode(RewriteMode::Keep)
    }
}

impl ProxyRuleConfig {
    pub fn target(&self) -> &str {
        match self {
            ProxyRuleConfig::Target(target) => target,
            ProxyRuleConfig::Full { target, .. } => target,
        }
    }

    pub fn change_origin(&self) -> bool {
        match self {
            ProxyRuleConfig::Target(_) => false,
            ProxyRuleConfig::Full { change_origin, .. } => *change_origin,
        }
    }

    pub fn rewrite(&self) -> RewriteConfig {
        match self {
            ProxyRuleConfig::Target(_) => RewriteConfig::default(),
            ProxyRuleConfig::Full { rewrite, .. } => rewrite.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for ProxyRules {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RulesVisitor;

        impl<'de> Visitor<'de> for RulesVisitor {
            type Value = ProxyRules;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of path prefixes to proxy rules")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ProxyRules::default())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut rules = Vec::new();
                while let Some((prefix, rule)) = map.next_entry::<String, ProxyRuleConfig>()? {
                    if rules.iter().any(|(p, _)| *p == prefix) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate proxy prefix `{prefix}`"
                        )));
                    }
                    rules.push((prefix, rule));
                }
                Ok(ProxyRules(rules))
            }
        }

        deserializer.deserialize_map(RulesVisitor)
    }
}

impl Config {
    /// Loads the configuration for this process.
    ///
    /// Reads the file named by `DEVPROXY_CONFIG`, or `devproxy.yaml` when it
    /// exists, or falls back to the defaults. `LISTEN=host:port` then
    /// overrides the listen address.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var_os("DEVPROXY_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        if let Ok(listen) = std::env::var("LISTEN") {
            cfg.apply_listen_override(&listen)?;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        Ok(cfg)
    }

    /// Replaces host and port with a `host:port` pair.
    pub fn apply_listen_override(&mut self, listen: &str) -> Result<()> {
        let (host, port) = listen
            .rsplit_once(':')
            .with_context(|| format!("LISTEN must be host:port, got `{listen}`"))?;
        let port = port
            .parse()
            .with_context(|| format!("Invalid port in LISTEN `{listen}`"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        self.server.host = HostSetting::Address(host.to_string());
        self.server.port = port;
        Ok(())
    }

    /// The `host:port` the listener binds.
    pub fn listen_addr(&self) -> String {
        let host = match &self.server.host {
            HostSetting::AllInterfaces(true) => "0.0.0.0",
            HostSetting::AllInterfaces(false) => "127.0.0.1",
            HostSetting::Address(addr) => addr.as_str(),
        };
        if host.contains(':') {
            format!("[{}]:{}", host, self.server.port)
        } else {
            format!("{}:{}", host, self.server.port)
        }
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.server.connect_timeout_secs)
    }

    /// Maximum log level, defaulting to `INFO` when the setting is not a
    /// level name.
    pub fn log_level(&self) -> tracing::Level {
        self.server
            .log_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}
