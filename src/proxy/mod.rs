//! Reverse proxy functionality
//!
//! Prefix rules decide which requests go to a backend and how their paths
//! are rewritten; the upstream handler carries them there.

pub mod rule;
pub mod table;
pub mod upstream;

pub use rule::{PathRewrite, ProxyRule};
pub use table::{ProxyTable, Route};
pub use upstream::ProxyHandler;
