//! devproxy - front-end development server
//!
//! Serves a front-end project and forwards API calls under configured path
//! prefixes to a backend, rewriting the paths on the way.

pub mod config;
pub mod http;
pub mod proxy;
pub mod server;
