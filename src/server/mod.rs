//! The development server: accept loop, request dispatch and the
//! static-file fallback.

pub mod dispatch;
pub mod listener;
pub mod static_files;
