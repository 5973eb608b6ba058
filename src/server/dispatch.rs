use crate::http::request::Request;
use crate::http::response::Response;
use crate::proxy::{ProxyHandler, ProxyTable};
use crate::server::static_files::StaticFiles;

/// Decides what happens to each request.
///
/// Paths a proxy rule claims are forwarded upstream. Everything else passes
/// through unmodified to the static files, or gets a 404 when no root is
/// configured.
#[derive(Debug)]
pub struct Dispatcher {
    table: ProxyTable,
    proxy: ProxyHandler,
    static_files: Option<StaticFiles>,
}

impl Dispatcher {
    pub fn new(table: ProxyTable, proxy: ProxyHandler, static_files: Option<StaticFiles>) -> Self {
        Self {
            table,
            proxy,
            static_files,
        }
    }

    pub fn table(&self) -> &ProxyTable {
        &self.table
    }

    pub async fn handle(&self, request: Request) -> Response {
        if let Some(route) = self.table.route(&request.path) {
            return self.proxy.forward(&request, &route).await;
        }

        tracing::debug!(method = %request.method, path = %request.path, "No proxy rule matched");

        match &self.static_files {
            Some(files) => files.serve(&request).await,
            None => Response::not_found(),
        }
    }
}
