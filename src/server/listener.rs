use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::Connection;
use crate::proxy::{ProxyHandler, ProxyTable};
use crate::server::dispatch::Dispatcher;
use crate::server::static_files::StaticFiles;

/// Builds the request dispatcher described by `cfg`.
pub fn build_dispatcher(cfg: &Config) -> anyhow::Result<Dispatcher> {
    let table = ProxyTable::from_config(cfg)?;
    let static_files = cfg.server.root.clone().map(StaticFiles::new);
    Ok(Dispatcher::new(
        table,
        ProxyHandler::new(cfg.connect_timeout()),
        static_files,
    ))
}

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let dispatcher = Arc::new(build_dispatcher(cfg)?);
    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    serve(listener, dispatcher).await
}

/// Accepts connections on `listener` until the task is dropped.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    info!("Listening on {}", listener.local_addr()?);

    for rule in dispatcher.table().rules() {
        info!(
            prefix = rule.match_prefix(),
            target = %rule.target_origin(),
            change_origin = rule.change_origin(),
            rewrite = ?rule.path_rewrite(),
            "Proxy rule active"
        );
    }

    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::debug!("Accepted connection from {}", peer);

        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, dispatcher);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
