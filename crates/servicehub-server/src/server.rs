//! TCP listener and per-connection task spawning.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use servicehub_core::ServiceRegistry;

use crate::protocol::Connection;

/// Accepts connections and runs one protocol engine per client.
///
/// The accept loop itself is single-tasked; every accepted socket is handed
/// off to its own tokio task. All sessions share the one registry.
pub struct HubServer {
    registry: Arc<ServiceRegistry>,
}

impl HubServer {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    /// Bind `addr` and serve forever. Failure to bind is the one fatal
    /// startup condition.
    pub async fn run(self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "server listening");

        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::info!(%peer, "client connected");

            let registry = Arc::clone(&self.registry);
            tokio::spawn(async move {
                let connection = Connection::new(stream, registry);
                match connection.run().await {
                    Ok(()) => tracing::info!(%peer, "client disconnected"),
                    Err(e) => tracing::warn!(%peer, error = %e, "session terminated"),
                }
            });
        }
    }
}
