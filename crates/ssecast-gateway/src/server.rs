use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::ConnectInfo, Extension, Router};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use ssecast_core::config::RelayConfig;
use ssecast_core::error::{RelayError, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::app::{build_router, AppState};
use crate::sse::keepalive;

/// Bind the listener, start the keep-alive driver and begin serving.
///
/// TLS material is loaded before binding, so a missing certificate fails
/// fast with nothing listening.
pub async fn start(config: RelayConfig) -> Result<ServerHandle> {
    config.validate()?;
    let tls = if config.tls.enabled {
        Some(crate::tls::load_server_config(&config.tls)?)
    } else {
        None
    };

    let addr = config.listen.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: addr.clone(),
            source,
        })?;
    let local_addr = listener.local_addr()?;

    let state = Arc::new(AppState::new(config));
    let router = build_router(Arc::clone(&state));

    let (stop_tx, stop_rx) = watch::channel(false);
    let keepalive = keepalive::spawn(
        Arc::clone(&state.broadcaster),
        state.keepalive_period(),
        stop_rx,
    );

    let server = match tls {
        Some(tls_config) => {
            info!("SSE server listening on {} (https)", local_addr);
            tokio::spawn(serve_tls(listener, TlsAcceptor::from(tls_config), router))
        }
        None => {
            warn!("TLS disabled, SSE server listening on {} (plain http)", local_addr);
            tokio::spawn(async move {
                let app = router.into_make_service_with_connect_info::<SocketAddr>();
                if let Err(e) = axum::serve(listener, app).await {
                    error!(error = %e, "http server exited");
                }
            })
        }
    };

    Ok(ServerHandle {
        local_addr,
        state,
        stop_tx,
        server,
        keepalive,
    })
}

/// Handle returned by `start()`. Owns the listener and keep-alive tasks.
pub struct ServerHandle {
    pub local_addr: SocketAddr,
    pub state: Arc<AppState>,
    stop_tx: watch::Sender<bool>,
    server: tokio::task::JoinHandle<()>,
    keepalive: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Resolve once an accepted `/exit` has run out its grace delay.
    pub async fn terminated(&self) {
        self.state.shutdown.terminated().await;
    }

    /// Stop accepting, stop the keep-alive driver and drop every subscriber.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        self.server.abort();
        let _ = self.server.await;
        let _ = self.keepalive.await;
        let dropped = self.state.registry.clear();
        self.state.shutdown.terminate_now();
        info!(subscribers_dropped = dropped, "relay stopped");
    }
}

async fn serve_tls(listener: TcpListener, acceptor: TlsAcceptor, router: Router) {
    loop {
        let (tcp, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let router = router.clone();
        tokio::spawn(async move {
            let stream = match acceptor.accept(tcp).await {
                Ok(s) => s,
                Err(e) => {
                    debug!(peer = %peer, error = %e, "TLS handshake failed");
                    return;
                }
            };

            let service = TowerToHyperService::new(router.layer(Extension(ConnectInfo(peer))));
            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(TokioIo::new(stream), service)
                .await
            {
                debug!(peer = %peer, error = %e, "connection ended with error");
            }
        });
    }
}
