//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{ClusterConfig, DaemonConfig, StorageConfig};
use crate::control::ManualControl;
use crate::error::{DaemonError, DaemonResult};
use crate::notify::{HttpNotifier, Notifier};
use crate::scheduler::{Reconciler, Scheduler};
use crate::storage::{InMemoryInstanceStore, InstanceStore, PostgresInstanceStore};
use axum::Router;
use std::sync::Arc;
use stopping_cluster::{ClusterGateway, InMemoryCluster, KubernetesGateway};
use tokio::net::TcpListener;

/// Stopping daemon server
pub struct Server {
    config: DaemonConfig,
    scheduler: Arc<Scheduler>,
    router: Router,
}

impl Server {
    /// Create a new server with the given configuration
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let store: Arc<dyn InstanceStore> = match &config.storage {
            StorageConfig::Memory => {
                tracing::warn!("Using in-memory instance store; records are not persisted");
                Arc::new(InMemoryInstanceStore::new())
            }
            StorageConfig::Postgres {
                url,
                max_connections,
                connect_timeout_secs,
            } => Arc::new(
                PostgresInstanceStore::new(url, *max_connections, *connect_timeout_secs).await?,
            ),
        };

        let cluster: Arc<dyn ClusterGateway> = match &config.cluster {
            ClusterConfig::Memory => {
                tracing::warn!("Using in-memory cluster; no real pods will be stopped");
                Arc::new(InMemoryCluster::new())
            }
            ClusterConfig::Kubernetes(k8s) => {
                tracing::info!(api_url = %k8s.api_url, "Using Kubernetes cluster gateway");
                Arc::new(KubernetesGateway::new(k8s)?)
            }
        };

        let notifier = Arc::new(HttpNotifier::new(&config.notifier, store.clone())?);

        Ok(Self::with_components(config, store, cluster, notifier))
    }

    /// Wire a server from already built components
    pub fn with_components(
        config: DaemonConfig,
        store: Arc<dyn InstanceStore>,
        cluster: Arc<dyn ClusterGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(store.clone(), cluster, notifier));
        let scheduler = Scheduler::new(config.monitor.clone(), reconciler.clone());
        let control = Arc::new(ManualControl::new(reconciler));

        let state = AppState::new(store, control, scheduler.clone());
        let router = create_router(state, config.server.enable_cors);

        Self {
            config,
            scheduler,
            router,
        }
    }

    /// The HTTP router, for serving on a custom listener
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Stopping daemon listening on {}", addr);

        // Start scheduler in background
        let monitor = if self.config.monitor.enabled {
            Some(tokio::spawn(self.scheduler.clone().start()))
        } else {
            tracing::info!("Reconciliation loop disabled");
            None
        };

        // Run server with graceful shutdown
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Stopping daemon shutting down");

        // Stop scheduler and let an in-flight pass finish
        self.scheduler.stop();
        if let Some(handle) = monitor {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Scheduler task failed");
            }
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
