//! HTTP server startup and shutdown

use anyhow::Context;

use crate::api;
use crate::core::{BackgroundTasks, Config, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    /// Serve until Ctrl-C
    pub async fn run(&self) -> anyhow::Result<()> {
        let state = self.state.clone();

        let mut tasks = BackgroundTasks::new();
        state.start_background_tasks(&mut tasks).await;

        let app = api::build_app(&state);

        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Photo print server listening on {}", addr);

        let shutdown = tasks.shutdown_token();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down..."),
                    _ = shutdown.cancelled() => {}
                }
            })
            .await;

        tasks.shutdown().await;

        result.context("HTTP server error")
    }
}
