use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use state_pipeline::StatePipeline;
use state_store::{LocalObjectStore, ObjectStore};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// HTTP front end for a [`StatePipeline`].
pub struct StateServer {
    config: ServerConfig,
    pipeline: Arc<StatePipeline>,
}

impl StateServer {
    pub fn new(config: ServerConfig, pipeline: Arc<StatePipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Build a server whose documents and layers live under
    /// `config.storage_root` on local disk.
    pub fn with_local_storage(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(&config.storage_root));
        let pipeline = StatePipeline::new(config.pipeline.clone(), store.clone(), store)?;
        Ok(Self::new(config, Arc::new(pipeline)))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Arc<StatePipeline> {
        &self.pipeline
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        let state = AppState::new(self.pipeline.clone(), self.config.public_base_url.clone());
        build_router(state, self.config.max_body_bytes)
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            state_bucket = %self.config.pipeline.state_bucket,
            layer_bucket = %self.config.pipeline.layer_bucket,
            "state server listening on {}",
            self.config.bind_addr
        );
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

impl std::fmt::Debug for StateServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateServer")
            .field("bind_addr", &self.config.bind_addr)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
