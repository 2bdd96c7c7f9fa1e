use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use state_pipeline::PipelineConfig;

use crate::error::{ServerError, ServerResult};

/// Environment variable naming the state document bucket.
pub const ENV_STATE_BUCKET: &str = "STATE_BUCKET";
/// Environment variable naming the layer bucket.
pub const ENV_LAYER_BUCKET: &str = "LAYER_BUCKET";
pub const ENV_BIND_ADDR: &str = "STATE_BIND_ADDR";
pub const ENV_PUBLIC_URL: &str = "STATE_PUBLIC_URL";
pub const ENV_STORAGE_ROOT: &str = "STATE_STORAGE_ROOT";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Base of returned references. Derived from request headers when unset.
    pub public_base_url: Option<String>,
    pub max_body_bytes: usize,
    /// Root directory of the local-disk object store.
    pub storage_root: PathBuf,
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8001)),
            public_base_url: None,
            max_body_bytes: 64 * 1024 * 1024,
            storage_root: PathBuf::from("data"),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Overlay settings from the process environment.
    pub fn apply_env(&mut self) -> ServerResult<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Overlay settings from `lookup`, which maps variable names to values.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<()> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(bucket) = var(ENV_STATE_BUCKET) {
            self.pipeline.state_bucket = bucket;
        }
        if let Some(bucket) = var(ENV_LAYER_BUCKET) {
            self.pipeline.layer_bucket = bucket;
        }
        if let Some(addr) = var(ENV_BIND_ADDR) {
            self.bind_addr = addr
                .parse()
                .map_err(|e| ServerError::Config(format!("{ENV_BIND_ADDR}={addr}: {e}")))?;
        }
        if let Some(url) = var(ENV_PUBLIC_URL) {
            self.public_base_url = Some(url);
        }
        if let Some(root) = var(ENV_STORAGE_ROOT) {
            self.storage_root = PathBuf::from(root);
        }
        Ok(())
    }

    /// Fail fast on settings that would break every request.
    pub fn validate(&self) -> ServerResult<()> {
        self.pipeline.validate()?;
        if self.max_body_bytes == 0 {
            return Err(ServerError::Config("max_body_bytes must be non-zero".into()));
        }
        Ok(())
    }
}
