use std::sync::Arc;
use std::time::{Duration, Instant};

use state_codec::PayloadCodec;
use state_store::{ObjectStore, TimeoutObjectStore};
use state_types::{StateDocument, StateId, StoredObjectRef};

use crate::allocator::IdAllocator;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::layers::{LayerProcessor, LayerReport};

/// Path segment under which saved states are served.
pub const JSON_ENDPOINT: &str = "/json";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a successful save produced.
#[derive(Clone, Debug)]
pub struct SaveReceipt {
    pub reference: StoredObjectRef,
    /// Per-layer directive results; failures here did not abort the save.
    pub layers: LayerReport,
    /// Size of the processed document before encoding.
    pub raw_size: usize,
    /// Size of the encoded object written to the store.
    pub stored_size: usize,
    pub elapsed: Duration,
}

impl SaveReceipt {
    pub fn id(&self) -> &StateId {
        &self.reference.id
    }
}

/// A loaded document and the attribution recorded when it was saved.
#[derive(Clone, Debug)]
pub struct LoadedState {
    pub document: StateDocument,
    pub attribution: Option<String>,
}

/// Caller-visible reference for a saved state: `<base>/json/<id>`.
pub fn public_reference(base_url: &str, id: &StateId) -> String {
    format!("{}{JSON_ENDPOINT}/{id}", base_url.trim_end_matches('/'))
}

// ---------------------------------------------------------------------------
// StatePipeline
// ---------------------------------------------------------------------------

/// Orchestrates saving and loading state documents.
///
/// Save: parse -> layer actions -> serialize -> encode -> allocate id -> write.
/// Load: read -> decode -> parse. Layer actions are not re-run on load.
pub struct StatePipeline {
    config: PipelineConfig,
    state_store: Arc<dyn ObjectStore>,
    codec: PayloadCodec,
    allocator: IdAllocator,
    layers: LayerProcessor,
}

impl StatePipeline {
    /// Build a pipeline over the given stores.
    ///
    /// Both stores are wrapped in a [`TimeoutObjectStore`] using the
    /// configured deadlines. They may be the same backend; documents and
    /// layers are kept apart by bucket.
    pub fn new(
        config: PipelineConfig,
        state_store: Arc<dyn ObjectStore>,
        layer_store: Arc<dyn ObjectStore>,
    ) -> PipelineResult<Self> {
        config.validate()?;

        let bounded = |store: Arc<dyn ObjectStore>| -> Arc<dyn ObjectStore> {
            Arc::new(TimeoutObjectStore::new(
                store,
                config.read_timeout(),
                config.write_timeout(),
            ))
        };
        let state_store = bounded(state_store);
        let layer_store = bounded(layer_store);

        let codec = PayloadCodec::new(config.codec.clone());
        let allocator = IdAllocator::new(
            config.id_strategy,
            config.state_prefix.clone(),
            config.max_allocation_attempts,
        );
        let layers = LayerProcessor::new(
            layer_store,
            config.layer_bucket.clone(),
            config.layer_prefix.clone(),
            codec.clone(),
            config.layer_concurrency,
        );

        Ok(Self {
            config,
            state_store,
            codec,
            allocator,
            layers,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Save a client payload and return where it was stored.
    pub async fn save(&self, raw: &[u8], attribution: Option<&str>) -> PipelineResult<SaveReceipt> {
        let start = Instant::now();
        let mut document = StateDocument::from_slice(raw)?;

        let layers = self.layers.process(&mut document, attribution).await;

        let processed = document.to_vec()?;
        let encoded = self.codec.encode(&processed, attribution)?;
        let (raw_size, stored_size) = (processed.len(), encoded.len());

        let reference = self
            .allocator
            .allocate(self.state_store.as_ref(), &self.config.state_bucket)
            .await?;
        self.state_store
            .put(&self.config.state_bucket, &reference.key, encoded)
            .await?;

        tracing::info!(
            key = %reference.key,
            raw_size,
            stored_size,
            layer_actions = layers.outcomes.len(),
            layer_failures = layers.failures().count(),
            "created state object"
        );

        Ok(SaveReceipt {
            reference,
            layers,
            raw_size,
            stored_size,
            elapsed: start.elapsed(),
        })
    }

    /// Load the document saved under `id`.
    pub async fn load(&self, id: &str) -> PipelineResult<StateDocument> {
        Ok(self.load_with_attribution(id).await?.document)
    }

    /// Load the document saved under `id` together with its attribution.
    pub async fn load_with_attribution(&self, id: &str) -> PipelineResult<LoadedState> {
        let id = StateId::parse(id).map_err(|_| PipelineError::NotFound(id.to_string()))?;
        let reference = StoredObjectRef::new(&self.config.state_prefix, id);

        let stored = match self
            .state_store
            .get(&self.config.state_bucket, &reference.key)
            .await
        {
            Ok(stored) => stored,
            Err(e) if e.is_not_found() => {
                return Err(PipelineError::NotFound(reference.id.into_string()))
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(key = %reference.key, size = stored.len(), "read state object");

        let decoded = self.codec.decode(&stored)?;
        if let Some(user) = &decoded.attribution {
            tracing::debug!(key = %reference.key, "generated by user: {user}");
        }
        let document = StateDocument::from_slice(&decoded.data)?;
        Ok(LoadedState {
            document,
            attribution: decoded.attribution,
        })
    }
}

impl std::fmt::Debug for StatePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePipeline")
            .field("state_bucket", &self.config.state_bucket)
            .field("layer_bucket", &self.config.layer_bucket)
            .field("id_strategy", &self.allocator.strategy())
            .finish()
    }
}
