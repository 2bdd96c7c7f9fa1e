use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use state_codec::{CodecError, PayloadCodec};
use state_store::{ObjectStore, StoreError};
use state_types::{namespaced_key, LayerAction, LayerName, StateDocument, NAME_FIELD};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a single layer action failed. Never escalates past the processor.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("layer name is empty after removing the directive")]
    EmptyName,

    #[error("layer already exists at {0}")]
    AlreadyExists(String),

    #[error("no stored layer at {0}")]
    Missing(String),

    #[error("stored layer is not a JSON object: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("layer task aborted: {0}")]
    Aborted(String),
}

impl From<StoreError> for LayerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { key, .. } => Self::Missing(key),
            other => Self::Store(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LayerStatus {
    /// The remote operation completed.
    Applied,
    /// The directive was recognised but has no remote effect.
    NoOp,
    Failed(String),
}

/// Result of one directive-bearing layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LayerOutcome {
    /// Position of the layer in the document's `layers` array.
    pub index: usize,
    /// Resolved (directive-free) name.
    pub name: String,
    pub action: LayerAction,
    #[serde(flatten)]
    pub status: LayerStatus,
}

/// Per-layer results of one processing pass, in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LayerReport {
    pub outcomes: Vec<LayerOutcome>,
}

impl LayerReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &LayerOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, LayerStatus::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

// ---------------------------------------------------------------------------
// LayerProcessor
// ---------------------------------------------------------------------------

/// A directive-bearing layer queued for its remote operation.
struct LayerJob {
    index: usize,
    action: LayerAction,
    name: String,
    body: Map<String, Value>,
}

/// Shared state cloned into each layer task.
#[derive(Clone)]
struct LayerTarget {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: String,
    codec: PayloadCodec,
    attribution: Option<String>,
}

/// Applies `CREATE:` / `READ:` / `UPDATE:` / `DELETE:` directives found on
/// layer names against the layer store, rewriting the document in place.
///
/// Layer failures are recorded in the returned [`LayerReport`] and logged;
/// they never fail the enclosing save. Remote operations run concurrently
/// up to the configured limit, but results are applied by index so the
/// `layers` order is preserved.
pub struct LayerProcessor {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: String,
    codec: PayloadCodec,
    concurrency: usize,
}

impl LayerProcessor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        codec: PayloadCodec,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: prefix.unwrap_or_default(),
            codec,
            concurrency: concurrency.max(1),
        }
    }

    /// Key of the stored copy of layer `name`.
    pub fn layer_key(&self, name: &str) -> String {
        namespaced_key(&self.prefix, name)
    }

    pub async fn process(
        &self,
        document: &mut StateDocument,
        attribution: Option<&str>,
    ) -> LayerReport {
        if document.has_malformed_layers() {
            tracing::warn!("`layers` is not an array, skipping layer actions");
            return LayerReport::default();
        }
        let Some(layers) = document.layers_mut() else {
            return LayerReport::default();
        };

        let jobs = collect_jobs(layers);
        if jobs.is_empty() {
            return LayerReport::default();
        }

        let mut outcomes: Vec<LayerOutcome> = jobs
            .iter()
            .map(|job| LayerOutcome {
                index: job.index,
                name: job.name.clone(),
                action: job.action,
                status: LayerStatus::Failed(
                    LayerError::Aborted("did not complete".into()).to_string(),
                ),
            })
            .collect();

        let target = LayerTarget {
            store: Arc::clone(&self.store),
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
            codec: self.codec.clone(),
            attribution: attribution.map(str::to_string),
        };
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (slot, job) in jobs.into_iter().enumerate() {
            let target = target.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => target.apply(&job).await,
                    Err(e) => Err(LayerError::Aborted(e.to_string())),
                };
                (slot, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (slot, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!(error = %e, "layer task panicked");
                    continue;
                }
            };
            let outcome = &mut outcomes[slot];
            outcome.status = match result {
                Ok(Applied::Written) => LayerStatus::Applied,
                Ok(Applied::Fetched(fetched)) => {
                    layers[outcome.index] = resolved_layer(&outcome.name, fetched);
                    LayerStatus::Applied
                }
                Ok(Applied::Nothing) => LayerStatus::NoOp,
                Err(e) => LayerStatus::Failed(e.to_string()),
            };
        }

        for outcome in &outcomes {
            match &outcome.status {
                LayerStatus::Failed(reason) => tracing::warn!(
                    index = outcome.index,
                    layer = %outcome.name,
                    action = %outcome.action,
                    %reason,
                    "layer action failed"
                ),
                status => tracing::info!(
                    index = outcome.index,
                    layer = %outcome.name,
                    action = %outcome.action,
                    ?status,
                    "layer action done"
                ),
            }
        }

        LayerReport { outcomes }
    }
}

/// Strip directives from every layer name and queue the remote operations.
fn collect_jobs(layers: &mut [Value]) -> Vec<LayerJob> {
    let mut jobs = Vec::new();
    for (index, entry) in layers.iter_mut().enumerate() {
        let Value::Object(layer) = entry else {
            continue;
        };
        let Some(raw) = layer.get(NAME_FIELD).and_then(Value::as_str) else {
            continue;
        };
        let LayerName::Directive { action, name } = LayerName::parse(raw) else {
            continue;
        };
        layer.insert(NAME_FIELD.to_string(), Value::String(name.clone()));
        let mut body = layer.clone();
        body.remove(NAME_FIELD);
        jobs.push(LayerJob {
            index,
            action,
            name,
            body,
        });
    }
    jobs
}

/// A fetched body under its resolved name. A `name` inside the stored body
/// never overrides the resolved one.
fn resolved_layer(name: &str, mut body: Map<String, Value>) -> Value {
    body.insert(NAME_FIELD.to_string(), Value::String(name.to_string()));
    Value::Object(body)
}

enum Applied {
    Written,
    Fetched(Map<String, Value>),
    Nothing,
}

impl LayerTarget {
    async fn apply(&self, job: &LayerJob) -> Result<Applied, LayerError> {
        if job.name.is_empty() {
            return Err(LayerError::EmptyName);
        }
        let key = namespaced_key(&self.prefix, &job.name);
        match job.action {
            LayerAction::Create => {
                let data = self.encode_body(&job.body)?;
                if !self.store.create(&self.bucket, &key, data).await? {
                    return Err(LayerError::AlreadyExists(key));
                }
                tracing::info!(bucket = %self.bucket, %key, "created layer");
                Ok(Applied::Written)
            }
            LayerAction::Read => {
                let stored = self.store.get(&self.bucket, &key).await?;
                let decoded = self.codec.decode(&stored)?;
                match serde_json::from_slice::<Value>(&decoded.data) {
                    Ok(Value::Object(body)) => Ok(Applied::Fetched(body)),
                    Ok(other) => Err(LayerError::InvalidBody(json_kind(&other).into())),
                    Err(e) => Err(LayerError::InvalidBody(e.to_string())),
                }
            }
            LayerAction::Update => {
                let data = self.encode_body(&job.body)?;
                self.store.put(&self.bucket, &key, data).await?;
                tracing::info!(bucket = %self.bucket, %key, "updated layer");
                Ok(Applied::Written)
            }
            // Deletion of the stored copy is deliberately not performed.
            LayerAction::Delete => Ok(Applied::Nothing),
        }
    }

    fn encode_body(&self, body: &Map<String, Value>) -> Result<Vec<u8>, LayerError> {
        let raw = serde_json::to_vec(body).map_err(|e| LayerError::InvalidBody(e.to_string()))?;
        Ok(self.codec.encode(&raw, self.attribution.as_deref())?)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use state_store::InMemoryObjectStore;

    const BUCKET: &str = "layers";

    fn processor(store: &Arc<InMemoryObjectStore>) -> LayerProcessor {
        LayerProcessor::new(
            Arc::clone(store) as Arc<dyn ObjectStore>,
            BUCKET,
            None,
            PayloadCodec::default(),
            4,
        )
    }

    fn doc(value: Value) -> StateDocument {
        StateDocument::try_from(value).unwrap()
    }

    fn stored_json(store: &InMemoryObjectStore, key: &str) -> Value {
        let raw = store.object(BUCKET, key).expect("layer should be stored");
        let decoded = PayloadCodec::default().decode(&raw).unwrap();
        serde_json::from_slice(&decoded.data).unwrap()
    }

    fn seed(store: &InMemoryObjectStore, key: &str, body: Value) {
        let raw = serde_json::to_vec(&body).unwrap();
        let data = PayloadCodec::default().encode(&raw, None).unwrap();
        store.insert(BUCKET, key, data);
    }

    #[tokio::test]
    async fn plain_layers_are_untouched() {
        let store = Arc::new(InMemoryObjectStore::new());
        let original = json!({"layers": [{"name": "a", "x": 1}, {"name": "b"}]});
        let mut d = doc(original.clone());
        let report = processor(&store).process(&mut d, None).await;
        assert!(report.is_empty());
        assert_eq!(d.into_value(), original);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn order_is_preserved() {
        let store = Arc::new(InMemoryObjectStore::new());
        let mut d = doc(json!({"layers": [
            {"name": "A"},
            {"name": "UPDATE:B", "v": 2},
            {"name": "C"}
        ]}));
        let report = processor(&store).process(&mut d, None).await;
        assert_eq!(d.layer_names(), vec!["A", "B", "C"]);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].index, 1);
        assert_eq!(report.outcomes[0].status, LayerStatus::Applied);
    }

    #[tokio::test]
    async fn create_stores_body_and_strips_prefix() {
        let store = Arc::new(InMemoryObjectStore::new());
        let mut d = doc(json!({"layers": [
            {"name": "CREATE:seg", "type": "segmentation", "source": "gs://x"}
        ]}));
        let report = processor(&store).process(&mut d, Some("alice")).await;
        assert_eq!(report.outcomes[0].status, LayerStatus::Applied);
        assert_eq!(d.layer_names(), vec!["seg"]);
        assert_eq!(
            stored_json(&store, "seg"),
            json!({"type": "segmentation", "source": "gs://x"})
        );
        let raw = store.object(BUCKET, "seg").unwrap();
        assert_eq!(
            PayloadCodec::default().peek_attribution(&raw).unwrap().as_deref(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn create_never_overwrites() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "seg", json!({"v": "original"}));
        let mut d = doc(json!({"layers": [{"name": "CREATE:seg", "v": "new"}]}));
        let report = processor(&store).process(&mut d, None).await;
        assert!(matches!(report.outcomes[0].status, LayerStatus::Failed(_)));
        assert!(report.has_failures());
        assert_eq!(stored_json(&store, "seg"), json!({"v": "original"}));
        // Name resolved, body left as submitted.
        assert_eq!(d.into_value(), json!({"layers": [{"name": "seg", "v": "new"}]}));
    }

    #[tokio::test]
    async fn read_replaces_body() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "seg", json!({"type": "image", "opacity": 0.5, "name": "ignored"}));
        let mut d = doc(json!({"layers": [{"name": "READ:seg", "stale": true}]}));
        let report = processor(&store).process(&mut d, None).await;
        assert_eq!(report.outcomes[0].status, LayerStatus::Applied);
        assert_eq!(
            d.into_value(),
            json!({"layers": [{"name": "seg", "type": "image", "opacity": 0.5}]})
        );
    }

    #[tokio::test]
    async fn read_of_missing_layer_fails_softly() {
        let store = Arc::new(InMemoryObjectStore::new());
        let mut d = doc(json!({"layers": [{"name": "READ:nope", "keep": 1}]}));
        let report = processor(&store).process(&mut d, None).await;
        match &report.outcomes[0].status {
            LayerStatus::Failed(reason) => assert!(reason.contains("nope")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(d.into_value(), json!({"layers": [{"name": "nope", "keep": 1}]}));
    }

    #[tokio::test]
    async fn read_of_non_object_fails() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "list", json!([1, 2, 3]));
        let mut d = doc(json!({"layers": [{"name": "READ:list"}]}));
        let report = processor(&store).process(&mut d, None).await;
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn update_overwrites() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "seg", json!({"v": 1}));
        let mut d = doc(json!({"layers": [{"name": "UPDATE:seg", "v": 2}]}));
        processor(&store).process(&mut d, None).await;
        assert_eq!(stored_json(&store, "seg"), json!({"v": 2}));
        assert_eq!(d.layer_names(), vec!["seg"]);
    }

    #[tokio::test]
    async fn delete_is_a_noop() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "seg", json!({"v": 1}));
        let before = store.object(BUCKET, "seg");
        let mut d = doc(json!({"layers": [{"name": "DELETE:seg", "v": 9}]}));
        let report = processor(&store).process(&mut d, None).await;
        assert_eq!(report.outcomes[0].status, LayerStatus::NoOp);
        assert_eq!(store.object(BUCKET, "seg"), before);
        assert_eq!(d.into_value(), json!({"layers": [{"name": "seg", "v": 9}]}));
    }

    #[tokio::test]
    async fn empty_name_after_directive_fails() {
        let store = Arc::new(InMemoryObjectStore::new());
        let mut d = doc(json!({"layers": [{"name": "CREATE:", "v": 1}]}));
        let report = processor(&store).process(&mut d, None).await;
        assert!(report.has_failures());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn layer_prefix_namespaces_keys() {
        let store = Arc::new(InMemoryObjectStore::new());
        let p = LayerProcessor::new(
            Arc::clone(&store) as Arc<dyn ObjectStore>,
            BUCKET,
            Some("layers".into()),
            PayloadCodec::default(),
            1,
        );
        assert_eq!(p.layer_key("seg"), "layers/seg");
        let mut d = doc(json!({"layers": [{"name": "CREATE:seg"}]}));
        p.process(&mut d, None).await;
        assert_eq!(store.keys(BUCKET), vec!["layers/seg"]);
    }

    #[tokio::test]
    async fn mixed_actions_with_partial_failure() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "existing", json!({"kept": true}));
        let mut d = doc(json!({
            "position": [1, 2, 3],
            "layers": [
                {"name": "CREATE:existing", "kept": false},
                {"name": "CREATE:fresh", "a": 1},
                "not-an-object",
                {"noname": true},
                {"name": "READ:existing"},
                {"name": "UPDATE:other", "a": 2}
            ]
        }));
        let report = processor(&store).process(&mut d, None).await;
        let indices: Vec<_> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 4, 5]);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.failures().next().unwrap().index, 0);

        let value = d.into_value();
        assert_eq!(value["position"], json!([1, 2, 3]));
        assert_eq!(value["layers"][2], json!("not-an-object"));
        assert_eq!(value["layers"][3], json!({"noname": true}));
        assert_eq!(value["layers"][4], json!({"name": "existing", "kept": true}));
    }

    #[tokio::test]
    async fn malformed_layers_are_left_alone() {
        let store = Arc::new(InMemoryObjectStore::new());
        let original = json!({"layers": {"name": "CREATE:x"}});
        let mut d = doc(original.clone());
        let report = processor(&store).process(&mut d, None).await;
        assert!(report.is_empty());
        assert_eq!(d.into_value(), original);
    }

    #[tokio::test]
    async fn many_layers_with_concurrency_limit() {
        let store = Arc::new(InMemoryObjectStore::new());
        let layers: Vec<Value> = (0..32)
            .map(|i| json!({"name": format!("CREATE:l{i:02}"), "i": i}))
            .collect();
        let mut d = doc(json!({ "layers": layers }));
        let report = processor(&store).process(&mut d, None).await;
        assert_eq!(report.outcomes.len(), 32);
        assert!(!report.has_failures());
        let names: Vec<String> = (0..32).map(|i| format!("l{i:02}")).collect();
        assert_eq!(d.layer_names(), names.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(store.len(), 32);
    }

    #[test]
    fn report_serializes_status_inline() {
        let outcome = LayerOutcome {
            index: 2,
            name: "seg".into(),
            action: LayerAction::Create,
            status: LayerStatus::Failed("boom".into()),
        };
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            v,
            json!({"index": 2, "name": "seg", "action": "CREATE", "status": "failed", "reason": "boom"})
        );
    }
}
