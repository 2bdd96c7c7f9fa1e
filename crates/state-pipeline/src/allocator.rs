use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use state_store::ObjectStore;
use state_types::{StateId, StoredObjectRef};

use crate::error::AllocationError;

/// Lower bound of the numeric ID space (18 digits).
pub const ID_SPACE_LOW: u64 = 100_000_000_000_000_000;
/// Upper bound of the numeric ID space, inclusive.
pub const ID_SPACE_HIGH: u64 = 999_999_999_999_999_999;

/// Shortest alphanumeric identifier the allocator will generate.
pub const MIN_ALPHANUMERIC_LEN: usize = 8;

/// How candidate identifiers are generated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdStrategy {
    /// Uniform integer in `[ID_SPACE_LOW, ID_SPACE_HIGH]`.
    #[default]
    Numeric,
    /// Random `[0-9A-Za-z]` string of fixed length.
    Alphanumeric { length: usize },
}

impl IdStrategy {
    /// Draw one candidate from the thread-local CSPRNG.
    pub fn candidate(&self) -> String {
        let mut rng = rand::thread_rng();
        match self {
            Self::Numeric => rng.gen_range(ID_SPACE_LOW..=ID_SPACE_HIGH).to_string(),
            Self::Alphanumeric { length } => (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(*length)
                .map(char::from)
                .collect(),
        }
    }
}

/// Allocates store-wide unique identifiers for new state documents.
///
/// Candidates are probed with `exists` until a free key is found. The probe
/// and the later write are not atomic, so two concurrent allocators can in
/// principle pick the same identifier; the size of the ID space keeps this
/// negligible. No writes happen here.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    strategy: IdStrategy,
    prefix: String,
    max_attempts: u32,
}

impl IdAllocator {
    pub fn new(strategy: IdStrategy, prefix: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            strategy,
            prefix: prefix.into(),
            max_attempts,
        }
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    /// Find an identifier whose key is free in `bucket`.
    pub async fn allocate(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
    ) -> Result<StoredObjectRef, AllocationError> {
        for attempt in 1..=self.max_attempts {
            let id = StateId::parse(self.strategy.candidate())?;
            let candidate = StoredObjectRef::new(&self.prefix, id);
            if !store.exists(bucket, &candidate.key).await? {
                tracing::info!(id = %candidate.id, attempt, "using unique state id");
                return Ok(candidate);
            }
            tracing::warn!(key = %candidate.key, attempt, "state id collision, retrying");
        }
        Err(AllocationError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}
