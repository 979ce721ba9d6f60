//! Consensus engine.
//!
//! [`ConsensusEngine`] ties the pieces together: the write path validates a
//! sample, plans its update and hands it to the store; the read path fetches
//! records and runs them through [`derive_consensus`].

mod write_path;

/// Bounded worker pool for concurrent ingestion.
pub mod runtime;

use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::consensus::{derive_consensus, ConsensusView};
use crate::error::TallyResult;
use crate::key::EntityKey;
use crate::record::EntityRecord;
use crate::storage::RecordStore;

pub use write_path::IngestReceipt;

/// Incremental consensus engine over a pluggable record store.
///
/// The engine holds no state of its own; clones share the same store.
#[derive(Clone)]
pub struct ConsensusEngine {
    store: Arc<dyn RecordStore>,
    config: EngineConfig,
}

impl ConsensusEngine {
    /// Create an engine with the default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
        }
    }

    /// Create an engine with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configuration is unusable.
    pub fn with_config(store: Arc<dyn RecordStore>, config: EngineConfig) -> TallyResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Get a reference to the record store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Get the active configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consensus for a brand and name, or `None` if never recognized.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn consensus(&self, brand: &str, name: &str) -> TallyResult<Option<ConsensusView>> {
        self.consensus_for_key(&EntityKey::from_parts(brand, name))
    }

    /// Consensus for an already-normalized key.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn consensus_for_key(&self, key: &EntityKey) -> TallyResult<Option<ConsensusView>> {
        Ok(self.store.get(key)?.map(|record| self.view(&record)))
    }

    /// Every record `contributor_id` submitted to, newest first.
    ///
    /// Uses the store's contributor index when it has one and falls back to
    /// a full scan otherwise. Either way the result is a point-in-time
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn find_by_contributor(
        &self,
        contributor_id: &str,
    ) -> TallyResult<Vec<(EntityKey, ConsensusView)>> {
        let mut records: Vec<EntityRecord> = match self.store.keys_for_contributor(contributor_id)? {
            Some(keys) => {
                let mut found = Vec::with_capacity(keys.len());
                for key in &keys {
                    if let Some(record) = self.store.get(key)? {
                        found.push(record);
                    }
                }
                found
            }
            None => {
                debug!(contributor_id, "no contributor index; scanning all records");
                self.store.scan_all()?
            }
        };
        records.retain(|record| record.has_contributor(contributor_id));

        records.sort_by(|a, b| {
            b.last_recognized_at
                .cmp(&a.last_recognized_at)
                .then_with(|| a.key.cmp(&b.key))
        });

        Ok(records
            .iter()
            .map(|record| (record.key.clone(), self.view(record)))
            .collect())
    }

    fn view(&self, record: &EntityRecord) -> ConsensusView {
        derive_consensus(record, &self.config.limits)
    }
}

impl std::fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
