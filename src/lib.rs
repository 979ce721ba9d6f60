//! # kyro-tally - Incremental Recognition Consensus
//!
//! kyro-tally folds repeated, noisy recognition samples about the same
//! physical product into a running statistical consensus. Each recognition
//! attempt (typically a model call against a photo) is imperfect; many of
//! them together converge on the most likely brand, origin, blend and
//! tasting notes.
//!
//! ## Core Concepts
//!
//! - **Sample**: one possibly-incomplete observation about an entity
//! - **EntityRecord**: grow-only counters, a running rating sum, the best
//!   description so far and the contributor set for one normalized key
//! - **ConsensusView**: the read-time summary: top values with consistency,
//!   ranked top-N lists, mean rating
//! - **RecordStore**: the pluggable backend that applies each sample's
//!   update atomically
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use kyro_tally::{ConsensusEngine, InMemoryRecordStore, Sample, ScalarField};
//!
//! let engine = ConsensusEngine::new(Arc::new(InMemoryRecordStore::new()));
//!
//! for (origin, rating) in [("Cuba", Some(85.0)), ("Cuba", Some(95.0)), ("Dominican Republic", None)] {
//!     let mut sample = Sample::new("Cohiba", "Siglo II").with_scalar(ScalarField::Origin, origin);
//!     sample.rating = rating;
//!     engine.ingest(&sample)?;
//! }
//!
//! let view = engine.consensus("Cohiba", "Siglo II")?.expect("recognized");
//! assert_eq!(view.origin.as_deref(), Some("Cuba"));
//! assert_eq!(view.rating, Some(90.0));
//! assert_eq!(view.total_recognitions, 3);
//! # Ok::<(), kyro_tally::TallyError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod consensus;
pub mod engine;
pub mod error;
pub mod field;
pub mod key;
pub mod merge;
pub mod record;
pub mod sample;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use config::{EngineConfig, RatingBounds, TopNLimits};
pub use consensus::{derive_consensus, ConsensusView, ContributorEntry, RankedValue};
pub use engine::runtime::{IngestHandle, IngestRuntime, RuntimeConfig};
pub use engine::{ConsensusEngine, IngestReceipt};
pub use error::{ExecutionError, TallyError, TallyResult, ValidationError};
pub use field::{ArrayField, ScalarField};
pub use key::{normalize_key, EntityKey};
pub use merge::{Contributor, CounterIncrements, DescriptionCandidate, RecordUpdate};
pub use record::{CounterMap, DescriptionState, EntityRecord};
pub use sample::{MalformedField, ParsedSample, Sample};
pub use storage::{AppliedUpdate, InMemoryRecordStore, RecordStore, StorageError};
