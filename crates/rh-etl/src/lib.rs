//! rh-etl - Reelhouse ETL engine
//!
//! Streams the catalog snapshots through extraction, surrogate key
//! assignment and per-table transforms into batched warehouse inserts.
//!
//! ```text
//! Pipeline -> Extractor (per source) -> TableTransform (KeyRegistrySet) -> Loader
//! ```

pub mod error;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod plan;
pub mod registry;
pub mod transform;

pub use error::{EtlError, EtlResult, ExtractError, LoadError, RegistryError};
pub use extract::{ExtractOptions, ExtractStats, Extractor};
pub use load::{check_integrity, LoadOptions, LoadPhase, Loader, TableSink};
pub use pipeline::{NoopObserver, Pipeline, PipelineObserver, RunOutcome};
pub use plan::{JobInput, LoadPlan, RunMode, TableJob};
pub use registry::{KeyRegistry, KeyRegistrySet, NaturalKey, Resolution, SurrogateKey};
pub use transform::{Skip, TableTransform, TransformContext, Transformed};
