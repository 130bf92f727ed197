//! Analysis pipeline stages
//!
//! Each stage is a small service with one entry point. The orchestrator in
//! [`analysis_pipeline`] composes them left to right per request.

pub mod access_guard;
pub mod analysis_pipeline;
pub mod feature_compressor;
pub mod model_invoker;
pub mod persister;
pub mod prompt_builder;
pub mod result_normalizer;
pub mod snapshot_loader;

pub use access_guard::{AccessGuard, IdentityProvider};
pub use analysis_pipeline::{AnalysisPipeline, PipelineSettings, RunOutcome};
pub use feature_compressor::{CurveCompressor, FeatureCompressor, FeatureSummary};
pub use model_invoker::{InvokerSettings, ModelInvoker};
pub use persister::Persister;
pub use prompt_builder::{GenerationRequest, PromptBuilder};
pub use result_normalizer::normalize;
pub use snapshot_loader::SnapshotLoader;
