pub mod allocation;
pub mod analytics;
pub mod catalog;
pub mod config;
pub mod contracts;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod money;
pub mod pipeline;
pub mod policy;
pub mod store;

pub use config::AnalysisConfig;
pub use contracts::envelope::{FailureEnvelope, SuccessEnvelope};
pub use error::{LensError, LensResult};
pub use pipeline::{AnalysisOutput, AnalysisRunOptions, run, run_analysis};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
