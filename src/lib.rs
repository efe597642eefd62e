//! Turns raw marketplace sales records into a leakage-safe, model-ready dataset.
//!
//! The pipeline is strictly linear:
//! load → clean → aggregate → features → targets → normalize → split.
//! Every stage takes and returns a polars [`DataFrame`](polars::prelude::DataFrame)
//! and receives the [`PipelineConfig`] explicitly.

pub mod aggregate;
pub mod clean;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod loader;
pub mod pipeline;
mod polars_ext;
pub mod prelude;
pub mod scaler;
pub mod schema;
pub mod series;
pub mod split;
pub mod targets;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, PipelineOutput};
