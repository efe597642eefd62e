// 1. Traits
pub use crate::io::{Table, TableName, ToCsv};
pub use crate::pipeline::ProgressSink;

// 2. Pipeline
pub use crate::config::{ImputationPolicy, PipelineConfig};
pub use crate::pipeline::{Pipeline, PipelineOutput, Stage, StageReport, TracingSink};

// 3. Stages
pub use crate::aggregate::aggregate;
pub use crate::clean::clean;
pub use crate::features::{build_features, feature_names};
pub use crate::loader::{load_records, records_to_frame};
pub use crate::scaler::{ScalerParams, normalize};
pub use crate::split::{Partition, PartitionKind, TrainTestSplit, split_by_cutoff};
pub use crate::targets::build_targets;

// 4. Schema
pub use crate::schema::MarketCol;

// 5. Errors
pub use crate::error::{
    IoError, LoadError, PipelineError, PipelineResult, ProcessingError, SchemaError,
};
