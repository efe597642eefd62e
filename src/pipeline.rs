use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::info;

use crate::{
    aggregate::aggregate,
    clean::clean,
    config::PipelineConfig,
    error::PipelineResult,
    features::build_features,
    io::{Artifact, commit},
    loader::load_records,
    scaler::{ScalerParams, normalize},
    split::{TrainTestSplit, split_by_cutoff},
    targets::build_targets,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Load,
    Clean,
    Aggregate,
    Features,
    Targets,
    Normalize,
    Split,
}

/// Row counts around one stage. Rows lost between `rows_in` and `rows_out`
/// were dropped on purpose (unrecoverable values, short history, missing labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub rows_in: usize,
    pub rows_out: usize,
}

impl StageReport {
    pub fn dropped(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }
}

/// Receives progress from a running pipeline.
pub trait ProgressSink: Send + Sync {
    fn stage_finished(&self, report: &StageReport);
}

/// Emits every stage report as an `info` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn stage_finished(&self, report: &StageReport) {
        info!(
            stage = %report.stage,
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            dropped = report.dropped(),
            "Stage finished"
        );
    }
}

/// Result of a successful run, still in memory.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub split: TrainTestSplit,
    /// Present when normalization is enabled.
    pub scaler: Option<ScalerParams>,
}

impl PipelineOutput {
    /// Renders every artifact, then writes them under `dir`.
    ///
    /// Produces `train_data.csv`, `test_data.csv` and, when normalizing,
    /// `scaler_params.json`. A rendering failure leaves `dir` untouched.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> PipelineResult<Vec<PathBuf>> {
        let mut artifacts = self
            .split
            .partitions()
            .into_iter()
            .map(Artifact::csv)
            .collect::<PipelineResult<Vec<_>>>()?;

        if let Some(scaler) = &self.scaler {
            artifacts.push(Artifact::json(ScalerParams::BASE_NAME, scaler.to_json()?));
        }

        commit(dir, &artifacts)
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    sink: Box<dyn ProgressSink>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            sink: Box::new(TracingSink),
        }
    }

    pub fn with_sink(self, sink: impl ProgressSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            ..self
        }
    }

    /// Loads `input` and runs every stage on it.
    pub fn run(&self, input: impl AsRef<Path>) -> PipelineResult<PipelineOutput> {
        let raw = load_records(input)?;
        self.report(Stage::Load, raw.height(), raw.height());
        self.process(&raw)
    }

    /// Runs every stage after loading on an already loaded raw table.
    pub fn process(&self, raw: &DataFrame) -> PipelineResult<PipelineOutput> {
        self.config.validate()?;
        let cfg = &self.config;

        let cleaned = self.stage(Stage::Clean, raw, |df| clean(df, cfg))?;
        let aggregated = self.stage(Stage::Aggregate, &cleaned, aggregate)?;
        let featured = self.stage(Stage::Features, &aggregated, |df| build_features(df, cfg))?;
        let labeled = self.stage(Stage::Targets, &featured, |df| build_targets(df, cfg))?;

        let (table, scaler) = if cfg.normalize {
            let (scaled, params) = normalize(&labeled)?;
            self.report(Stage::Normalize, labeled.height(), scaled.height());
            (scaled, Some(params))
        } else {
            (labeled, None)
        };

        let split = split_by_cutoff(&table, cfg.cutoff)?;
        self.report(
            Stage::Split,
            table.height(),
            split.train.height() + split.test.height(),
        );
        info!(
            train = split.train.height(),
            test = split.test.height(),
            cutoff = %cfg.cutoff,
            "Split labeled rows"
        );

        Ok(PipelineOutput { split, scaler })
    }

    fn stage<F>(&self, stage: Stage, input: &DataFrame, f: F) -> PipelineResult<DataFrame>
    where
        F: FnOnce(&DataFrame) -> PipelineResult<DataFrame>,
    {
        let output = f(input)?;
        self.report(stage, input.height(), output.height());
        Ok(output)
    }

    fn report(&self, stage: Stage, rows_in: usize, rows_out: usize) {
        self.sink.stage_finished(&StageReport {
            stage,
            rows_in,
            rows_out,
        });
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
