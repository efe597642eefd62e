use std::{fs, path::Path};

use polars::prelude::{DataFrame, Expr, IntoLazy, col, lit};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{IoError, LoadError, PipelineResult, ProcessingError, SchemaError},
    polars_ext::polars_err,
    schema::MarketCol,
};

const STAGE: &str = "normalize";

/// Fitted standardization parameters, persisted as `scaler_params.json`.
///
/// `mean[i]` and `scale[i]` belong to `features[i]`. A feature is transformed as
/// `(x - mean) / scale`, where `scale` is the population standard deviation, or
/// `1.0` for a constant column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub features: Vec<String>,
}

impl ScalerParams {
    pub const BASE_NAME: &'static str = "scaler_params";
    pub const FILE_NAME: &'static str = "scaler_params.json";

    /// Fits the scaled feature set over every row of `df`.
    pub fn fit(df: &DataFrame) -> PipelineResult<Self> {
        if df.height() == 0 {
            return Err(ProcessingError::EmptyDataset("target labeling").into());
        }
        ensure_columns(df, MarketCol::SCALED.iter().map(|c| c.as_str()))?;

        let stats = df
            .clone()
            .lazy()
            .select(MarketCol::SCALED.iter().flat_map(|&c| {
                [
                    col(c).mean().alias(format!("{c}_mean")),
                    col(c).std(0).alias(format!("{c}_std")),
                ]
            }).collect::<Vec<Expr>>())
            .collect()
            .map_err(polars_err(STAGE))?;

        let scalar = |name: String| -> PipelineResult<Option<f64>> {
            let column = stats.column(&name).map_err(polars_err(STAGE))?;
            Ok(column.f64().map_err(polars_err(STAGE))?.get(0))
        };

        let mut params = Self {
            mean: Vec::with_capacity(MarketCol::SCALED.len()),
            scale: Vec::with_capacity(MarketCol::SCALED.len()),
            features: Vec::with_capacity(MarketCol::SCALED.len()),
        };
        for c in MarketCol::SCALED {
            let mean = scalar(format!("{c}_mean"))?.unwrap_or(0.0);
            let std = scalar(format!("{c}_std"))?.unwrap_or(0.0);
            let scale = if std.is_finite() && std > 0.0 { std } else { 1.0 };
            debug!(feature = c.as_str(), mean, scale, "Fitted scaler");

            params.mean.push(mean);
            params.scale.push(scale);
            params.features.push(c.to_string());
        }
        Ok(params)
    }

    /// Applies the parameters to the matching columns of `df`; other columns pass through.
    pub fn transform(&self, df: &DataFrame) -> PipelineResult<DataFrame> {
        ensure_columns(df, self.features.iter().map(String::as_str))?;

        let exprs: Vec<Expr> = self
            .features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(name, (&mean, &scale))| {
                ((col(name.as_str()) - lit(mean)) / lit(scale)).alias(name.as_str())
            })
            .collect();

        df.clone()
            .lazy()
            .with_columns(exprs)
            .collect()
            .map_err(polars_err(STAGE))
    }

    /// `(mean, scale)` of one feature.
    pub fn get(&self, feature: &str) -> Option<(f64, f64)> {
        let i = self.features.iter().position(|f| f == feature)?;
        Some((*self.mean.get(i)?, *self.scale.get(i)?))
    }

    pub fn to_json(&self) -> PipelineResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self).map_err(IoError::Serialize)?)
    }

    /// Reads a previously persisted artifact, e.g. to standardize inference inputs.
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let params = serde_json::from_slice(&bytes).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(params)
    }
}

/// Fits the scaler on `df` and returns the standardized table with its parameters.
pub fn normalize(df: &DataFrame) -> PipelineResult<(DataFrame, ScalerParams)> {
    let params = ScalerParams::fit(df)?;
    let scaled = params.transform(df)?;
    Ok((scaled, params))
}

fn ensure_columns<'a>(df: &DataFrame, names: impl Iterator<Item = &'a str>) -> PipelineResult<()> {
    let missing: Vec<String> = names
        .filter(|name| df.column(name).is_err())
        .map(str::to_owned)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(missing).into())
    }
}
