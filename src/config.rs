use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{PipelineResult, ProcessingError};

/// Default train/test boundary.
pub const DEFAULT_CUTOFF: &str = "2025-03-20";

/// How missing numeric values are filled before rows are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ImputationPolicy {
    /// Replace a missing value with the mean of the same field over the product's rows.
    ///
    /// A product whose field is missing on every row stays missing, and those rows
    /// are dropped by the cleaner.
    #[default]
    GroupMean,
}

/// Parameters of one pipeline run.
///
/// Every stage receives this value explicitly; there is no global configuration.
///
/// # Example
/// ```
/// # use marketprep::PipelineConfig;
/// let cfg = PipelineConfig::default()
///     .with_min_history(7)
///     .with_normalize(false);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Products with fewer aggregated records than this are excluded from
    /// feature and target construction.
    pub min_history: usize,

    /// Row offsets for lag features.
    pub lag_periods: Vec<usize>,

    /// Window lengths (in rows) for rolling means. Windows are strict: the
    /// feature is missing until `window` rows of history exist.
    pub rolling_windows: Vec<usize>,

    /// Forward distance for both targets: rows for `price_target`, days for `sales_target`.
    pub horizon: usize,

    /// Rows dated strictly before the cutoff go to train, the rest to test.
    pub cutoff: NaiveDate,

    /// Standardize the scaled feature set and emit the scaler artifact.
    pub normalize: bool,

    pub imputation: ImputationPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_history: 14,
            lag_periods: vec![1, 3, 7],
            rolling_windows: vec![3, 7],
            horizon: 7,
            cutoff: default_cutoff(),
            normalize: true,
            imputation: ImputationPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_min_history(self, min_history: usize) -> Self {
        Self {
            min_history,
            ..self
        }
    }

    pub fn with_lag_periods(self, lag_periods: impl IntoIterator<Item = usize>) -> Self {
        Self {
            lag_periods: lag_periods.into_iter().collect(),
            ..self
        }
    }

    pub fn with_rolling_windows(self, rolling_windows: impl IntoIterator<Item = usize>) -> Self {
        Self {
            rolling_windows: rolling_windows.into_iter().collect(),
            ..self
        }
    }

    pub fn with_horizon(self, horizon: usize) -> Self {
        Self { horizon, ..self }
    }

    pub fn with_cutoff(self, cutoff: NaiveDate) -> Self {
        Self { cutoff, ..self }
    }

    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.min_history == 0 {
            return Err(invalid("min_history must be at least 1"));
        }
        if self.horizon == 0 {
            return Err(invalid("horizon must be at least 1"));
        }
        if i32::try_from(self.horizon).is_err() {
            return Err(invalid("horizon must fit in a day count"));
        }
        if self.lag_periods.is_empty() || self.lag_periods.contains(&0) {
            return Err(invalid("lag_periods must be non-empty and strictly positive"));
        }
        if self.rolling_windows.is_empty() || self.rolling_windows.contains(&0) {
            return Err(invalid("rolling_windows must be non-empty and strictly positive"));
        }
        if self.min_history <= self.horizon {
            tracing::warn!(
                min_history = self.min_history,
                horizon = self.horizon,
                "A product with exactly min_history records cannot produce a labeled row"
            );
        }
        Ok(())
    }
}

fn default_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 20).unwrap_or_default()
}

fn invalid(msg: &str) -> crate::error::PipelineError {
    ProcessingError::InvalidConfig(msg.to_string()).into()
}
