use polars::prelude::{
    DataFrame, DataType, Expr, IntoLazy, LazyFrame, RollingOptionsFixedWindow,
    SortMultipleOptions, col, len, lit,
};

use crate::{
    config::PipelineConfig,
    error::PipelineResult,
    polars_ext::polars_err,
    schema::{MarketCol, lag_col, rolling_mean_col},
};

const STAGE: &str = "features";

/// Adds calendar, lag and rolling-mean features.
///
/// The table is sorted by product then date, and every series computation is
/// partitioned by `product_name`, so a feature of one product never reads a
/// row of another. Products with fewer than `min_history` records are removed
/// entirely rather than kept with empty features.
///
/// Feature semantics for a row at series position `i`:
/// - `{field}_lag_{k}`: the field at position `i - k`, missing when `i < k`.
/// - `{field}_rolling_mean_{w}`: mean of positions `i - w + 1 ..= i`, missing when `i + 1 < w`.
pub fn build_features(df: &DataFrame, config: &PipelineConfig) -> PipelineResult<DataFrame> {
    let lf = with_calendar(df.clone().lazy());

    sort_by_series(lf)
        .filter(has_min_history(config.min_history))
        .with_columns(lag_exprs(&config.lag_periods))
        .with_columns(rolling_exprs(&config.rolling_windows))
        .collect()
        .map_err(polars_err(STAGE))
}

/// Names of the lag and rolling columns produced for `config`, in output order.
pub fn feature_names(config: &PipelineConfig) -> Vec<String> {
    let lags = config
        .lag_periods
        .iter()
        .flat_map(|&k| MarketCol::SERIES.map(|c| lag_col(c, k)));
    let rolling = config
        .rolling_windows
        .iter()
        .flat_map(|&w| MarketCol::SERIES.map(|c| rolling_mean_col(c, w)));
    lags.chain(rolling).collect()
}

fn with_calendar(lf: LazyFrame) -> LazyFrame {
    let date = || col(MarketCol::Date).dt();
    let parts = [
        // polars numbers weekdays 1 (Monday) to 7 (Sunday)
        date().weekday().cast(DataType::Int32) - lit(1),
        date().month(),
        date().quarter(),
    ];
    lf.with_columns(
        MarketCol::CALENDAR
            .into_iter()
            .zip(parts)
            .map(|(c, part)| part.cast(c.dtype()).alias(c))
            .collect::<Vec<_>>(),
    )
}

pub(crate) fn sort_by_series(lf: LazyFrame) -> LazyFrame {
    lf.sort(
        [MarketCol::ProductName, MarketCol::Date],
        SortMultipleOptions::default().with_maintain_order(true),
    )
}

/// `true` for rows of products with at least `min_history` records.
pub(crate) fn has_min_history(min_history: usize) -> Expr {
    len()
        .over([col(MarketCol::ProductName)])
        .gt_eq(lit(min_history as u64))
}

fn lag_exprs(lag_periods: &[usize]) -> Vec<Expr> {
    lag_periods
        .iter()
        .flat_map(|&k| {
            MarketCol::SERIES.map(|c| {
                col(c)
                    .shift(lit(k as i64))
                    .over([col(MarketCol::ProductName)])
                    .alias(lag_col(c, k))
            })
        })
        .collect()
}

fn rolling_exprs(windows: &[usize]) -> Vec<Expr> {
    windows
        .iter()
        .flat_map(|&w| {
            MarketCol::SERIES.map(|c| {
                let options = RollingOptionsFixedWindow {
                    window_size: w,
                    min_periods: w, // Strict: no partial windows
                    weights: None,
                    center: false, // Trailing window only
                    fn_params: None,
                };
                col(c)
                    .rolling_mean(options)
                    .over([col(MarketCol::ProductName)])
                    .alias(rolling_mean_col(c, w))
            })
        })
        .collect()
}
