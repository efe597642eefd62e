use chrono::{Datelike, NaiveDate};
use polars::prelude::{
    Column, DataFrame, DataType, Expr, IntoColumn, NamedFrom, PolarsError, Series, lit,
};

use crate::{
    error::{PipelineError, PipelineResult, ProcessingError},
    schema::MarketCol,
};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01, the epoch of polars' `Date`.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Wraps a polars failure with the name of the stage it happened in.
pub(crate) fn polars_err(stage: &'static str) -> impl Fn(PolarsError) -> PipelineError {
    move |e| {
        ProcessingError::DataFrame {
            stage,
            message: e.to_string(),
        }
        .into()
    }
}

/// Converts a calendar date to the physical representation of a polars `Date`.
pub(crate) fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// `true` for rows where none of `cols` is null.
pub(crate) fn all_present<I>(cols: I) -> Expr
where
    I: IntoIterator,
    I::Item: Into<Expr>,
{
    cols.into_iter()
        .map(|c| c.into().is_not_null())
        .fold(lit(true), |acc, e| acc.and(e))
}

/// Builds a `Date` column named `name` from epoch-day values.
pub(crate) fn date_column(name: MarketCol, days: Vec<Option<i32>>) -> PipelineResult<Column> {
    let series = Series::new(name.name(), days)
        .cast(&name.dtype())
        .map_err(polars_err("date conversion"))?;
    Ok(series.into_column())
}

pub(crate) trait DataFrameExt {
    fn f64_values(&self, name: &str) -> PipelineResult<Vec<Option<f64>>>;

    fn str_values(&self, name: &str) -> PipelineResult<Vec<Option<String>>>;

    /// The `date` column as epoch days.
    fn day_values(&self) -> PipelineResult<Vec<Option<i32>>>;
}

impl DataFrameExt for DataFrame {
    fn f64_values(&self, name: &str) -> PipelineResult<Vec<Option<f64>>> {
        let column = self.column(name).map_err(polars_err("column access"))?;
        let ca = column.f64().map_err(polars_err("column access"))?;
        Ok(ca.into_iter().collect())
    }

    fn str_values(&self, name: &str) -> PipelineResult<Vec<Option<String>>> {
        let column = self.column(name).map_err(polars_err("column access"))?;
        let ca = column.str().map_err(polars_err("column access"))?;
        Ok(ca.into_iter().map(|v| v.map(str::to_owned)).collect())
    }

    fn day_values(&self) -> PipelineResult<Vec<Option<i32>>> {
        let physical = self
            .column(MarketCol::Date.as_str())
            .and_then(|c| c.cast(&DataType::Int32))
            .map_err(polars_err("column access"))?;
        let ca = physical.i32().map_err(polars_err("column access"))?;
        Ok(ca.into_iter().collect())
    }
}
