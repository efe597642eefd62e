use polars::prelude::{DataFrame, Expr, IntoLazy, col};
use strum::IntoEnumIterator;

use crate::{
    error::PipelineResult,
    polars_ext::polars_err,
    schema::{MarketCol, Reduction},
};

/// Collapses rows sharing `(product_name, date, region, brand, category)` into one.
///
/// Sales are summed, price and quality metrics averaged, and seller/flags take
/// the first value observed in the group. Groups keep the order in which their
/// key first appears, so re-aggregating an aggregated table returns it unchanged.
pub fn aggregate(df: &DataFrame) -> PipelineResult<DataFrame> {
    df.clone()
        .lazy()
        .group_by_stable(MarketCol::KEY.map(col))
        .agg(reductions())
        .collect()
        .map_err(polars_err("aggregate"))
}

fn reductions() -> Vec<Expr> {
    MarketCol::iter()
        .filter_map(|c| {
            c.reduction().map(|r| match r {
                Reduction::Sum => col(c).sum(),
                Reduction::Mean => col(c).mean(),
                Reduction::First => col(c).first(),
            })
        })
        .collect()
}
