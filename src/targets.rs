use polars::prelude::{Column, DataFrame, IntoLazy, col, lit};
use rayon::prelude::*;

use crate::{
    config::PipelineConfig,
    error::{PipelineResult, ProcessingError},
    features::{has_min_history, sort_by_series},
    polars_ext::{DataFrameExt, all_present, polars_err},
    schema::MarketCol,
    series::{SeriesIndex, forward_window_sums},
};

const STAGE: &str = "targets";

/// Labels each row with forward-looking targets and drops rows that cannot be labeled.
///
/// - `price_target`: `price` exactly `horizon` rows later in the same series.
/// - `sales_target`: total `sales_quantity` of the same product over the
///   `horizon` days strictly after the row's date. Missing when the series does
///   not reach `date + horizon`.
///
/// Both targets read only later rows of the same product. Afterwards products
/// below `min_history` records are removed again, and so is every row missing
/// either target.
pub fn build_targets(df: &DataFrame, config: &PipelineConfig) -> PipelineResult<DataFrame> {
    let horizon = i32::try_from(config.horizon).map_err(|_| {
        ProcessingError::InvalidConfig(format!("horizon {} exceeds the day range", config.horizon))
    })?;

    let mut labeled = sort_by_series(df.clone().lazy())
        .with_column(
            col(MarketCol::Price)
                .shift(lit(-i64::from(horizon)))
                .over([col(MarketCol::ProductName)])
                .alias(MarketCol::PriceTarget),
        )
        .collect()
        .map_err(polars_err(STAGE))?;

    let sales_target = sales_targets(&labeled, horizon)?;
    labeled
        .with_column(Column::new(MarketCol::SalesTarget.name(), sales_target))
        .map_err(polars_err(STAGE))?;

    labeled
        .lazy()
        .filter(has_min_history(config.min_history))
        .filter(all_present(MarketCol::TARGETS))
        .collect()
        .map_err(polars_err(STAGE))
}

/// Computes the forward sales window per series and merges it back by row position.
fn sales_targets(df: &DataFrame, horizon: i32) -> PipelineResult<Vec<Option<f64>>> {
    let products = df.str_values(MarketCol::ProductName.as_str())?;
    let days = df.day_values()?;
    let sales = df.f64_values(MarketCol::SalesQuantity.as_str())?;
    let index = SeriesIndex::build(&products, &days);

    let per_series: Vec<Vec<(usize, Option<f64>)>> = index
        .series()
        .par_iter()
        .map(|(_, rows)| {
            let series_days: Vec<i32> = rows.iter().filter_map(|&r| days[r]).collect();
            let series_sales: Vec<Option<f64>> = rows.iter().map(|&r| sales[r]).collect();
            let sums = forward_window_sums(&series_days, &series_sales, horizon);
            rows.iter().copied().zip(sums).collect()
        })
        .collect();

    let mut merged = vec![None; df.height()];
    for (row, value) in per_series.into_iter().flatten() {
        merged[row] = value;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use polars::prelude::{NamedFrom, Series};

    use super::*;
    use crate::{error::PipelineError, features::build_features, polars_ext::date_column};

    const WIDGET_SALES: [f64; 10] = [10.0, 12.0, 9.0, 11.0, 13.0, 10.0, 14.0, 12.0, 15.0, 11.0];

    fn table(products: Vec<&str>, days: Vec<i32>, sales: Vec<f64>, price: Vec<f64>) -> DataFrame {
        DataFrame::new(vec![
            Column::new(MarketCol::ProductName.name(), products),
            date_column(MarketCol::Date, days.into_iter().map(Some).collect()).unwrap(),
            Series::new(MarketCol::SalesQuantity.name(), sales).into(),
            Series::new(MarketCol::Price.name(), price).into(),
        ])
        .unwrap()
    }

    fn widget(price: Vec<f64>) -> DataFrame {
        table(vec!["Widget"; 10], (0..10).collect(), WIDGET_SALES.to_vec(), price)
    }

    fn cfg() -> PipelineConfig {
        PipelineConfig::default().with_min_history(7)
    }

    #[test]
    fn widget_keeps_only_fully_labeled_rows() {
        let features = build_features(&widget(vec![100.0; 10]), &cfg()).unwrap();
        let labeled = build_targets(&features, &cfg()).unwrap();

        // Rows 3..=9 lack a row seven positions ahead, row 7 included.
        assert_eq!(labeled.height(), 3);
        assert_eq!(
            labeled.f64_values("price_target").unwrap(),
            vec![Some(100.0); 3]
        );
        assert_eq!(
            labeled.f64_values("sales_target").unwrap(),
            vec![Some(81.0), Some(84.0), Some(86.0)]
        );
    }

    #[test]
    fn price_target_is_seven_rows_ahead() {
        let price: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let labeled = build_targets(&widget(price), &cfg()).unwrap();
        assert_eq!(
            labeled.f64_values("price_target").unwrap(),
            vec![Some(107.0), Some(108.0), Some(109.0)]
        );
    }

    #[test]
    fn targets_ignore_the_past() {
        let base = build_targets(&widget(vec![100.0; 10]), &cfg()).unwrap();

        // Rewrite days 0 and 1; row 2 (day 2) and everything after stay as they were.
        let mut sales = WIDGET_SALES.to_vec();
        let mut price = vec![100.0; 10];
        sales[0] = 999.0;
        sales[1] = 999.0;
        price[0] = 1.0;
        price[1] = 1.0;
        let mutated = build_targets(
            &table(vec!["Widget"; 10], (0..10).collect(), sales, price),
            &cfg(),
        )
        .unwrap();

        for target in ["sales_target", "price_target"] {
            let before = base.f64_values(target).unwrap();
            let after = mutated.f64_values(target).unwrap();
            assert_eq!(before[2], after[2], "{target}");
        }
    }

    #[test]
    fn targets_never_cross_products() {
        // B shares A's dates but sells far more; A's labels must only see A.
        let days: Vec<i32> = (0..10).chain(0..10).collect();
        let mut products = vec!["A"; 10];
        products.extend(vec!["B"; 10]);
        let mut sales = vec![1.0; 10];
        sales.extend(vec![1000.0; 10]);
        let mut price = vec![10.0; 10];
        price.extend(vec![500.0; 10]);

        let labeled = build_targets(&table(products, days, sales, price), &cfg()).unwrap();
        let products = labeled.str_values("product_name").unwrap();
        let sales_target = labeled.f64_values("sales_target").unwrap();
        let price_target = labeled.f64_values("price_target").unwrap();

        for ((p, s), pt) in products.iter().zip(&sales_target).zip(&price_target) {
            if p.as_deref() == Some("A") {
                assert_eq!(*s, Some(7.0));
                assert_eq!(*pt, Some(10.0));
            }
        }
        assert_eq!(labeled.height(), 6);
    }

    #[test]
    fn oversized_horizon_is_rejected() {
        let cfg = PipelineConfig::default()
            .with_min_history(1)
            .with_horizon(u32::MAX as usize);
        let err = build_targets(&widget(vec![100.0; 10]), &cfg).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Processing(ProcessingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn same_day_rows_shift_by_position() {
        // A product listed twice on day 0 (e.g. two regions): the price shift
        // counts rows, the sales window counts days.
        let cfg = PipelineConfig::default().with_min_history(3).with_horizon(1);
        let labeled = build_targets(
            &table(vec!["A"; 3], vec![0, 0, 1], vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]),
            &cfg,
        )
        .unwrap();

        assert_eq!(
            labeled.f64_values("price_target").unwrap(),
            vec![Some(20.0), Some(30.0)]
        );
        assert_eq!(
            labeled.f64_values("sales_target").unwrap(),
            vec![Some(3.0), Some(3.0)]
        );
    }

    #[test]
    fn min_history_is_rechecked() {
        let labeled = build_targets(
            &table(vec!["Short"; 9], (0..9).collect(), vec![1.0; 9], vec![1.0; 9]),
            &PipelineConfig::default().with_min_history(10),
        )
        .unwrap();
        assert_eq!(labeled.height(), 0);
    }
}
