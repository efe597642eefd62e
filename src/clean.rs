use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Weekday};
use polars::prelude::{Column, DataFrame, DataType, Expr, IntoLazy, col, lit, when};
use tracing::debug;

use crate::{
    config::{ImputationPolicy, PipelineConfig},
    error::{PipelineResult, SchemaError},
    polars_ext::{all_present, date_column, epoch_days, polars_err},
    schema::{MarketCol, UNKNOWN},
};

const STAGE: &str = "clean";

/// Normalizes types and handles missing data.
///
/// The output holds exactly the raw-record columns in canonical order:
/// key columns, seller, numeric fields, then flags. Rows without a product
/// name or a parseable date, and rows whose numeric fields remain missing
/// after imputation, are dropped.
///
/// # Errors
/// - [`SchemaError::MissingColumns`] if `product_name`, `date` or any numeric field is absent.
/// - [`SchemaError::Untyped`] if `date` is not textual.
pub fn clean(df: &DataFrame, config: &PipelineConfig) -> PipelineResult<DataFrame> {
    ensure_required_columns(df)?;

    let products = text_values(df, MarketCol::ProductName)?
        .map(|values| values.into_iter().map(non_blank).collect::<Vec<_>>())
        .unwrap_or_default();

    let dates = date_values(df)?;
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(epoch_days)).collect();

    let mut columns = Vec::with_capacity(MarketCol::KEY.len() + 1 + MarketCol::NUMERIC.len() + 2);
    columns.push(Column::new(MarketCol::ProductName.name(), products));
    columns.push(date_column(MarketCol::Date, days)?);

    for c in MarketCol::CATEGORICAL {
        let values: Vec<String> = match text_values(df, c)? {
            Some(values) => values
                .into_iter()
                .map(|v| non_blank(v).unwrap_or_else(|| UNKNOWN.to_string()))
                .collect(),
            None => vec![UNKNOWN.to_string(); df.height()],
        };
        columns.push(Column::new(c.name(), values));
    }

    for c in MarketCol::NUMERIC {
        let values = numeric_values(df, c)?;
        debug!(
            column = c.as_str(),
            missing = values.iter().filter(|v| v.is_none()).count(),
            "Coerced numeric field"
        );
        columns.push(Column::new(c.name(), values));
    }

    let is_weekend: Vec<Option<bool>> = match flag_values(df, MarketCol::IsWeekend)? {
        Some(values) => values
            .into_iter()
            .zip(&dates)
            .map(|(flag, date)| flag.or_else(|| date.map(falls_on_weekend)))
            .collect(),
        None => dates.iter().map(|d| d.map(falls_on_weekend)).collect(),
    };
    columns.push(Column::new(MarketCol::IsWeekend.name(), is_weekend));

    let is_holiday: Vec<bool> = match flag_values(df, MarketCol::IsHoliday)? {
        Some(values) => values.into_iter().map(|v| v.unwrap_or(false)).collect(),
        None => vec![false; df.height()],
    };
    columns.push(Column::new(MarketCol::IsHoliday.name(), is_holiday));

    let typed = DataFrame::new(columns).map_err(polars_err(STAGE))?;
    let rows_in = typed.height();

    let imputed = match config.imputation {
        ImputationPolicy::GroupMean => MarketCol::NUMERIC.map(group_mean_fill),
    };

    let cleaned = typed
        .lazy()
        .filter(all_present([MarketCol::ProductName, MarketCol::Date]))
        // A zero list price means "unset": take the row's own selling price.
        .with_column(
            when(col(MarketCol::OriginalPrice).eq(lit(0.0)))
                .then(col(MarketCol::Price))
                .otherwise(col(MarketCol::OriginalPrice))
                .alias(MarketCol::OriginalPrice),
        )
        .with_columns(imputed)
        .filter(all_present(MarketCol::NUMERIC))
        .collect()
        .map_err(polars_err(STAGE))?;

    debug!(
        dropped = rows_in - cleaned.height(),
        "Dropped rows without product, date or recoverable numeric values"
    );
    Ok(cleaned)
}

fn group_mean_fill(c: MarketCol) -> Expr {
    col(c)
        .fill_null(col(c).mean().over([col(MarketCol::ProductName)]))
        .alias(c)
}

fn ensure_required_columns(df: &DataFrame) -> PipelineResult<()> {
    let missing: Vec<String> = [MarketCol::ProductName, MarketCol::Date]
        .into_iter()
        .chain(MarketCol::NUMERIC)
        .filter(|c| df.column(c.as_str()).is_err())
        .map(|c| c.as_str().to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(missing).into())
    }
}

/// Parses the date formats seen in marketplace exports.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn falls_on_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn date_values(df: &DataFrame) -> PipelineResult<Vec<Option<NaiveDate>>> {
    let column = df
        .column(MarketCol::Date.as_str())
        .map_err(polars_err(STAGE))?;
    match column.dtype() {
        DataType::String => Ok(column
            .str()
            .map_err(polars_err(STAGE))?
            .into_iter()
            .map(|v| v.and_then(parse_date))
            .collect()),
        other => Err(SchemaError::Untyped {
            column: MarketCol::Date.to_string(),
            dtype: other.to_string(),
        }
        .into()),
    }
}

/// Textual view of a column, `None` if the column is absent.
fn text_values(df: &DataFrame, c: MarketCol) -> PipelineResult<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(c.as_str()) else {
        return Ok(None);
    };
    let text = column
        .cast(&DataType::String)
        .map_err(polars_err(STAGE))?;
    let values = text
        .str()
        .map_err(polars_err(STAGE))?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect();
    Ok(Some(values))
}

/// Coerces a column to `f64`. Values that fail to parse, and non-finite values, become missing.
fn numeric_values(df: &DataFrame, c: MarketCol) -> PipelineResult<Vec<Option<f64>>> {
    let column = df.column(c.as_str()).map_err(polars_err(STAGE))?;
    let values: Vec<Option<f64>> = match column.dtype() {
        DataType::String => column
            .str()
            .map_err(polars_err(STAGE))?
            .into_iter()
            .map(|v| v.and_then(parse_number))
            .collect(),
        _ => column
            .cast(&DataType::Float64)
            .map_err(polars_err(STAGE))?
            .f64()
            .map_err(polars_err(STAGE))?
            .into_iter()
            .collect(),
    };
    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

fn flag_values(df: &DataFrame, c: MarketCol) -> PipelineResult<Option<Vec<Option<bool>>>> {
    let Ok(column) = df.column(c.as_str()) else {
        return Ok(None);
    };
    let values = match column.dtype() {
        DataType::Boolean => column
            .bool()
            .map_err(polars_err(STAGE))?
            .into_iter()
            .collect(),
        DataType::String => column
            .str()
            .map_err(polars_err(STAGE))?
            .into_iter()
            .map(|v| v.and_then(parse_flag))
            .collect(),
        _ => column
            .cast(&DataType::Float64)
            .map_err(polars_err(STAGE))?
            .f64()
            .map_err(polars_err(STAGE))?
            .into_iter()
            .map(|v| v.map(|x| x != 0.0))
            .collect(),
    };
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::{error::PipelineError, loader::records_to_frame};

    fn record(product: &str, date: &str, sales: Value, price: Value) -> Value {
        json!({
            "product_name": product,
            "date": date,
            "region": "north",
            "brand": "acme",
            "category": "tools",
            "seller": "shop",
            "sales_quantity": sales,
            "price": price,
            "original_price": 120.0,
            "discount_percentage": 10.0,
            "stock_level": 50.0,
            "customer_rating": 4.5,
            "review_count": 12.0,
            "delivery_days": 2.0,
            "is_weekend": false,
            "is_holiday": false
        })
    }

    fn cleaned(records: Value) -> DataFrame {
        let raw = records_to_frame(records).unwrap();
        clean(&raw, &PipelineConfig::default()).unwrap()
    }

    fn f64s(df: &DataFrame, c: MarketCol) -> Vec<Option<f64>> {
        df.column(c.as_str()).unwrap().f64().unwrap().into_iter().collect()
    }

    #[test]
    fn group_mean_fills_within_product_only() {
        let df = cleaned(json!([
            record("A", "2025-01-01", json!(10), json!(100.0)),
            record("A", "2025-01-02", json!("bad"), json!(null)),
            record("A", "2025-01-03", json!(20), json!(200.0)),
            record("B", "2025-01-01", json!(1000), json!(5.0)),
        ]));

        assert_eq!(df.height(), 4);
        // A's mean of 10 and 20, never influenced by B.
        assert_eq!(
            f64s(&df, MarketCol::SalesQuantity),
            vec![Some(10.0), Some(15.0), Some(20.0), Some(1000.0)]
        );
        assert_eq!(
            f64s(&df, MarketCol::Price),
            vec![Some(100.0), Some(150.0), Some(200.0), Some(5.0)]
        );
    }

    #[test]
    fn unrecoverable_rows_are_dropped() {
        // B has no usable price at all, so its rows cannot be imputed.
        let df = cleaned(json!([
            record("A", "2025-01-01", json!(1), json!(100.0)),
            record("B", "2025-01-01", json!(2), json!("n/a")),
            record("B", "2025-01-02", json!(3), json!(null)),
            record("C", "not a date", json!(4), json!(1.0)),
            record("", "2025-01-01", json!(5), json!(1.0)),
        ]));

        let products: Vec<Option<&str>> = df
            .column("product_name")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(products, vec![Some("A")]);
    }

    #[test]
    fn zero_original_price_takes_row_price() {
        let mut first = record("A", "2025-01-01", json!(1), json!(80.0));
        first["original_price"] = json!(0);
        let second = record("A", "2025-01-02", json!(1), json!(90.0));

        let df = cleaned(json!([first, second]));
        assert_eq!(
            f64s(&df, MarketCol::OriginalPrice),
            vec![Some(80.0), Some(120.0)]
        );
    }

    #[test]
    fn categorical_gaps_become_unknown() {
        let mut r = record("A", "2025-01-01", json!(1), json!(1.0));
        r["brand"] = Value::Null;
        r["region"] = json!("  ");
        r.as_object_mut().unwrap().remove("seller");

        let df = cleaned(json!([r]));
        for c in [MarketCol::Brand, MarketCol::Region, MarketCol::Seller] {
            let v = df.column(c.as_str()).unwrap().str().unwrap().get(0);
            assert_eq!(v, Some(UNKNOWN), "{c}");
        }
        assert_eq!(
            df.column("category").unwrap().str().unwrap().get(0),
            Some("tools")
        );
    }

    #[test]
    fn missing_flags_are_derived() {
        let mut saturday = record("A", "2025-03-22", json!(1), json!(1.0));
        saturday["is_weekend"] = Value::Null;
        saturday["is_holiday"] = Value::Null;
        let mut monday = record("A", "2025-03-24T08:30:00Z", json!(1), json!(1.0));
        monday["is_weekend"] = json!("false");

        let df = cleaned(json!([saturday, monday]));
        let weekend: Vec<Option<bool>> = df.column("is_weekend").unwrap().bool().unwrap().into_iter().collect();
        let holiday: Vec<Option<bool>> = df.column("is_holiday").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(weekend, vec![Some(true), Some(false)]);
        assert_eq!(holiday, vec![Some(false), Some(false)]);
    }

    #[test]
    fn absent_numeric_column_is_a_schema_error() {
        let mut r = record("A", "2025-01-01", json!(1), json!(1.0));
        r.as_object_mut().unwrap().remove("delivery_days");
        let raw = records_to_frame(json!([r])).unwrap();

        let err = clean(&raw, &PipelineConfig::default()).unwrap_err();
        match err {
            PipelineError::Schema(SchemaError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["delivery_days".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn numeric_date_column_is_untyped() {
        let mut raw = records_to_frame(json!([{"product_name": "A", "date": 20250101}])).unwrap();
        for c in MarketCol::NUMERIC {
            raw.with_column(Column::new(c.name(), [1.0])).unwrap();
        }
        let err = clean(&raw, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(SchemaError::Untyped { .. })));
    }

    #[test]
    fn parses_common_date_layouts() {
        let want = NaiveDate::from_ymd_opt(2025, 3, 20);
        assert_eq!(parse_date("2025-03-20"), want);
        assert_eq!(parse_date("2025-03-20T10:00:00+00:00"), want);
        assert_eq!(parse_date("2025-03-20T10:00:00"), want);
        assert_eq!(parse_date("2025-03-20 10:00:00.250"), want);
        assert_eq!(parse_date("20/03/2025"), None);
    }
}
