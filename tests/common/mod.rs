#![allow(dead_code)]

use std::{fs, path::Path, path::PathBuf};

use chrono::{Days, NaiveDate};
use polars::prelude::{CsvReadOptions, DataFrame, DataType, SerReader};
use serde_json::{Value, json};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A complete raw record with neutral values for everything but the series fields.
pub fn record(product: &str, date: NaiveDate, sales: f64, price: f64) -> Value {
    json!({
        "product_name": product,
        "date": date.format("%Y-%m-%d").to_string(),
        "region": "north",
        "brand": "acme",
        "category": "home",
        "seller": "shop-1",
        "sales_quantity": sales,
        "price": price,
        "original_price": price * 1.2,
        "discount_percentage": 10.0,
        "stock_level": 40.0 + sales,
        "customer_rating": 4.5,
        "review_count": 12.0,
        "delivery_days": 3.0,
        "is_weekend": false,
        "is_holiday": false,
    })
}

/// One record per consecutive day starting at `start`.
pub fn daily_series(product: &str, start: NaiveDate, sales: &[f64], price: &[f64]) -> Vec<Value> {
    sales
        .iter()
        .zip(price)
        .enumerate()
        .map(|(i, (&s, &p))| record(product, start + Days::new(i as u64), s, p))
        .collect()
}

/// A product with `n` daily records and slowly varying values.
pub fn varied_series(product: &str, start: NaiveDate, n: usize) -> Vec<Value> {
    let sales: Vec<f64> = (0..n).map(|i| 5.0 + (i * 7 % 11) as f64).collect();
    let price: Vec<f64> = (0..n).map(|i| 50.0 + (i % 5) as f64 * 2.5).collect();
    daily_series(product, start, &sales, &price)
}

pub fn write_input(dir: &Path, records: &[Value]) -> PathBuf {
    let path = dir.join("input.json");
    fs::write(&path, serde_json::to_vec(records).unwrap()).unwrap();
    path
}

/// Reads an output table back with polars' CSV reader.
pub fn read_csv(path: &Path) -> DataFrame {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .unwrap()
        .finish()
        .unwrap()
}

pub fn header(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect()
}

/// Column values as text; empty fields become empty strings.
pub fn strings(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect()
}

/// Column values as `f64`; empty fields are missing.
pub fn opt_floats(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

pub fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
    opt_floats(df, name)
        .into_iter()
        .map(|v| v.unwrap_or_else(|| panic!("missing value in {name}")))
        .collect()
}
