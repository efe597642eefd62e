use std::collections::BTreeMap;

/// Maps each product to the row positions of its series, in chronological order.
///
/// The index only owns positions; values stay in the table. Rows without a
/// product or a date belong to no series.
#[derive(Debug, Clone, Default)]
pub struct SeriesIndex {
    series: Vec<(String, Vec<usize>)>,
}

impl SeriesIndex {
    pub fn build(products: &[Option<String>], days: &[Option<i32>]) -> Self {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (row, (product, day)) in products.iter().zip(days).enumerate() {
            if let (Some(product), Some(_)) = (product, day) {
                groups.entry(product.as_str()).or_default().push(row);
            }
        }

        let series = groups
            .into_iter()
            .map(|(product, mut rows)| {
                // Stable: rows sharing a date keep their table order.
                rows.sort_by_key(|&row| days[row]);
                (product.to_string(), rows)
            })
            .collect();

        Self { series }
    }

    /// Series ordered by product name.
    pub fn series(&self) -> &[(String, Vec<usize>)] {
        &self.series
    }

}

/// Sum of `values` over the dates in `(day, day + horizon]` for each position of one series.
///
/// `days` must be sorted ascending and `horizon` non-negative. A position whose window reaches past the
/// last observed date has no complete forward window and yields `None`, as
/// does a window containing a missing value. The position's own date never
/// contributes, including other rows that share it.
pub fn forward_window_sums(days: &[i32], values: &[Option<f64>], horizon: i32) -> Vec<Option<f64>> {
    let Some(&last) = days.last() else {
        return Vec::new();
    };

    days.iter()
        .map(|&day| {
            let end = i64::from(day) + i64::from(horizon);
            if horizon < 0 || i64::from(last) < end {
                return None;
            }
            let start = days.partition_point(|&d| d <= day);
            let stop = days.partition_point(|&d| i64::from(d) <= end);
            values[start..stop].iter().copied().sum::<Option<f64>>()
        })
        .collect()
}
