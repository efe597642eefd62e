use chrono::NaiveDate;
use polars::prelude::{DataFrame, DataType, Expr, IntoLazy, col, lit};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::PipelineResult,
    io::{Table, TableName},
    polars_ext::{epoch_days, polars_err},
    schema::MarketCol,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum PartitionKind {
    /// Rows dated strictly before the cutoff.
    Train,
    /// Rows dated on or after the cutoff.
    Test,
}

/// One side of the train/test split.
#[derive(Debug, Clone)]
pub struct Partition {
    kind: PartitionKind,
    df: DataFrame,
}

impl Partition {
    pub fn kind(&self) -> PartitionKind {
        self.kind
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }
}

impl Table for Partition {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

impl TableName for Partition {
    fn base_name(&self) -> String {
        format!("{}_data", self.kind)
    }
}

#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Partition,
    pub test: Partition,
}

impl TrainTestSplit {
    pub fn partitions(&self) -> [&Partition; 2] {
        [&self.train, &self.test]
    }
}

/// Splits rows by date: `date < cutoff` is train, `date >= cutoff` is test.
pub fn split_by_cutoff(df: &DataFrame, cutoff: NaiveDate) -> PipelineResult<TrainTestSplit> {
    let partition = |kind: PartitionKind| -> PipelineResult<Partition> {
        let df = df
            .clone()
            .lazy()
            .filter(in_partition(kind, cutoff))
            .collect()
            .map_err(polars_err("split"))?;
        Ok(Partition { kind, df })
    };

    Ok(TrainTestSplit {
        train: partition(PartitionKind::Train)?,
        test: partition(PartitionKind::Test)?,
    })
}

fn in_partition(kind: PartitionKind, cutoff: NaiveDate) -> Expr {
    let day = col(MarketCol::Date).cast(DataType::Int32);
    let boundary = lit(epoch_days(cutoff));
    match kind {
        PartitionKind::Train => day.lt(boundary),
        PartitionKind::Test => day.gt_eq(boundary),
    }
}
