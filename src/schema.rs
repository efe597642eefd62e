use polars::prelude::{DataType, Expr, PlSmallStr, col};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The column vocabulary of the marketplace dataset.
///
/// Raw records, aggregated records and labeled records all share these names;
/// lag and rolling feature columns are derived from them via [`lag_col`] and
/// [`rolling_mean_col`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum MarketCol {
    // === Identity ===
    /// Grouping key of a product time series.
    ProductName,
    /// Calendar date of the observation.
    Date,
    Region,
    Brand,
    Category,
    Seller,

    // === Observed values ===
    /// Units sold. Summed on aggregation.
    SalesQuantity,
    Price,
    /// List price before discount. A value of exactly zero means "unset".
    OriginalPrice,
    DiscountPercentage,
    StockLevel,
    CustomerRating,
    ReviewCount,
    DeliveryDays,

    // === Flags ===
    IsWeekend,
    IsHoliday,

    // === Calendar features ===
    /// Monday = 0 ... Sunday = 6.
    DayOfWeek,
    Month,
    Quarter,

    // === Labels ===
    /// Price `horizon` rows ahead in the same series.
    PriceTarget,
    /// Units sold over the `horizon` days strictly after the row's date.
    SalesTarget,
}

/// How a column collapses when duplicate composite keys are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Mean,
    First,
}

impl From<MarketCol> for PlSmallStr {
    fn from(value: MarketCol) -> Self {
        value.as_str().into()
    }
}

impl From<MarketCol> for Expr {
    fn from(value: MarketCol) -> Self {
        col(value)
    }
}

impl MarketCol {
    /// Composite key of an aggregated record.
    pub const KEY: [Self; 5] = [
        Self::ProductName,
        Self::Date,
        Self::Region,
        Self::Brand,
        Self::Category,
    ];

    /// Fields coerced to `f64` and imputed per product.
    pub const NUMERIC: [Self; 8] = [
        Self::SalesQuantity,
        Self::Price,
        Self::OriginalPrice,
        Self::DiscountPercentage,
        Self::StockLevel,
        Self::CustomerRating,
        Self::ReviewCount,
        Self::DeliveryDays,
    ];

    /// Fields whose missing values become [`UNKNOWN`], in output order.
    pub const CATEGORICAL: [Self; 4] = [Self::Region, Self::Brand, Self::Category, Self::Seller];

    pub const FLAGS: [Self; 2] = [Self::IsWeekend, Self::IsHoliday];

    /// Fields standardized by the scaler, in artifact order.
    pub const SCALED: [Self; 7] = [
        Self::Price,
        Self::OriginalPrice,
        Self::DiscountPercentage,
        Self::StockLevel,
        Self::CustomerRating,
        Self::ReviewCount,
        Self::DeliveryDays,
    ];

    /// Fields that receive lag and rolling-mean features.
    pub const SERIES: [Self; 2] = [Self::SalesQuantity, Self::Price];

    pub const CALENDAR: [Self; 3] = [Self::DayOfWeek, Self::Month, Self::Quarter];

    pub const TARGETS: [Self; 2] = [Self::PriceTarget, Self::SalesTarget];

    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn dtype(&self) -> DataType {
        match self {
            Self::ProductName
            | Self::Region
            | Self::Brand
            | Self::Category
            | Self::Seller => DataType::String,

            Self::Date => DataType::Date,

            Self::SalesQuantity
            | Self::Price
            | Self::OriginalPrice
            | Self::DiscountPercentage
            | Self::StockLevel
            | Self::CustomerRating
            | Self::ReviewCount
            | Self::DeliveryDays
            | Self::PriceTarget
            | Self::SalesTarget => DataType::Float64,

            Self::IsWeekend | Self::IsHoliday => DataType::Boolean,

            Self::DayOfWeek | Self::Month | Self::Quarter => DataType::Int32,
        }
    }

    /// Aggregation rule, `None` for key and derived columns.
    pub fn reduction(&self) -> Option<Reduction> {
        match self {
            Self::SalesQuantity => Some(Reduction::Sum),

            Self::Price
            | Self::OriginalPrice
            | Self::DiscountPercentage
            | Self::StockLevel
            | Self::CustomerRating
            | Self::ReviewCount
            | Self::DeliveryDays => Some(Reduction::Mean),

            Self::Seller | Self::IsWeekend | Self::IsHoliday => Some(Reduction::First),

            Self::ProductName
            | Self::Date
            | Self::Region
            | Self::Brand
            | Self::Category
            | Self::DayOfWeek
            | Self::Month
            | Self::Quarter
            | Self::PriceTarget
            | Self::SalesTarget => None,
        }
    }
}

/// Placeholder for missing categorical values.
pub const UNKNOWN: &str = "unknown";

/// Name of the lag-`k` feature of `base`, e.g. `sales_quantity_lag_7`.
pub fn lag_col(base: MarketCol, k: usize) -> String {
    format!("{base}_lag_{k}")
}

/// Name of the rolling-mean feature of `base` over `window` rows, e.g. `price_rolling_mean_3`.
pub fn rolling_mean_col(base: MarketCol, window: usize) -> String {
    format!("{base}_rolling_mean_{window}")
}
