use chrono::{NaiveDate, NaiveTime};
use polars::datatypes::TimeUnit;
use polars::prelude::*;
use serde::Serialize;

use crate::error::SskError;
use crate::schema::sale;

/// Product category. Closed set - unknown values are rejected at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Electronics,
    Clothing,
    Home,
    Beauty,
    Sports,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electronics,
        Category::Clothing,
        Category::Home,
        Category::Beauty,
        Category::Sports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Clothing => "Clothing",
            Category::Home => "Home",
            Category::Beauty => "Beauty",
            Category::Sports => "Sports",
        }
    }

    pub fn parse(value: &str) -> Result<Self, SskError> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| SskError::InvalidData(format!("Unknown category: '{value}'")))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sales region. Closed set - unknown values are rejected at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Region {
    North,
    South,
    East,
    West,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::North, Region::South, Region::East, Region::West];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::North => "North",
            Region::South => "South",
            Region::East => "East",
            Region::West => "West",
        }
    }

    pub fn parse(value: &str) -> Result<Self, SskError> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == value)
            .ok_or_else(|| SskError::InvalidData(format!("Unknown region: '{value}'")))
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sale event. Immutable once constructed.
///
/// `revenue` is derived exactly once here; nothing downstream recomputes it,
/// so repeated aggregation over the same rows is idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub sale_id: u32,
    pub category: Category,
    pub region: Region,
    pub date: NaiveDate,
    pub unit_price: f64,
    pub quantity: i64,
    pub discount: f64,
    pub revenue: f64,
    pub returned: bool,
}

impl SaleRecord {
    /// Build a record, deriving `revenue = unit_price * quantity * (1 - discount)`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sale_id: u32,
        category: Category,
        region: Region,
        date: NaiveDate,
        unit_price: f64,
        quantity: i64,
        discount: f64,
        returned: bool,
    ) -> Self {
        let revenue = unit_price * quantity as f64 * (1.0 - discount);
        Self {
            sale_id,
            category,
            region,
            date,
            unit_price,
            quantity,
            discount,
            revenue,
            returned,
        }
    }

    /// Month label used for monthly roll-ups, e.g. "2024-01".
    pub fn month_label(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

/// Midnight timestamp of `date` in microseconds since the epoch.
/// Frame dates carry no time component; every stamp is a midnight stamp.
pub(crate) fn midnight_micros(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_micros()
}

pub(crate) fn micros_to_date(us: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp_micros(us).map(|dt| dt.date_naive())
}

/// Assemble a frame from typed records.
///
/// Derived columns (`month`, `revenue`) come straight off the records; the
/// `date` column is cast to Datetime[us] with midnight stamps and `returned`
/// is stored as a 0/1 flag.
pub fn records_to_frame(records: &[SaleRecord]) -> Result<DataFrame, SskError> {
    let n = records.len();
    let mut sale_ids: Vec<i64> = Vec::with_capacity(n);
    let mut categories: Vec<String> = Vec::with_capacity(n);
    let mut regions: Vec<String> = Vec::with_capacity(n);
    let mut dates: Vec<i64> = Vec::with_capacity(n);
    let mut months: Vec<String> = Vec::with_capacity(n);
    let mut unit_prices: Vec<f64> = Vec::with_capacity(n);
    let mut quantities: Vec<i64> = Vec::with_capacity(n);
    let mut discounts: Vec<f64> = Vec::with_capacity(n);
    let mut revenues: Vec<f64> = Vec::with_capacity(n);
    let mut returned: Vec<i32> = Vec::with_capacity(n);

    for record in records {
        sale_ids.push(record.sale_id as i64);
        categories.push(record.category.as_str().to_string());
        regions.push(record.region.as_str().to_string());
        dates.push(midnight_micros(record.date));
        months.push(record.month_label());
        unit_prices.push(record.unit_price);
        quantities.push(record.quantity);
        discounts.push(record.discount);
        revenues.push(record.revenue);
        returned.push(i32::from(record.returned));
    }

    let frame = DataFrame::new(vec![
        Column::new(sale::SALE_ID.into(), &sale_ids),
        Column::new(sale::CATEGORY.into(), &categories),
        Column::new(sale::REGION.into(), &regions),
        Column::new(sale::DATE.into(), &dates),
        Column::new(sale::MONTH.into(), &months),
        Column::new(sale::UNIT_PRICE.into(), &unit_prices),
        Column::new(sale::QUANTITY.into(), &quantities),
        Column::new(sale::DISCOUNT.into(), &discounts),
        Column::new(sale::REVENUE.into(), &revenues),
        Column::new(sale::RETURNED.into(), &returned),
    ])?
    .lazy()
    .with_columns([
        col(sale::DATE).cast(DataType::Datetime(TimeUnit::Microseconds, None)),
    ])
    .collect()?;

    Ok(frame)
}
