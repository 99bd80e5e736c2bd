use std::fs::File;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::SskError;
use crate::filter::{apply_filters, ConstraintSet};
use crate::generate::{generate_records, GeneratorConfig};
use crate::record::{micros_to_date, records_to_frame, Category, Region, SaleRecord};
use crate::schema::sale;

/// Immutable owner of the materialized sales frame.
///
/// Built once per session - from the generator, a typed record slice or a
/// CSV file - and handed by reference to the filter engine on every
/// interaction. There is no other copy of the data and nothing mutates it.
#[derive(Debug)]
pub struct SalesStore {
    frame: DataFrame,
}

impl SalesStore {
    /// Generate a synthetic dataset. Deterministic for a given config.
    pub fn generate(config: &GeneratorConfig) -> Result<Self, SskError> {
        let store = Self::from_records(&generate_records(config))?;
        tracing::info!(
            records = store.len(),
            seed = config.seed,
            "generated synthetic sales dataset"
        );
        Ok(store)
    }

    pub fn from_records(records: &[SaleRecord]) -> Result<Self, SskError> {
        Ok(Self { frame: records_to_frame(records)? })
    }

    /// Load a store from CSV.
    ///
    /// Requires the base columns (see `schema::sale::REQUIRED`); rows are
    /// re-constructed through `SaleRecord::new`, so the derived `revenue`
    /// and `month` columns always reflect the constructor's derivation and
    /// any stale values in the file are ignored. Dates may be "YYYY-MM-DD"
    /// or full timestamps as written by [`SalesStore::write_csv`].
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, SskError> {
        let raw = read_csv_as_strings(path.as_ref())?;
        require_columns(&raw, &sale::REQUIRED)?;
        let records = records_from_raw(&raw)?;
        let store = Self::from_records(&records)?;
        tracing::info!(
            records = store.len(),
            path = %path.as_ref().display(),
            "loaded sales dataset from csv"
        );
        Ok(store)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Filtered view of the store for one interaction.
    pub fn filter(&self, constraints: &ConstraintSet) -> Result<DataFrame, SskError> {
        apply_filters(&self.frame, constraints)
    }

    /// Observed (earliest, latest) sale date; `None` on an empty store.
    pub fn date_bounds(&self) -> Result<Option<(NaiveDate, NaiveDate)>, SskError> {
        let dates = self.frame.column(sale::DATE)?.as_materialized_series();
        let min = dates.min_reduce()?;
        let max = dates.max_reduce()?;
        let lower = match min.value() {
            AnyValue::Datetime(us, _, _) => micros_to_date(*us),
            _ => None,
        };
        let upper = match max.value() {
            AnyValue::Datetime(us, _, _) => micros_to_date(*us),
            _ => None,
        };
        Ok(lower.zip(upper))
    }

    /// Observed (lowest, highest) unit price; `None` on an empty store.
    pub fn price_bounds(&self) -> Result<Option<(f64, f64)>, SskError> {
        let prices = self.frame.column(sale::UNIT_PRICE)?.as_materialized_series();
        let min = prices.min_reduce()?;
        let max = prices.max_reduce()?;
        match (
            min.value().try_extract::<f64>(),
            max.value().try_extract::<f64>(),
        ) {
            (Ok(lower), Ok(upper)) => Ok(Some((lower, upper))),
            _ => Ok(None),
        }
    }

    /// Export the full dataset.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), SskError> {
        write_frame_csv(&self.frame, path)
    }
}

/// Write any frame (full or filtered) as CSV with a header row.
pub fn write_frame_csv(frame: &DataFrame, path: impl AsRef<Path>) -> Result<(), SskError> {
    let mut file = File::create(path.as_ref())?;
    let mut out = frame.clone();
    CsvWriter::new(&mut file).finish(&mut out)?;
    tracing::info!(
        rows = frame.height(),
        path = %path.as_ref().display(),
        "wrote csv export"
    );
    Ok(())
}

/// Read a CSV file with all columns as String dtype, trimming whitespace
/// from column names.
fn read_csv_as_strings(path: &Path) -> Result<DataFrame, SskError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    Ok(df)
}

fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), SskError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(SskError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

fn records_from_raw(raw: &DataFrame) -> Result<Vec<SaleRecord>, SskError> {
    let sale_ids = raw.column(sale::SALE_ID)?.as_materialized_series().str()?;
    let categories = raw.column(sale::CATEGORY)?.as_materialized_series().str()?;
    let regions = raw.column(sale::REGION)?.as_materialized_series().str()?;
    let dates = raw.column(sale::DATE)?.as_materialized_series().str()?;
    let prices = raw.column(sale::UNIT_PRICE)?.as_materialized_series().str()?;
    let quantities = raw.column(sale::QUANTITY)?.as_materialized_series().str()?;
    let discounts = raw.column(sale::DISCOUNT)?.as_materialized_series().str()?;
    let returned_flags = raw.column(sale::RETURNED)?.as_materialized_series().str()?;

    let mut records = Vec::with_capacity(raw.height());
    for i in 0..raw.height() {
        let sale_id: u32 = parse_field(sale_ids.get(i), sale::SALE_ID, i)?;
        let category = Category::parse(required_text(categories.get(i), sale::CATEGORY, i)?)?;
        let region = Region::parse(required_text(regions.get(i), sale::REGION, i)?)?;
        let date = parse_date(required_text(dates.get(i), sale::DATE, i)?, i)?;
        let unit_price: f64 = parse_field(prices.get(i), sale::UNIT_PRICE, i)?;
        let quantity: i64 = parse_field(quantities.get(i), sale::QUANTITY, i)?;
        let discount: f64 = parse_field(discounts.get(i), sale::DISCOUNT, i)?;
        let returned = parse_flag(required_text(returned_flags.get(i), sale::RETURNED, i)?, i)?;

        records.push(SaleRecord::new(
            sale_id, category, region, date, unit_price, quantity, discount, returned,
        ));
    }
    Ok(records)
}

fn required_text<'a>(
    value: Option<&'a str>,
    column: &str,
    row: usize,
) -> Result<&'a str, SskError> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| SskError::InvalidData(format!("Empty '{column}' at row {row}")))
}

fn parse_field<T: std::str::FromStr>(
    value: Option<&str>,
    column: &str,
    row: usize,
) -> Result<T, SskError> {
    let text = required_text(value, column, row)?;
    text.parse().map_err(|_| {
        SskError::InvalidData(format!("Bad '{column}' value '{text}' at row {row}"))
    })
}

fn parse_date(text: &str, row: usize) -> Result<NaiveDate, SskError> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt.date());
        }
    }
    Err(SskError::InvalidData(format!(
        "Bad 'date' value '{text}' at row {row}"
    )))
}

fn parse_flag(text: &str, row: usize) -> Result<bool, SskError> {
    match text {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" => Ok(false),
        other => Err(SskError::InvalidData(format!(
            "Bad 'returned' value '{other}' at row {row}"
        ))),
    }
}
