use std::cmp::Ordering;
use std::collections::HashMap;

use polars::prelude::*;
use serde::Serialize;

use crate::error::SskError;
use crate::record::micros_to_date;
use crate::schema::sale;

/// Grouping dimension for roll-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Category,
    Region,
    /// Year-month of the sale date, e.g. "2024-01".
    Month,
    /// The sale date itself, labelled as "YYYY-MM-DD".
    Date,
}

/// Aggregate computed per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    RevenueSum,
    QuantitySum,
    ReturnsSum,
    Count,
}

/// One group and its aggregate value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub value: f64,
}

/// Roll a frame up by `key`, aggregating `measure` per group.
///
/// Groups appear in order of first occurrence in the frame; an empty frame
/// produces an empty vector. Use [`ranked`] or [`sorted_by_key`] when a
/// consumer needs a specific ordering.
pub fn rollup(
    frame: &DataFrame,
    key: GroupKey,
    measure: Measure,
) -> Result<Vec<GroupTotal>, SskError> {
    let labels = group_labels(frame, key)?;
    let weights = measure_values(frame, measure)?;

    let mut totals: Vec<GroupTotal> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (label, weight) in labels.into_iter().zip(weights) {
        match index.get(&label) {
            Some(&slot) => totals[slot].value += weight,
            None => {
                index.insert(label.clone(), totals.len());
                totals.push(GroupTotal { key: label, value: weight });
            }
        }
    }
    Ok(totals)
}

/// Descending by aggregate value, for top-N style displays.
pub fn ranked(mut totals: Vec<GroupTotal>) -> Vec<GroupTotal> {
    totals.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    totals
}

/// Ascending by group label. Month ("YYYY-MM") and date ("YYYY-MM-DD")
/// labels sort chronologically this way.
pub fn sorted_by_key(mut totals: Vec<GroupTotal>) -> Vec<GroupTotal> {
    totals.sort_by(|a, b| a.key.cmp(&b.key));
    totals
}

fn group_labels(frame: &DataFrame, key: GroupKey) -> Result<Vec<String>, SskError> {
    match key {
        GroupKey::Category => string_labels(frame, sale::CATEGORY),
        GroupKey::Region => string_labels(frame, sale::REGION),
        GroupKey::Month => string_labels(frame, sale::MONTH),
        GroupKey::Date => {
            let dates = frame.column(sale::DATE)?.as_materialized_series();
            let mut labels = Vec::with_capacity(frame.height());
            for i in 0..frame.height() {
                let label = match dates.get(i) {
                    Ok(AnyValue::Datetime(us, _, _)) => micros_to_date(us)
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                labels.push(label);
            }
            Ok(labels)
        }
    }
}

fn string_labels(frame: &DataFrame, column: &str) -> Result<Vec<String>, SskError> {
    let values = frame.column(column)?.as_materialized_series().str()?;
    Ok((0..frame.height())
        .map(|i| values.get(i).unwrap_or("").to_string())
        .collect())
}

fn measure_values(frame: &DataFrame, measure: Measure) -> Result<Vec<f64>, SskError> {
    let n = frame.height();
    let values = match measure {
        Measure::Count => vec![1.0; n],
        Measure::RevenueSum => {
            let revenue = frame.column(sale::REVENUE)?.as_materialized_series().f64()?;
            (0..n).map(|i| revenue.get(i).unwrap_or(0.0)).collect()
        }
        Measure::QuantitySum => {
            let quantity = frame.column(sale::QUANTITY)?.as_materialized_series().i64()?;
            (0..n).map(|i| quantity.get(i).unwrap_or(0) as f64).collect()
        }
        Measure::ReturnsSum => {
            let returned = frame.column(sale::RETURNED)?.as_materialized_series().i32()?;
            (0..n).map(|i| f64::from(returned.get(i).unwrap_or(0))).collect()
        }
    };
    Ok(values)
}
