use chrono::NaiveDate;
use polars::prelude::*;

use crate::error::SskError;
use crate::record::{midnight_micros, Category, Region};
use crate::schema::sale;
use crate::store::SalesStore;

/// Tagged selector: either no constraint or exactly one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<T> {
    Any,
    Exactly(T),
}

/// Return-status predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnFilter {
    Any,
    ReturnedOnly,
    NotReturned,
}

/// Raw date input as delivered by a date control: either a single day or an
/// ordered pair of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpanInput {
    Single(NaiveDate),
    Pair(NaiveDate, NaiveDate),
}

/// Inclusive date range with `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    lower: NaiveDate,
    upper: NaiveDate,
}

impl DateSpan {
    /// A reversed pair is swapped rather than rejected.
    pub fn new(lower: NaiveDate, upper: NaiveDate) -> Self {
        if upper < lower {
            Self { lower: upper, upper: lower }
        } else {
            Self { lower, upper }
        }
    }

    /// Degenerate span covering exactly one day.
    pub fn single(day: NaiveDate) -> Self {
        Self { lower: day, upper: day }
    }

    /// Total normalization of raw control input: a lone value becomes a
    /// single-day span, a pair becomes the span over both bounds.
    pub fn from_input(input: DateSpanInput) -> Self {
        match input {
            DateSpanInput::Single(day) => Self::single(day),
            DateSpanInput::Pair(lower, upper) => Self::new(lower, upper),
        }
    }

    pub fn lower(&self) -> NaiveDate {
        self.lower
    }

    pub fn upper(&self) -> NaiveDate {
        self.upper
    }
}

/// Inclusive unit-price band with `lower <= upper`. Bounds are compared
/// exactly; records priced exactly at a bound are kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    lower: f64,
    upper: f64,
}

impl PriceBand {
    pub fn new(lower: f64, upper: f64) -> Self {
        if upper < lower {
            Self { lower: upper, upper: lower }
        } else {
            Self { lower, upper }
        }
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }
}

/// The active filter. All predicates are combined conjunctively.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    pub category: Selector<Category>,
    pub region: Selector<Region>,
    pub dates: DateSpan,
    pub prices: PriceBand,
    pub returns: ReturnFilter,
}

impl ConstraintSet {
    /// The match-everything constraint for a store: `Any` selectors plus the
    /// store's observed date and price bounds, mirroring a control surface's
    /// initial state. An empty store yields degenerate zero bounds, which is
    /// harmless since there is nothing to match.
    pub fn pass_through(store: &SalesStore) -> Result<Self, SskError> {
        let (date_lo, date_hi) = store
            .date_bounds()?
            .unwrap_or((NaiveDate::default(), NaiveDate::default()));
        let (price_lo, price_hi) = store.price_bounds()?.unwrap_or((0.0, 0.0));
        Ok(Self {
            category: Selector::Any,
            region: Selector::Any,
            dates: DateSpan::new(date_lo, date_hi),
            prices: PriceBand::new(price_lo, price_hi),
            returns: ReturnFilter::Any,
        })
    }
}

/// Filter a frame down to the rows matching every active predicate.
///
/// Pure with respect to its inputs: the source frame is untouched and row
/// order is preserved. An all-excluding constraint yields an empty frame,
/// not an error.
pub fn apply_filters(
    frame: &DataFrame,
    constraints: &ConstraintSet,
) -> Result<DataFrame, SskError> {
    let mut predicate = lit(true);

    if let Selector::Exactly(category) = constraints.category {
        predicate = predicate.and(col(sale::CATEGORY).eq(lit(category.as_str())));
    }

    if let Selector::Exactly(region) = constraints.region {
        predicate = predicate.and(col(sale::REGION).eq(lit(region.as_str())));
    }

    let lower_us = midnight_micros(constraints.dates.lower());
    let upper_us = midnight_micros(constraints.dates.upper());
    predicate = predicate
        .and(col(sale::DATE).gt_eq(lit(lower_us)))
        .and(col(sale::DATE).lt_eq(lit(upper_us)));

    predicate = predicate
        .and(col(sale::UNIT_PRICE).gt_eq(lit(constraints.prices.lower())))
        .and(col(sale::UNIT_PRICE).lt_eq(lit(constraints.prices.upper())));

    match constraints.returns {
        ReturnFilter::Any => {}
        ReturnFilter::ReturnedOnly => {
            predicate = predicate.and(col(sale::RETURNED).eq(lit(1i32)));
        }
        ReturnFilter::NotReturned => {
            predicate = predicate.and(col(sale::RETURNED).eq(lit(0i32)));
        }
    }

    let filtered = frame.clone().lazy().filter(predicate).collect()?;
    tracing::debug!(
        input_rows = frame.height(),
        matched_rows = filtered.height(),
        "applied constraint set"
    );
    Ok(filtered)
}
