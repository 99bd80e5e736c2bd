//! Filtering and aggregation core for an interactive sales analytics view.
//!
//! The data flow is Record Store → Filter Engine → Aggregation Engine:
//! a [`store::SalesStore`] owns the immutable sales frame for a session,
//! [`filter::apply_filters`] reduces it to the rows matching a
//! [`filter::ConstraintSet`], and [`kpi::summarize`] / [`rollup::rollup`] /
//! [`chart_feed`] derive the metric bundle, grouped roll-ups and chart
//! payloads the rendering layer consumes. Every derivation is recomputed
//! fresh per interaction; nothing is cached across constraint changes.

pub mod chart_feed;
pub mod error;
pub mod filter;
pub mod generate;
pub mod kpi;
pub mod record;
pub mod rollup;
pub mod schema;
pub mod store;

pub use error::SskError;
pub use filter::{
    apply_filters, ConstraintSet, DateSpan, DateSpanInput, PriceBand, ReturnFilter, Selector,
};
pub use generate::{generate_records, GeneratorConfig};
pub use kpi::{summarize, KpiBundle};
pub use record::{records_to_frame, Category, Region, SaleRecord};
pub use rollup::{ranked, rollup, sorted_by_key, GroupKey, GroupTotal, Measure};
pub use store::{write_frame_csv, SalesStore};
