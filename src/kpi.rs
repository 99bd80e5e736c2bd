use polars::prelude::*;
use serde::Serialize;

use crate::error::SskError;
use crate::schema::sale;

/// The six headline metrics for a filtered view.
///
/// Every field is zero on an empty view - consumers render an explicit
/// "no data" state off `total_sales == 0` rather than treating the zeros as
/// measurements.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct KpiBundle {
    pub total_sales: u32,
    pub total_revenue: f64,
    /// Mean revenue per record.
    pub avg_order_value: f64,
    /// Percentage of records flagged returned.
    pub return_rate: f64,
    /// Mean discount as a percentage.
    pub avg_discount: f64,
    pub total_quantity: i64,
}

/// Compute the KPI bundle for a (typically filtered) frame.
///
/// Never mutates its input; calling it twice on the same frame gives the
/// same bundle.
pub fn summarize(frame: &DataFrame) -> Result<KpiBundle, SskError> {
    if frame.height() == 0 {
        return Ok(KpiBundle::default());
    }
    let total_sales = frame.height() as u32;

    let revenue = frame.column(sale::REVENUE)?.as_materialized_series();
    let revenue_sum = revenue.sum_reduce()?;
    let total_revenue = revenue_sum.value().try_extract::<f64>().unwrap_or(0.0);
    let revenue_mean = revenue.mean_reduce();
    let avg_order_value = revenue_mean.value().try_extract::<f64>().unwrap_or(0.0);

    let returned = frame.column(sale::RETURNED)?.as_materialized_series();
    let returned_sum = returned.sum_reduce()?;
    let returns = returned_sum.value().try_extract::<f64>().unwrap_or(0.0);
    let return_rate = 100.0 * returns / f64::from(total_sales);

    let discount = frame.column(sale::DISCOUNT)?.as_materialized_series();
    let discount_mean = discount.mean_reduce();
    let avg_discount = 100.0 * discount_mean.value().try_extract::<f64>().unwrap_or(0.0);

    let quantity = frame.column(sale::QUANTITY)?.as_materialized_series();
    let quantity_sum = quantity.sum_reduce()?;
    let total_quantity = quantity_sum.value().try_extract::<i64>().unwrap_or(0);

    Ok(KpiBundle {
        total_sales,
        total_revenue,
        avg_order_value,
        return_rate,
        avg_discount,
        total_quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{records_to_frame, Category, Region, SaleRecord};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid calendar date")
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_view_yields_all_zero_bundle() {
        let frame = records_to_frame(&[]).unwrap();
        let kpis = summarize(&frame).unwrap();
        assert_eq!(kpis, KpiBundle::default());
        assert_eq!(kpis.total_sales, 0);
        assert_eq!(kpis.total_revenue, 0.0);
        assert_eq!(kpis.avg_order_value, 0.0);
        assert_eq!(kpis.return_rate, 0.0);
        assert_eq!(kpis.avg_discount, 0.0);
        assert_eq!(kpis.total_quantity, 0);
    }

    #[test]
    fn bundle_matches_hand_computed_values() {
        let records = vec![
            SaleRecord::new(
                1,
                Category::Electronics,
                Region::North,
                date(2024, 1, 5),
                100.0,
                2,
                0.1,
                false,
            ),
            SaleRecord::new(
                3,
                Category::Electronics,
                Region::East,
                date(2024, 2, 1),
                200.0,
                1,
                0.2,
                false,
            ),
        ];
        let frame = records_to_frame(&records).unwrap();
        let kpis = summarize(&frame).unwrap();

        assert_eq!(kpis.total_sales, 2);
        assert!(close(kpis.total_revenue, 340.0));
        assert!(close(kpis.avg_order_value, 170.0));
        assert_eq!(kpis.return_rate, 0.0);
        assert!(close(kpis.avg_discount, 15.0));
        assert_eq!(kpis.total_quantity, 3);
    }

    #[test]
    fn return_rate_is_a_percentage_of_rows() {
        let records = vec![
            SaleRecord::new(
                1,
                Category::Home,
                Region::West,
                date(2024, 3, 1),
                10.0,
                1,
                0.0,
                true,
            ),
            SaleRecord::new(
                2,
                Category::Home,
                Region::West,
                date(2024, 3, 2),
                10.0,
                1,
                0.0,
                false,
            ),
            SaleRecord::new(
                3,
                Category::Home,
                Region::West,
                date(2024, 3, 3),
                10.0,
                1,
                0.0,
                false,
            ),
            SaleRecord::new(
                4,
                Category::Home,
                Region::West,
                date(2024, 3, 4),
                10.0,
                1,
                0.0,
                true,
            ),
        ];
        let frame = records_to_frame(&records).unwrap();
        let kpis = summarize(&frame).unwrap();
        assert!(close(kpis.return_rate, 50.0));
    }

    #[test]
    fn repeated_summaries_agree() {
        let records = vec![SaleRecord::new(
            1,
            Category::Beauty,
            Region::North,
            date(2024, 4, 1),
            19.99,
            3,
            0.05,
            false,
        )];
        let frame = records_to_frame(&records).unwrap();
        assert_eq!(summarize(&frame).unwrap(), summarize(&frame).unwrap());
    }
}
