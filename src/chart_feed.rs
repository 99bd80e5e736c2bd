/// Chart-feed derivations consumed by the rendering collaborator.
///
/// Every function here is a pure derivation over a filtered frame: raw value
/// series for distribution plots, ordered group totals for bar/line/pie
/// charts, per-category composites and a correlation matrix. Nothing is
/// cached; a fresh frame in, a fresh payload out. All payload types
/// serialize for whatever chart layer sits on the other side.
use polars::prelude::*;
use serde::Serialize;

use crate::error::SskError;
use crate::rollup::{ranked, rollup, sorted_by_key, GroupKey, GroupTotal, Measure};
use crate::schema::sale;

/// Raw (category, unit_price) pair for per-category price plots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub category: String,
    pub unit_price: f64,
}

/// Raw scatter point relating discount to revenue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountRevenuePoint {
    pub discount: f64,
    pub revenue: f64,
    pub category: String,
    pub quantity: i64,
}

/// Revenue, quantity and return sums for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPerformance {
    pub category: String,
    pub revenue: f64,
    pub quantity: i64,
    pub returns: i64,
}

/// Revenue total for one (region, category) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCategoryRevenue {
    pub region: String,
    pub category: String,
    pub revenue: f64,
}

/// Pearson correlations over the numeric sale metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

const CORRELATION_COLUMNS: [&str; 4] = [
    sale::UNIT_PRICE,
    sale::QUANTITY,
    sale::DISCOUNT,
    sale::REVENUE,
];

/// Revenue per month, ascending by month.
pub fn revenue_by_month(frame: &DataFrame) -> Result<Vec<GroupTotal>, SskError> {
    Ok(sorted_by_key(rollup(frame, GroupKey::Month, Measure::RevenueSum)?))
}

/// Revenue per category, descending by revenue.
pub fn revenue_by_category(frame: &DataFrame) -> Result<Vec<GroupTotal>, SskError> {
    Ok(ranked(rollup(frame, GroupKey::Category, Measure::RevenueSum)?))
}

/// Raw unit prices for histogram binning.
pub fn price_distribution(frame: &DataFrame) -> Result<Vec<f64>, SskError> {
    float_values(frame, sale::UNIT_PRICE)
}

/// Raw (category, unit_price) pairs for box plots.
pub fn price_by_category(frame: &DataFrame) -> Result<Vec<PricePoint>, SskError> {
    let categories = frame.column(sale::CATEGORY)?.as_materialized_series().str()?;
    let prices = frame.column(sale::UNIT_PRICE)?.as_materialized_series().f64()?;
    Ok((0..frame.height())
        .map(|i| PricePoint {
            category: categories.get(i).unwrap_or("").to_string(),
            unit_price: prices.get(i).unwrap_or(0.0),
        })
        .collect())
}

/// Record count per region, descending by count.
pub fn region_counts(frame: &DataFrame) -> Result<Vec<GroupTotal>, SskError> {
    Ok(ranked(rollup(frame, GroupKey::Region, Measure::Count)?))
}

/// Raw discount/revenue scatter points, carrying category and quantity for
/// color and size encodings.
pub fn discount_revenue(frame: &DataFrame) -> Result<Vec<DiscountRevenuePoint>, SskError> {
    let discounts = frame.column(sale::DISCOUNT)?.as_materialized_series().f64()?;
    let revenues = frame.column(sale::REVENUE)?.as_materialized_series().f64()?;
    let categories = frame.column(sale::CATEGORY)?.as_materialized_series().str()?;
    let quantities = frame.column(sale::QUANTITY)?.as_materialized_series().i64()?;
    Ok((0..frame.height())
        .map(|i| DiscountRevenuePoint {
            discount: discounts.get(i).unwrap_or(0.0),
            revenue: revenues.get(i).unwrap_or(0.0),
            category: categories.get(i).unwrap_or("").to_string(),
            quantity: quantities.get(i).unwrap_or(0),
        })
        .collect())
}

/// Return count per category, descending.
pub fn returns_by_category(frame: &DataFrame) -> Result<Vec<GroupTotal>, SskError> {
    Ok(ranked(rollup(frame, GroupKey::Category, Measure::ReturnsSum)?))
}

/// Raw quantities for histogram binning.
pub fn quantity_distribution(frame: &DataFrame) -> Result<Vec<i64>, SskError> {
    let quantities = frame.column(sale::QUANTITY)?.as_materialized_series().i64()?;
    Ok((0..frame.height())
        .map(|i| quantities.get(i).unwrap_or(0))
        .collect())
}

/// Sales count per day, ascending by date.
pub fn sales_by_day(frame: &DataFrame) -> Result<Vec<GroupTotal>, SskError> {
    Ok(sorted_by_key(rollup(frame, GroupKey::Date, Measure::Count)?))
}

/// Revenue, quantity and returns per category, ascending by category name.
pub fn category_performance(frame: &DataFrame) -> Result<Vec<CategoryPerformance>, SskError> {
    let categories = frame.column(sale::CATEGORY)?.as_materialized_series().str()?;
    let revenues = frame.column(sale::REVENUE)?.as_materialized_series().f64()?;
    let quantities = frame.column(sale::QUANTITY)?.as_materialized_series().i64()?;
    let returned = frame.column(sale::RETURNED)?.as_materialized_series().i32()?;

    let mut rows: Vec<CategoryPerformance> = Vec::new();
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for i in 0..frame.height() {
        let category = categories.get(i).unwrap_or("").to_string();
        let slot = match index.get(&category) {
            Some(&slot) => slot,
            None => {
                index.insert(category.clone(), rows.len());
                rows.push(CategoryPerformance {
                    category,
                    revenue: 0.0,
                    quantity: 0,
                    returns: 0,
                });
                rows.len() - 1
            }
        };
        rows[slot].revenue += revenues.get(i).unwrap_or(0.0);
        rows[slot].quantity += quantities.get(i).unwrap_or(0);
        rows[slot].returns += i64::from(returned.get(i).unwrap_or(0));
    }
    rows.sort_by(|a, b| a.category.cmp(&b.category));
    Ok(rows)
}

/// Pearson correlation matrix over unit_price, quantity, discount, revenue.
///
/// Off-diagonal coefficients collapse to 0.0 when a column has no variance
/// or fewer than two rows are present; an empty frame yields the all-zero
/// matrix. No NaN ever leaves this function.
pub fn correlation_matrix(frame: &DataFrame) -> Result<CorrelationMatrix, SskError> {
    let series: Vec<Vec<f64>> = CORRELATION_COLUMNS
        .iter()
        .map(|column| numeric_values(frame, column))
        .collect::<Result<_, _>>()?;

    let n = frame.height();
    let mut values = vec![vec![0.0; series.len()]; series.len()];
    for i in 0..series.len() {
        for j in 0..series.len() {
            values[i][j] = if n == 0 {
                0.0
            } else if i == j {
                1.0
            } else {
                pearson(&series[i], &series[j])
            };
        }
    }

    Ok(CorrelationMatrix {
        labels: CORRELATION_COLUMNS.iter().map(|c| c.to_string()).collect(),
        values,
    })
}

/// Revenue per (region, category) pair, ascending by region then category.
pub fn revenue_by_region_category(
    frame: &DataFrame,
) -> Result<Vec<RegionCategoryRevenue>, SskError> {
    let regions = frame.column(sale::REGION)?.as_materialized_series().str()?;
    let categories = frame.column(sale::CATEGORY)?.as_materialized_series().str()?;
    let revenues = frame.column(sale::REVENUE)?.as_materialized_series().f64()?;

    let mut rows: Vec<RegionCategoryRevenue> = Vec::new();
    let mut index: std::collections::HashMap<(String, String), usize> =
        std::collections::HashMap::new();
    for i in 0..frame.height() {
        let region = regions.get(i).unwrap_or("").to_string();
        let category = categories.get(i).unwrap_or("").to_string();
        let pair = (region, category);
        match index.get(&pair) {
            Some(&slot) => rows[slot].revenue += revenues.get(i).unwrap_or(0.0),
            None => {
                index.insert(pair.clone(), rows.len());
                rows.push(RegionCategoryRevenue {
                    region: pair.0,
                    category: pair.1,
                    revenue: revenues.get(i).unwrap_or(0.0),
                });
            }
        }
    }
    rows.sort_by(|a, b| (&a.region, &a.category).cmp(&(&b.region, &b.category)));
    Ok(rows)
}

fn float_values(frame: &DataFrame, column: &str) -> Result<Vec<f64>, SskError> {
    let values = frame.column(column)?.as_materialized_series().f64()?;
    Ok((0..frame.height())
        .map(|i| values.get(i).unwrap_or(0.0))
        .collect())
}

/// Column values as f64 regardless of physical dtype.
fn numeric_values(frame: &DataFrame, column: &str) -> Result<Vec<f64>, SskError> {
    let series = frame.column(column)?.as_materialized_series();
    let mut values = Vec::with_capacity(frame.height());
    for i in 0..frame.height() {
        let value = match series.get(i) {
            Ok(any) => any.try_extract::<f64>().unwrap_or(0.0),
            Err(_) => 0.0,
        };
        values.push(value);
    }
    Ok(values)
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        cov / denominator
    }
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

    fn sample_frame() -> DataFrame {
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
                2,
                Category::Clothing,
                Region::South,
                date(2024, 1, 10),
                50.0,
                1,
                0.1,
                true,
            ),
            SaleRecord::new(
                3,
                Category::Electronics,
                Region::North,
                date(2024, 2, 1),
                200.0,
                1,
                0.2,
                false,
            ),
        ];
        records_to_frame(&records).unwrap()
    }

    #[test]
    fn monthly_revenue_is_chronological() {
        let frame = sample_frame();
        let feed = revenue_by_month(&frame).unwrap();
        assert_eq!(
            feed.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
            vec!["2024-01", "2024-02"],
        );
        assert!(close(feed[0].value, 225.0));
        assert!(close(feed[1].value, 160.0));
    }

    #[test]
    fn category_revenue_is_ranked() {
        let frame = sample_frame();
        let feed = revenue_by_category(&frame).unwrap();
        assert_eq!(feed[0].key, "Electronics");
        assert!(close(feed[0].value, 340.0));
        assert_eq!(feed[1].key, "Clothing");
        assert!(close(feed[1].value, 45.0));
    }

    #[test]
    fn raw_distributions_carry_every_row() {
        let frame = sample_frame();
        assert_eq!(price_distribution(&frame).unwrap(), vec![100.0, 50.0, 200.0]);
        assert_eq!(quantity_distribution(&frame).unwrap(), vec![2, 1, 1]);
        assert_eq!(price_by_category(&frame).unwrap().len(), 3);
        assert_eq!(discount_revenue(&frame).unwrap().len(), 3);
    }

    #[test]
    fn region_counts_rank_by_count() {
        let frame = sample_frame();
        let feed = region_counts(&frame).unwrap();
        assert_eq!(feed[0].key, "North");
        assert_eq!(feed[0].value, 2.0);
        assert_eq!(feed[1].key, "South");
        assert_eq!(feed[1].value, 1.0);
    }

    #[test]
    fn category_performance_combines_three_measures() {
        let frame = sample_frame();
        let feed = category_performance(&frame).unwrap();
        assert_eq!(feed.len(), 2);
        // Ascending by category name: Clothing before Electronics.
        assert_eq!(feed[0].category, "Clothing");
        assert!(close(feed[0].revenue, 45.0));
        assert_eq!(feed[0].quantity, 1);
        assert_eq!(feed[0].returns, 1);
        assert_eq!(feed[1].category, "Electronics");
        assert!(close(feed[1].revenue, 340.0));
        assert_eq!(feed[1].quantity, 3);
        assert_eq!(feed[1].returns, 0);
    }

    #[test]
    fn sales_by_day_is_chronological() {
        let frame = sample_frame();
        let feed = sales_by_day(&frame).unwrap();
        assert_eq!(
            feed.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
            vec!["2024-01-05", "2024-01-10", "2024-02-01"],
        );
        assert!(feed.iter().all(|t| t.value == 1.0));
    }

    #[test]
    fn region_category_revenue_orders_pairs() {
        let frame = sample_frame();
        let feed = revenue_by_region_category(&frame).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].region, "North");
        assert_eq!(feed[0].category, "Electronics");
        assert!(close(feed[0].revenue, 340.0));
        assert_eq!(feed[1].region, "South");
        assert_eq!(feed[1].category, "Clothing");
    }

    #[test]
    fn correlation_of_a_column_with_itself_is_one() {
        let frame = sample_frame();
        let matrix = correlation_matrix(&frame).unwrap();
        for i in 0..matrix.labels.len() {
            assert_eq!(matrix.values[i][i], 1.0);
        }
        // Symmetric off the diagonal.
        for i in 0..matrix.labels.len() {
            for j in 0..matrix.labels.len() {
                assert!(close(matrix.values[i][j], matrix.values[j][i]));
            }
        }
    }

    #[test]
    fn correlation_tracks_a_perfect_linear_relationship() {
        // quantity fixed, discount zero: revenue is exactly price * 1,
        // so price and revenue correlate perfectly.
        let records = vec![
            SaleRecord::new(1, Category::Home, Region::West, date(2024, 1, 1), 10.0, 1, 0.0, false),
            SaleRecord::new(2, Category::Home, Region::West, date(2024, 1, 2), 20.0, 1, 0.0, false),
            SaleRecord::new(3, Category::Home, Region::West, date(2024, 1, 3), 30.0, 1, 0.0, false),
        ];
        let frame = records_to_frame(&records).unwrap();
        let matrix = correlation_matrix(&frame).unwrap();
        let price = matrix.labels.iter().position(|l| l == sale::UNIT_PRICE).unwrap();
        let revenue = matrix.labels.iter().position(|l| l == sale::REVENUE).unwrap();
        assert!(close(matrix.values[price][revenue], 1.0));
        // quantity has no variance, so its off-diagonal entries collapse to zero.
        let quantity = matrix.labels.iter().position(|l| l == sale::QUANTITY).unwrap();
        assert_eq!(matrix.values[quantity][price], 0.0);
    }

    #[test]
    fn empty_frame_yields_empty_feeds() {
        let frame = records_to_frame(&[]).unwrap();
        assert!(revenue_by_month(&frame).unwrap().is_empty());
        assert!(price_distribution(&frame).unwrap().is_empty());
        assert!(category_performance(&frame).unwrap().is_empty());
        assert!(revenue_by_region_category(&frame).unwrap().is_empty());
        let matrix = correlation_matrix(&frame).unwrap();
        assert!(matrix.values.iter().flatten().all(|v| *v == 0.0));
    }
}
