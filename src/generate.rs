use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::record::{Category, Region, SaleRecord};

/// Knobs for the synthetic dataset.
///
/// Defaults reproduce the standard demo dataset: 5000 sales over 180 days
/// starting 2024-01-01, prices in [5, 500), discounts in [0, 0.3), a 5%
/// return rate and mildly skewed category weights.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub count: usize,
    /// PRNG seed; the same seed always yields the same records.
    pub seed: u64,
    pub start_date: NaiveDate,
    /// Dates are drawn uniformly from [start_date, start_date + span_days).
    pub span_days: u32,
    /// Half-open unit-price range [lower, upper).
    pub price_range: (f64, f64),
    /// Discounts are drawn uniformly from [0, max_discount).
    pub max_discount: f64,
    pub return_probability: f64,
    /// Relative draw weights per category, same order as `Category::ALL`.
    pub category_weights: [f64; 5],
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: 5000,
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid calendar date"),
            span_days: 180,
            price_range: (5.0, 500.0),
            max_discount: 0.3,
            return_probability: 0.05,
            category_weights: [0.25, 0.20, 0.25, 0.15, 0.15],
        }
    }
}

/// Generate the synthetic record set. Deterministic for a given config.
///
/// Sale ids are 1-based and sequential in generation order.
pub fn generate_records(config: &GeneratorConfig) -> Vec<SaleRecord> {
    let mut rng = Pcg64::seed_from_u64(config.seed);
    let mut records = Vec::with_capacity(config.count);

    for i in 0..config.count {
        let category = weighted_category(&mut rng, &config.category_weights);
        let region = Region::ALL[rng.gen_range(0..Region::ALL.len())];
        let offset = rng.gen_range(0..i64::from(config.span_days.max(1)));
        let date = config.start_date + Duration::days(offset);
        let (price_lo, price_hi) = config.price_range;
        let unit_price = if price_hi > price_lo {
            rng.gen_range(price_lo..price_hi)
        } else {
            price_lo
        };
        let quantity = rng.gen_range(1..10);
        let discount = if config.max_discount > 0.0 {
            rng.gen_range(0.0..config.max_discount)
        } else {
            0.0
        };
        let returned = rng.gen::<f64>() < config.return_probability;

        records.push(SaleRecord::new(
            i as u32 + 1,
            category,
            region,
            date,
            unit_price,
            quantity,
            discount,
            returned,
        ));
    }

    records
}

fn weighted_category(rng: &mut Pcg64, weights: &[f64; 5]) -> Category {
    let total: f64 = weights.iter().sum();
    let mut draw = rng.gen::<f64>() * total;
    for (category, weight) in Category::ALL.iter().zip(weights) {
        if draw < *weight {
            return *category;
        }
        draw -= weight;
    }
    // Rounding can leave a sliver above the last bucket.
    Category::ALL[Category::ALL.len() - 1]
}
