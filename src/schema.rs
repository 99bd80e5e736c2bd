/// Column-name constants for the sales frame.
/// Single source of truth - shared by generation, ingestion and aggregation.

// ── Sale columns ────────────────────────────────────────────────────────────
pub mod sale {
    pub const SALE_ID: &str = "sale_id";
    pub const CATEGORY: &str = "category";
    pub const REGION: &str = "region";
    pub const DATE: &str = "date";
    pub const MONTH: &str = "month";
    pub const UNIT_PRICE: &str = "unit_price";
    pub const QUANTITY: &str = "quantity";
    pub const DISCOUNT: &str = "discount";
    pub const REVENUE: &str = "revenue";
    pub const RETURNED: &str = "returned";

    /// Columns a CSV source must provide. `month` and `revenue` are derived
    /// during record construction and re-derived on load.
    pub const REQUIRED: [&str; 8] = [
        SALE_ID, CATEGORY, REGION, DATE, UNIT_PRICE, QUANTITY, DISCOUNT, RETURNED,
    ];
}
