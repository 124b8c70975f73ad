use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Number of competitor columns on a price-research row.
pub const COMPETITOR_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationStatus {
    #[default]
    None,
    Available,
    NoStock,
    Equivalent,
}

/// One competitor's recorded price and status for a product row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct Observation {
    pub price: Option<Decimal>,
    #[serde(default)]
    pub status: ObservationStatus,
    pub photo: Option<String>,
    pub equivalent_product_name: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceRow {
    pub product_code: String,
    pub product_name: String,
    pub our_price: Decimal,
    #[serde(default)]
    pub observations: Vec<Observation>,
    /// Derived; overwritten whenever the row is committed or submitted.
    #[serde(default)]
    pub margin: Decimal,
    #[serde(default)]
    pub saved: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PriceRowView {
    #[serde(flatten)]
    pub row: PriceRow,
    pub low_margin: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UnitPriceQuery {
    /// Shelf price of the package.
    pub price: Decimal,
    /// Package weight in grams.
    pub weight: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnitPrice {
    /// Price per 100 grams.
    pub unit_price: Decimal,
}
