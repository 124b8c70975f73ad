//! Price-research margin calculator.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::engine::error::{FieldError, ValidationCode};
use crate::models::price::{Observation, ObservationStatus, PriceRow, COMPETITOR_COUNT};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("competitor {competitor} is marked out of stock without a photo")]
    MissingEvidence { competitor: usize },
    #[error("competitor {competitor} is marked equivalent without a substitute product name")]
    MissingSubstituteName { competitor: usize },
    #[error("{field} must not be negative")]
    NegativePrice { field: String },
    #[error("too many competitor observations: {0}")]
    TooManyObservations(usize),
    #[error("margin is out of range for these prices")]
    MarginOutOfRange,
}

impl RowError {
    /// Converts into a field error addressed relative to `prefix`.
    pub fn to_field_error(&self, prefix: &str) -> FieldError {
        match self {
            RowError::MissingEvidence { competitor } => FieldError::new(
                format!("{prefix}observations[{competitor}].photo"),
                ValidationCode::MissingEvidence,
                self.to_string(),
            ),
            RowError::MissingSubstituteName { competitor } => FieldError::new(
                format!("{prefix}observations[{competitor}].equivalent_product_name"),
                ValidationCode::MissingSubstituteName,
                self.to_string(),
            ),
            RowError::NegativePrice { field } => {
                FieldError::invalid(format!("{prefix}{field}"), self.to_string())
            }
            RowError::TooManyObservations(_) => {
                FieldError::invalid(format!("{prefix}observations"), self.to_string())
            }
            RowError::MarginOutOfRange => FieldError::invalid(format!("{prefix}our_price"), self.to_string()),
        }
    }
}

fn comparable_price(observation: &Observation) -> Option<Decimal> {
    match observation.status {
        ObservationStatus::Available | ObservationStatus::Equivalent => {
            observation.price.filter(|price| *price > Decimal::ZERO)
        }
        ObservationStatus::None | ObservationStatus::NoStock => None,
    }
}

/// Percentage by which `our_price` exceeds the cheapest comparable competitor.
///
/// Only AVAILABLE and EQUIVALENT observations with a positive price count.
/// The sign is kept: a negative result means every comparable competitor
/// charges more than `our_price`.
/// Returns zero when nothing is comparable, or when `our_price` is not
/// positive (the ratio is undefined there). Fails when the percentage does
/// not fit in a `Decimal`.
pub fn margin(our_price: Decimal, observations: &[Observation]) -> Result<Decimal, RowError> {
    let cheapest = observations.iter().filter_map(comparable_price).min();

    match cheapest {
        Some(min) if our_price > Decimal::ZERO => our_price
            .checked_sub(min)
            .and_then(|diff| diff.checked_div(our_price))
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
            .map(|pct| pct.round_dp(2))
            .ok_or(RowError::MarginOutOfRange),
        _ => Ok(Decimal::ZERO),
    }
}

/// Every gating rule a row breaks; empty when the row may be saved.
pub fn check_row(row: &PriceRow) -> Vec<RowError> {
    let mut errors = vec![];

    if row.observations.len() > COMPETITOR_COUNT {
        errors.push(RowError::TooManyObservations(row.observations.len()));
    }
    if row.our_price < Decimal::ZERO {
        errors.push(RowError::NegativePrice {
            field: "our_price".to_string(),
        });
    }

    for (index, observation) in row.observations.iter().enumerate() {
        if observation.price.is_some_and(|price| price < Decimal::ZERO) {
            errors.push(RowError::NegativePrice {
                field: format!("observations[{index}].price"),
            });
        }
        match observation.status {
            ObservationStatus::NoStock if is_blank(&observation.photo) => {
                errors.push(RowError::MissingEvidence { competitor: index });
            }
            ObservationStatus::Equivalent if is_blank(&observation.equivalent_product_name) => {
                errors.push(RowError::MissingSubstituteName { competitor: index });
            }
            _ => {}
        }
    }

    if errors.is_empty() {
        if let Err(e) = margin(row.our_price, &row.observations) {
            errors.push(e);
        }
    }

    errors
}

/// Commits a row: re-derives its margin and sets `saved` if every rule holds.
/// A failing row is left unsaved.
pub fn commit_row(row: &mut PriceRow) -> Result<(), Vec<RowError>> {
    row.margin = margin(row.our_price, &row.observations).unwrap_or(Decimal::ZERO);

    let errors = check_row(row);
    if !errors.is_empty() {
        row.saved = false;
        return Err(errors);
    }

    row.saved = true;
    Ok(())
}

/// Price per 100 units of weight, for normalising a competitor's different
/// package size before its price is recorded. `None` for a non-positive
/// weight or a result too large to represent.
pub fn unit_price(price: Decimal, weight: Decimal) -> Option<Decimal> {
    if weight <= Decimal::ZERO {
        return None;
    }
    price
        .checked_div(weight)
        .and_then(|per_unit| per_unit.checked_mul(dec!(100)))
        .map(|per_hundred| per_hundred.round_dp(2))
}

/// Presentation flag: a comparable competitor exists and the margin is below
/// `threshold` percent.
pub fn is_low_margin(margin: Decimal, threshold: Decimal) -> bool {
    !margin.is_zero() && margin < threshold
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
