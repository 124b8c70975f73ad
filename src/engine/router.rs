//! Per-category submission rules.

use crate::engine::error::{EngineError, FieldError};
use crate::engine::margin::check_row;
use crate::models::task::{Submission, Task, TaskCategory};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), EngineError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(self.errors))
        }
    }
}

/// Expected validation failures are reported in the result, never as `Err`.
pub fn validate_submission(category: TaskCategory, payload: &Submission) -> ValidationResult {
    let mut errors = vec![];

    for (index, photo) in payload.photos.iter().enumerate() {
        if photo.trim().is_empty() {
            errors.push(FieldError::invalid(format!("photos[{index}]"), "photo reference is empty"));
        }
    }

    match category {
        TaskCategory::Delivery => {
            if payload.photos.is_empty() {
                errors.push(FieldError::required("photos", "a delivery needs at least one photo"));
            }
        }
        TaskCategory::MarketTask | TaskCategory::TechnicalTask => {
            if payload.description.trim().is_empty() {
                errors.push(FieldError::required("description", "describe the work that was done"));
            }
        }
        TaskCategory::PriceResearch => {
            let mut saved = 0;
            for (index, row) in payload.price_rows.iter().enumerate() {
                if !row.saved {
                    continue;
                }
                saved += 1;
                let prefix = format!("price_rows[{index}].");
                errors.extend(check_row(row).iter().map(|err| err.to_field_error(&prefix)));
            }
            if saved == 0 {
                errors.push(FieldError::required("price_rows", "save at least one price row before submitting"));
            }
        }
    }

    ValidationResult { errors }
}

/// Description recorded for delivery submissions, built from the task and
/// its customer fields.
pub fn delivery_description(task: &Task) -> String {
    match &task.customer {
        Some(customer) => {
            let mut text = format!("Delivered \"{}\" to {}", task.title, customer.name);
            if let Some(address) = customer.address.as_deref().filter(|a| !a.trim().is_empty()) {
                text.push_str(&format!(", {}", address.trim()));
            }
            if let Some(phone) = customer.phone.as_deref().filter(|p| !p.trim().is_empty()) {
                text.push_str(&format!(" (tel: {})", phone.trim()));
            }
            text
        }
        None => format!("Delivered \"{}\"", task.title),
    }
}
