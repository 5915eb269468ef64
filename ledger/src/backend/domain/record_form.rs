//! Record form validation.
//!
//! The add and edit screens collect a kind, a category, an optional
//! description, an amount typed with either decimal separator and a date typed
//! as `DD/MM/YYYY`. This service checks that input before it is handed to the
//! storage collaborator and reports every problem at once.

use super::record_normalizer::RecordNormalizer;
use chrono::NaiveDate;
use log::warn;
use serde_json::Value;
use shared::{NewRecord, NewRecordRequest, RecordValidationError};

const MAX_DESCRIPTION_LENGTH: usize = 256;
const DATE_INPUT_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFormService;

impl RecordFormService {
    pub fn new() -> Self {
        Self
    }

    /// Validate form input, returning the cleaned record or all errors found
    pub fn validate(&self, request: &NewRecordRequest) -> Result<NewRecord, Vec<RecordValidationError>> {
        let mut errors = Vec::new();

        let category = request.category.trim();
        if category.is_empty() {
            errors.push(RecordValidationError::EmptyCategory);
        } else if !request.kind.suggested_categories().contains(&category) {
            warn!("Category '{}' is not one of the suggested {} categories", category, request.kind);
        }

        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());
        if let Some(text) = description {
            let length = text.chars().count();
            if length > MAX_DESCRIPTION_LENGTH {
                errors.push(RecordValidationError::DescriptionTooLong(length));
            }
        }

        let amount_input = request.amount.trim();
        let amount = match RecordNormalizer::parse_amount(&Value::String(amount_input.to_string())) {
            None => {
                errors.push(RecordValidationError::InvalidAmount(amount_input.to_string()));
                None
            }
            Some(amount) if amount <= rust_decimal::Decimal::ZERO => {
                errors.push(RecordValidationError::AmountNotPositive);
                None
            }
            Some(amount) if amount.normalize().scale() > 2 => {
                errors.push(RecordValidationError::TooManyFractionDigits);
                None
            }
            Some(amount) => Some(amount),
        };

        let date_input = request.date.trim();
        let occurred_on = Self::parse_date_input(date_input);
        if occurred_on.is_none() {
            errors.push(RecordValidationError::InvalidDate(date_input.to_string()));
        }

        match (amount, occurred_on) {
            (Some(amount), Some(occurred_on)) if errors.is_empty() => Ok(NewRecord {
                kind: request.kind,
                category: category.to_string(),
                description: description.map(str::to_string),
                amount,
                occurred_on,
            }),
            _ => Err(errors),
        }
    }

    /// Parse the date typed in the form ("05/01/2024" or "2024-01-05")
    pub fn parse_date_input(input: &str) -> Option<NaiveDate> {
        DATE_INPUT_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
    }

    /// User-facing messages for a list of validation errors
    pub fn validation_error_messages(&self, errors: &[RecordValidationError]) -> Vec<String> {
        errors.iter().map(ToString::to_string).collect()
    }
}
