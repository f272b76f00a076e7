//! Field-level validation errors
//!
//! Validation never stops at the first problem: every violation is
//! recorded against its field and reported in one error.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Validation messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an error with a single message
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a violation for a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record a violation if `value` is blank or longer than `max` characters
    pub fn check_text(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.add(field, "This field may not be blank.");
        } else if value.chars().count() > max {
            self.add(
                field,
                format!("Ensure this field has no more than {} characters.", max),
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages recorded for a field
    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_every_violation() {
        let mut errors = ValidationErrors::new();
        errors.add("tags", "at least one tag is required");
        errors.add("ingredients", "at least one ingredient is required");
        errors.add("tags", "duplicate tags: 1");

        assert_eq!(errors.messages("tags").len(), 2);
        assert!(errors.has("ingredients"));
        assert!(errors.messages("cooking_time").is_empty());
        assert!(errors.clone().into_result().is_err());
    }

    #[test]
    fn test_check_text() {
        let mut errors = ValidationErrors::new();
        errors.check_text("name", "   ", 10);
        errors.check_text("slug", "ok", 10);
        errors.check_text("text", "ñññ", 2);

        assert_eq!(errors.messages("name"), ["This field may not be blank."]);
        assert!(!errors.has("slug"));
        assert_eq!(
            errors.messages("text"),
            ["Ensure this field has no more than 2 characters."]
        );
    }

    #[test]
    fn test_empty_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_serializes_as_field_map() {
        let errors = ValidationErrors::single("cooking_time", "must be at least 1");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["cooking_time"][0], "must be at least 1");
    }

    #[test]
    fn test_display_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "must not be empty");
        errors.add("text", "must not be empty");
        assert_eq!(errors.to_string(), "name: must not be empty; text: must not be empty");
    }
}
