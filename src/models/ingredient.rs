//! Ingredient model

use serde::{Deserialize, Serialize};

/// Ingredient reference data.
///
/// The same name may exist under several measurement units; the
/// (name, measurement_unit) pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// Input for creating an ingredient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateIngredientInput {
    pub name: String,
    pub measurement_unit: String,
}

impl CreateIngredientInput {
    pub fn new(name: impl Into<String>, measurement_unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            measurement_unit: measurement_unit.into(),
        }
    }
}
