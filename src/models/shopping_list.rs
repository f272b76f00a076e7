//! Shopping list model and text rendering

use serde::{Deserialize, Serialize};

/// Header line of the rendered list
pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";

/// One consolidated line of a shopping list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    /// Sum over every cart recipe using this ingredient
    pub total_amount: i64,
}

impl ShoppingListItem {
    pub fn new(name: impl Into<String>, measurement_unit: impl Into<String>, total_amount: i64) -> Self {
        Self {
            name: name.into(),
            measurement_unit: measurement_unit.into(),
            total_amount,
        }
    }
}

/// Render a shopping list as plain text: the header, a blank line, then
/// `"{name}, {total_amount} {measurement_unit}"` per item.
pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(|item| format!("{}, {} {}", item.name, item.total_amount, item.measurement_unit))
        .collect();

    format!("{}\n\n{}", SHOPPING_LIST_HEADER, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lines() {
        let items = vec![
            ShoppingListItem::new("flour", "g", 500),
            ShoppingListItem::new("salt", "tsp", 1),
        ];
        assert_eq!(
            render_shopping_list(&items),
            "Shopping list:\n\nflour, 500 g\nsalt, 1 tsp"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_shopping_list(&[]), "Shopping list:\n\n");
    }

    #[test]
    fn test_render_large_total() {
        let items = vec![ShoppingListItem::new("rice", "g", 5_000_000_000)];
        assert!(render_shopping_list(&items).ends_with("rice, 5000000000 g"));
    }
}
