use serde::{Deserialize, Serialize};

use crate::domain::ingredient::IngredientId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DishId(pub i64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DishIngredientLink {
    pub dish_id: DishId,
    pub ingredient_id: IngredientId,
    pub quantity: f64,
    pub unit: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: DishId,
    pub name: String,
    /// Resolved category name; `None` when the dish is uncategorized.
    pub category: Option<String>,
    pub ingredients: Vec<DishIngredientLink>,
}

impl Dish {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self { id: DishId(id), name: name.into(), category: None, ingredients: Vec::new() }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_ingredient(mut self, ingredient_id: i64, quantity: f64, unit: &str) -> Self {
        self.ingredients.push(DishIngredientLink {
            dish_id: self.id,
            ingredient_id: IngredientId(ingredient_id),
            quantity,
            unit: unit.to_string(),
        });
        self
    }

    /// Trimmed category name; blank names count as absent.
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|name| !name.is_empty())
    }

    /// Category label for reports, falling back to `placeholder` when absent or blank.
    pub fn category_label<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.category_name().unwrap_or(placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::Dish;

    #[test]
    fn category_label_falls_back_to_placeholder() {
        let uncategorized = Dish::new(1, "Millet Congee");
        let blank = Dish::new(2, "Steamed Egg").with_category("  ");
        let soup = Dish::new(3, "Pork Rib Soup").with_category("Soup");

        assert_eq!(uncategorized.category_label("unknown"), "unknown");
        assert_eq!(blank.category_label("unknown"), "unknown");
        assert_eq!(soup.category_label("unknown"), "Soup");
    }

    #[test]
    fn builder_links_ingredients_to_the_dish() {
        let dish = Dish::new(7, "Fish Soup").with_ingredient(3, 150.0, "g");

        assert_eq!(dish.ingredients.len(), 1);
        assert_eq!(dish.ingredients[0].dish_id, dish.id);
        assert_eq!(dish.ingredients[0].unit, "g");
    }
}
