use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IngredientId(pub i64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    /// Quantity currently on hand, in `unit`.
    pub stock: f64,
    pub unit: String,
}

impl Ingredient {
    pub fn new(id: i64, name: impl Into<String>, stock: f64, unit: impl Into<String>) -> Self {
        Self { id: IngredientId(id), name: name.into(), stock, unit: unit.into() }
    }
}
