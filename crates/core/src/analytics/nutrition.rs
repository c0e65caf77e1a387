use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::dish::{Dish, DishId};

/// Calories plus macro grams for one serving.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub fiber: f64,
}

impl NutritionFacts {
    pub fn new(calories: f64, protein: f64, carbohydrates: f64, fat: f64, fiber: f64) -> Self {
        Self { calories, protein, carbohydrates, fat, fiber }
    }
}

pub trait NutritionProvider: Send + Sync {
    /// `None` when the provider knows nothing about the dish.
    fn nutrition_for(&self, dish: &Dish) -> Option<NutritionFacts>;
}

/// Stand-in provider that synthesizes plausible integer values from a fixed
/// baseline plus bounded jitter. It does not look at the dish at all.
#[derive(Debug)]
pub struct RandomNutritionProvider {
    rng: Mutex<StdRng>,
}

impl RandomNutritionProvider {
    pub fn from_entropy() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl Default for RandomNutritionProvider {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl NutritionProvider for RandomNutritionProvider {
    fn nutrition_for(&self, _dish: &Dish) -> Option<NutritionFacts> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Some(NutritionFacts {
            calories: f64::from(200 + rng.gen_range(0..300_u32)),
            protein: f64::from(10 + rng.gen_range(0..20_u32)),
            carbohydrates: f64::from(20 + rng.gen_range(0..30_u32)),
            fat: f64::from(5 + rng.gen_range(0..15_u32)),
            fiber: f64::from(2 + rng.gen_range(0..8_u32)),
        })
    }
}

/// Fixed per-dish values, for callers that hold measured data.
#[derive(Clone, Debug, Default)]
pub struct NutritionTable {
    facts: HashMap<DishId, NutritionFacts>,
}

impl NutritionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dish(mut self, dish_id: DishId, facts: NutritionFacts) -> Self {
        self.facts.insert(dish_id, facts);
        self
    }
}

impl NutritionProvider for NutritionTable {
    fn nutrition_for(&self, dish: &Dish) -> Option<NutritionFacts> {
        self.facts.get(&dish.id).copied()
    }
}
