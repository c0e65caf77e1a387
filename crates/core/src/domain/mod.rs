pub mod dish;
pub mod feedback;
pub mod ingredient;
pub mod order;
