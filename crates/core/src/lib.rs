pub mod access;
pub mod analytics;
pub mod config;
pub mod domain;
pub mod errors;

pub use access::{AccessDecision, AccessPolicy, Action, Resource, Role};
pub use analytics::{
    AnalysisEngine, AnalysisKind, AnalysisReport, AnalysisSettings, AnalysisWindow, RecordSnapshot,
    RecordSource, SourceError,
};
pub use domain::dish::{Dish, DishId, DishIngredientLink};
pub use domain::feedback::{ServiceFeedback, ServiceRecordId};
pub use domain::ingredient::{Ingredient, IngredientId};
pub use domain::order::{CustomerId, CustomerOrder, OrderId, OrderLineItem, OrderStatus};
pub use errors::{AnalysisError, ApplicationError, InterfaceError};
