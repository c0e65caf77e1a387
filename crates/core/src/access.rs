//! Role/resource permission matrix
//!
//! The policy is a plain value built once and handed to whichever boundary
//! needs it. The analytics engine never consults it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Nutritionist,
    Chef,
    AdminStaff,
    HeadNurse,
    Nurse,
    Caregiver,
    Customer,
    Guest,
    Sales,
    ChefAssistant,
    DeliveryStaff,
}

impl Role {
    pub const ALL: [Role; 12] = [
        Role::Admin,
        Role::Nutritionist,
        Role::Chef,
        Role::AdminStaff,
        Role::HeadNurse,
        Role::Nurse,
        Role::Caregiver,
        Role::Customer,
        Role::Guest,
        Role::Sales,
        Role::ChefAssistant,
        Role::DeliveryStaff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Nutritionist => "nutritionist",
            Self::Chef => "chef",
            Self::AdminStaff => "admin_staff",
            Self::HeadNurse => "head_nurse",
            Self::Nurse => "nurse",
            Self::Caregiver => "caregiver",
            Self::Customer => "customer",
            Self::Guest => "guest",
            Self::Sales => "sales",
            Self::ChefAssistant => "chef_assistant",
            Self::DeliveryStaff => "delivery_staff",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let key = normalize_key(raw);
        Self::ALL.into_iter().find(|role| role.as_str() == key)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Menu,
    Dish,
    Customer,
    Ingredient,
    Upload,
    Order,
    MealSchedule,
    Service,
    ConfinementMeal,
    Delivery,
    AiAnalysis,
    Supplier,
    IngredientPurchase,
    Alert,
    AlertThreshold,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Dish => "dish",
            Self::Customer => "customer",
            Self::Ingredient => "ingredient",
            Self::Upload => "upload",
            Self::Order => "order",
            Self::MealSchedule => "meal_schedule",
            Self::Service => "service",
            Self::ConfinementMeal => "confinement_meal",
            Self::Delivery => "delivery",
            Self::AiAnalysis => "ai_analysis",
            Self::Supplier => "supplier",
            Self::IngredientPurchase => "ingredient_purchase",
            Self::Alert => "alert",
            Self::AlertThreshold => "alert_threshold",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Upload,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Upload => "upload",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: String,
}

impl AccessDecision {
    fn allow(role: Role, resource: Resource, action: Action) -> Self {
        Self {
            allowed: true,
            reason: format!("role `{role}` may {} `{resource}`", action.as_str()),
        }
    }

    fn deny(reason: String) -> Self {
        Self { allowed: false, reason }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AccessPolicy {
    grants: HashMap<Resource, HashMap<Role, HashSet<Action>>>,
}

impl AccessPolicy {
    /// A policy that grants nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The meal-service permission matrix: twelve roles over fifteen resources.
    pub fn standard() -> Self {
        let mut policy = Self::empty();
        for (resource, grants) in STANDARD_GRANTS {
            for (role, actions) in *grants {
                policy = policy.grant(*resource, *role, actions);
            }
        }
        policy
    }

    pub fn grant(mut self, resource: Resource, role: Role, actions: &[Action]) -> Self {
        self.grants
            .entry(resource)
            .or_default()
            .entry(role)
            .or_default()
            .extend(actions.iter().copied());
        self
    }

    pub fn check(&self, role: Role, resource: Resource, action: Action) -> AccessDecision {
        let Some(actions) = self.grants.get(&resource).and_then(|roles| roles.get(&role)) else {
            return AccessDecision::deny(format!(
                "role `{role}` is not authorized for resource `{resource}`"
            ));
        };

        if actions.contains(&action) {
            AccessDecision::allow(role, resource, action)
        } else {
            AccessDecision::deny(format!(
                "role `{role}` may not {} `{resource}`",
                action.as_str()
            ))
        }
    }

    pub fn is_allowed(&self, role: Role, resource: Resource, action: Action) -> bool {
        self.check(role, resource, action).allowed
    }
}

fn normalize_key(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

const CRUD: &[Action] = &[Action::Create, Action::Read, Action::Update, Action::Delete];
const CRU: &[Action] = &[Action::Create, Action::Read, Action::Update];
const RU: &[Action] = &[Action::Read, Action::Update];
const R: &[Action] = &[Action::Read];
const UPLOAD: &[Action] = &[Action::Upload];
const NONE: &[Action] = &[];

type Grants = &'static [(Role, &'static [Action])];

const STANDARD_GRANTS: &[(Resource, Grants)] = &[
    (
        Resource::Menu,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, CRUD),
            (Role::Chef, RU),
            (Role::AdminStaff, R),
            (Role::HeadNurse, R),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, R),
            (Role::DeliveryStaff, R),
        ],
    ),
    (
        Resource::Dish,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, CRUD),
            (Role::Chef, CRUD),
            (Role::AdminStaff, R),
            (Role::HeadNurse, R),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, RU),
            (Role::DeliveryStaff, R),
        ],
    ),
    (
        Resource::Customer,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, RU),
            (Role::Chef, R),
            (Role::AdminStaff, CRUD),
            (Role::HeadNurse, RU),
            (Role::Nurse, RU),
            (Role::Caregiver, RU),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, CRU),
            (Role::ChefAssistant, R),
            (Role::DeliveryStaff, R),
        ],
    ),
    (
        Resource::Ingredient,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, CRUD),
            (Role::Chef, CRUD),
            (Role::AdminStaff, R),
            (Role::HeadNurse, R),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, RU),
            (Role::DeliveryStaff, R),
        ],
    ),
    (
        Resource::Upload,
        &[
            (Role::Admin, UPLOAD),
            (Role::Nutritionist, UPLOAD),
            (Role::Chef, UPLOAD),
            (Role::AdminStaff, UPLOAD),
            (Role::HeadNurse, NONE),
            (Role::Nurse, NONE),
            (Role::Caregiver, NONE),
            (Role::Customer, NONE),
            (Role::Guest, NONE),
            (Role::Sales, NONE),
            (Role::ChefAssistant, NONE),
            (Role::DeliveryStaff, NONE),
        ],
    ),
    (
        Resource::Order,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, R),
            (Role::Chef, R),
            (Role::AdminStaff, CRUD),
            (Role::HeadNurse, R),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, CRU),
            (Role::ChefAssistant, R),
            (Role::DeliveryStaff, RU),
        ],
    ),
    (
        Resource::MealSchedule,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, CRUD),
            (Role::Chef, RU),
            (Role::AdminStaff, R),
            (Role::HeadNurse, RU),
            (Role::Nurse, RU),
            (Role::Caregiver, RU),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, RU),
            (Role::DeliveryStaff, RU),
        ],
    ),
    (
        Resource::Service,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, R),
            (Role::Chef, R),
            (Role::AdminStaff, CRUD),
            (Role::HeadNurse, CRU),
            (Role::Nurse, CRU),
            (Role::Caregiver, CRU),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, R),
            (Role::DeliveryStaff, R),
        ],
    ),
    (
        Resource::ConfinementMeal,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, CRUD),
            (Role::Chef, RU),
            (Role::AdminStaff, R),
            (Role::HeadNurse, R),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, CRU),
            (Role::ChefAssistant, R),
            (Role::DeliveryStaff, R),
        ],
    ),
    (
        Resource::Delivery,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, R),
            (Role::Chef, R),
            (Role::AdminStaff, CRUD),
            (Role::HeadNurse, R),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, R),
            (Role::DeliveryStaff, CRU),
        ],
    ),
    (
        Resource::AiAnalysis,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, R),
            (Role::Chef, R),
            (Role::AdminStaff, R),
            (Role::HeadNurse, R),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, R),
            (Role::DeliveryStaff, R),
        ],
    ),
    (
        Resource::Supplier,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, R),
            (Role::Chef, R),
            (Role::AdminStaff, CRUD),
            (Role::HeadNurse, R),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, R),
            (Role::DeliveryStaff, R),
        ],
    ),
    (
        Resource::IngredientPurchase,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, R),
            (Role::Chef, CRU),
            (Role::AdminStaff, CRU),
            (Role::HeadNurse, R),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, RU),
            (Role::DeliveryStaff, R),
        ],
    ),
    (
        Resource::Alert,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, RU),
            (Role::Chef, RU),
            (Role::AdminStaff, RU),
            (Role::HeadNurse, RU),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, R),
            (Role::DeliveryStaff, R),
        ],
    ),
    (
        Resource::AlertThreshold,
        &[
            (Role::Admin, CRUD),
            (Role::Nutritionist, R),
            (Role::Chef, R),
            (Role::AdminStaff, R),
            (Role::HeadNurse, R),
            (Role::Nurse, R),
            (Role::Caregiver, R),
            (Role::Customer, R),
            (Role::Guest, R),
            (Role::Sales, R),
            (Role::ChefAssistant, R),
            (Role::DeliveryStaff, R),
        ],
    ),
];
