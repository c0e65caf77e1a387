use serde::{Deserialize, Serialize};

use crate::domain::order::CustomerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceRecordId(pub i64);

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Customer feedback on a service record. It references the service record, not a dish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFeedback {
    pub service_record_id: ServiceRecordId,
    pub customer_id: CustomerId,
    pub rating: u8,
    pub comment: Option<String>,
}

impl ServiceFeedback {
    pub fn has_valid_rating(&self) -> bool {
        (MIN_RATING..=MAX_RATING).contains(&self.rating)
    }
}
