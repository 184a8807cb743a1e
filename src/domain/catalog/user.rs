//! The slice of a user profile the purchase workflow reads.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CityId, UserId};

/// User profile subset: identity and home city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    /// Users who have not picked a home city pay the tier price everywhere.
    pub home_city_id: Option<CityId>,
}

impl UserProfile {
    pub fn new(id: UserId, home_city_id: Option<CityId>) -> Self {
        Self { id, home_city_id }
    }

    /// Whether `city_id` is this user's home city.
    pub fn lives_in(&self, city_id: CityId) -> bool {
        self.home_city_id == Some(city_id)
    }
}
