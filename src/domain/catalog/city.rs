//! City and city tier definitions.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::CityId;

/// Classification of a city that drives the out-of-town price multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CityTier {
    /// Regular city, no surcharge.
    Ordinary,

    /// Large regional center, double price for non-residents.
    Important,

    /// The capital, quadruple price for non-residents.
    Capital,
}

impl CityTier {
    /// Multiplier applied to a plan's base price when the city is not the
    /// buyer's home city.
    pub fn price_multiplier(&self) -> i64 {
        match self {
            CityTier::Ordinary => 1,
            CityTier::Important => 2,
            CityTier::Capital => 4,
        }
    }

    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CityTier::Ordinary => "ordinary",
            CityTier::Important => "important",
            CityTier::Capital => "capital",
        }
    }

    /// Parses the storage representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ordinary" => Some(CityTier::Ordinary),
            "important" => Some(CityTier::Important),
            "capital" => Some(CityTier::Capital),
            _ => None,
        }
    }
}

impl std::fmt::Display for CityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A city row as seen by the subscription workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub tier: CityTier,
}

impl City {
    pub fn new(id: CityId, name: impl Into<String>, tier: CityTier) -> Self {
        Self {
            id,
            name: name.into(),
            tier,
        }
    }
}
