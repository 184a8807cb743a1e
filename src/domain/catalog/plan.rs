//! Subscription plan catalog rows.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PlanId, ValidationError};

/// Length of access a plan buys.
///
/// Months are counted as 30 days each, so a three month plan is exactly 90 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum PlanPeriod {
    OneMonth,
    ThreeMonths,
    SixMonths,
    TwelveMonths,
}

impl PlanPeriod {
    pub const DAYS_PER_MONTH: i64 = 30;

    /// Builds a period from its month count; only 1, 3, 6 and 12 exist.
    pub fn from_months(months: i32) -> Result<Self, ValidationError> {
        match months {
            1 => Ok(PlanPeriod::OneMonth),
            3 => Ok(PlanPeriod::ThreeMonths),
            6 => Ok(PlanPeriod::SixMonths),
            12 => Ok(PlanPeriod::TwelveMonths),
            other => Err(ValidationError::invalid_format(
                "period",
                format!("{} is not one of 1, 3, 6, 12 months", other),
            )),
        }
    }

    pub fn months(&self) -> i32 {
        match self {
            PlanPeriod::OneMonth => 1,
            PlanPeriod::ThreeMonths => 3,
            PlanPeriod::SixMonths => 6,
            PlanPeriod::TwelveMonths => 12,
        }
    }

    /// Length of the period in days.
    pub fn duration_days(&self) -> i64 {
        i64::from(self.months()) * Self::DAYS_PER_MONTH
    }
}

impl TryFrom<i32> for PlanPeriod {
    type Error = ValidationError;

    fn try_from(months: i32) -> Result<Self, Self::Error> {
        Self::from_months(months)
    }
}

impl From<PlanPeriod> for i32 {
    fn from(period: PlanPeriod) -> Self {
        period.months()
    }
}

impl std::fmt::Display for PlanPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.months() {
            1 => write!(f, "1 month"),
            n => write!(f, "{} months", n),
        }
    }
}

/// Immutable catalog row describing what a purchase buys and its base price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: PlanId,
    pub period: PlanPeriod,
    /// Base price in the smallest currency unit.
    pub price: i64,
}

impl SubscriptionPlan {
    /// Creates a plan row, rejecting non-positive prices.
    pub fn new(id: PlanId, period: PlanPeriod, price: i64) -> Result<Self, ValidationError> {
        if price <= 0 {
            return Err(ValidationError::invalid_format("price", "must be positive"));
        }
        Ok(Self { id, period, price })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_month_counts_are_periods() {
        for months in [1, 3, 6, 12] {
            assert_eq!(PlanPeriod::from_months(months).unwrap().months(), months);
        }
        for months in [0, 2, 4, 24, -1] {
            assert!(PlanPeriod::from_months(months).is_err());
        }
    }

    #[test]
    fn durations_use_thirty_day_months() {
        assert_eq!(PlanPeriod::OneMonth.duration_days(), 30);
        assert_eq!(PlanPeriod::ThreeMonths.duration_days(), 90);
        assert_eq!(PlanPeriod::SixMonths.duration_days(), 180);
        assert_eq!(PlanPeriod::TwelveMonths.duration_days(), 360);
    }

    #[test]
    fn period_serializes_as_month_count() {
        assert_eq!(serde_json::to_string(&PlanPeriod::SixMonths).unwrap(), "6");
        let parsed: PlanPeriod = serde_json::from_str("12").unwrap();
        assert_eq!(parsed, PlanPeriod::TwelveMonths);
        assert!(serde_json::from_str::<PlanPeriod>("5").is_err());
    }

    #[test]
    fn plan_rejects_non_positive_price() {
        let id = PlanId::new(1).unwrap();
        assert!(SubscriptionPlan::new(id, PlanPeriod::OneMonth, 0).is_err());
        assert!(SubscriptionPlan::new(id, PlanPeriod::OneMonth, -10).is_err());
        assert!(SubscriptionPlan::new(id, PlanPeriod::OneMonth, 1000).is_ok());
    }
}
