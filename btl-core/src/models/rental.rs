use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the property is let.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalType {
    /// Short-let, priced per night.
    #[default]
    Airbnb,
    /// Assured Shorthold Tenancy at a fixed monthly rent.
    Ast,
}

impl RentalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Airbnb => "airbnb",
            Self::Ast => "ast",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "airbnb" => Some(Self::Airbnb),
            "ast" => Some(Self::Ast),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Airbnb => "Short-let (Airbnb)",
            Self::Ast => "Long-let (AST)",
        }
    }

    pub fn is_short_let(&self) -> bool {
        matches!(self, Self::Airbnb)
    }
}

/// Income and running-cost inputs. All money fields are monthly unless
/// noted otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalInputs {
    pub rental_type: RentalType,

    /// Average short-let price per night.
    pub nightly_rate: Decimal,

    /// Percentage of nights booked (70 means 70%).
    pub occupancy_percent: Decimal,

    /// Fixed rent under an AST.
    pub ast_monthly_rent: Decimal,

    pub management_fee_percent: Decimal,
    pub council_tax: Decimal,
    pub utilities: Decimal,

    /// Estimated long-term rent, only used to stress-test short-let income.
    pub estimated_long_term_rent: Decimal,
}

impl Default for RentalInputs {
    fn default() -> Self {
        Self {
            rental_type: RentalType::Airbnb,
            nightly_rate: Decimal::from(180),
            occupancy_percent: Decimal::from(70),
            ast_monthly_rent: Decimal::new(383_250, 2),
            management_fee_percent: Decimal::from(18),
            council_tax: Decimal::new(18_375, 2),
            utilities: Decimal::from(150),
            estimated_long_term_rent: Decimal::from(2_000),
        }
    }
}
