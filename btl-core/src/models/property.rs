use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Jurisdiction whose transaction tax applies to the purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    England,
    Wales,
}

impl Country {
    pub const ALL: [Country; 2] = [Country::England, Country::Wales];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::England => "england",
            Self::Wales => "wales",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "england" => Some(Self::England),
            "wales" => Some(Self::Wales),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::England => "England",
            Self::Wales => "Wales",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buyer category used to select the band table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyCategory {
    /// First-time buyer.
    First,
    /// Replacement of a main residence.
    Next,
    /// Additional property, including buy-to-let.
    Additional,
}

impl PropertyCategory {
    pub const ALL: [PropertyCategory; 3] = [
        PropertyCategory::First,
        PropertyCategory::Next,
        PropertyCategory::Additional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Next => "next",
            Self::Additional => "additional",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Some(Self::First),
            "next" => Some(Self::Next),
            "additional" => Some(Self::Additional),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::First => "First Home",
            Self::Next => "Next Home (Main Residence)",
            Self::Additional => "Additional Property / BTL",
        }
    }
}

impl fmt::Display for PropertyCategory {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseMethod {
    #[default]
    Mortgage,
    Cash,
}

impl PurchaseMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mortgage => "mortgage",
            Self::Cash => "cash",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mortgage" => Some(Self::Mortgage),
            "cash" => Some(Self::Cash),
            _ => None,
        }
    }

    pub fn is_cash(&self) -> bool {
        matches!(self, Self::Cash)
    }
}

/// Purchase-side inputs of the viability calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInputs {
    pub purchase_price: Decimal,

    /// Deposit as a percentage of the purchase price (25 means 25%).
    /// Ignored for cash purchases.
    pub deposit_percent: Decimal,

    pub country: Country,
    pub category: PropertyCategory,
    pub purchase_method: PurchaseMethod,
    pub legal_broker_fees: Decimal,

    /// Renovation and furnishing spend, paid up front.
    pub renovation_cost: Decimal,
}

impl Default for PropertyInputs {
    fn default() -> Self {
        Self {
            purchase_price: Decimal::from(420_000),
            deposit_percent: Decimal::from(25),
            country: Country::England,
            category: PropertyCategory::Additional,
            purchase_method: PurchaseMethod::Mortgage,
            legal_broker_fees: Decimal::from(2_328),
            renovation_cost: Decimal::from(5_000),
        }
    }
}
