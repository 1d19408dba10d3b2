//! The viability calculator's input snapshot and field-level edits.
//!
//! Inputs are never mutated in place by callers. Every edit goes through
//! [`ViabilityInputs::with_field`], which returns a new snapshot, so a
//! recompute is always a pure function of one complete record.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::{
    Country, MortgageInputs, PaymentType, PropertyCategory, PropertyInputs, PurchaseMethod,
    RentalInputs, RentalType,
};

/// Errors raised while applying a field edit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown input field '{0}'")]
    UnknownField(String),

    #[error("'{value}' is not a valid option for {field}")]
    UnknownOption { field: &'static str, value: String },
}

/// Normalizes user text before numeric parsing: trims whitespace, drops a
/// leading pound sign and comma thousands separators.
fn normalize_numeric_input(s: &str) -> String {
    s.trim().trim_start_matches('£').trim().replace(',', "")
}

/// Coerces user text into a [`Decimal`].
///
/// Empty and unparseable input both become zero; the latter is logged.
pub fn coerce_decimal(s: &str) -> Decimal {
    let normalized = normalize_numeric_input(s);
    if normalized.is_empty() {
        return Decimal::ZERO;
    }
    normalized.parse().unwrap_or_else(|e| {
        warn!(input = %s, "coercing invalid number to zero: {}", e);
        Decimal::ZERO
    })
}

/// Coerces user text into a whole, non-negative count (fractions truncate).
pub fn coerce_whole(s: &str) -> u32 {
    let value = coerce_decimal(s);
    if value.is_sign_negative() {
        warn!(input = %s, "coercing negative count to zero");
        return 0;
    }
    value.trunc().to_u32().unwrap_or_else(|| {
        warn!(input = %s, "count out of range, coercing to zero");
        0
    })
}

/// Complete input record of the viability calculator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViabilityInputs {
    pub property: PropertyInputs,
    pub rental: RentalInputs,
    pub mortgage: MortgageInputs,
}

impl ViabilityInputs {
    /// Returns a new snapshot with `field` set from the raw text.
    ///
    /// # Errors
    ///
    /// [`InputError::UnknownOption`] when an enum-valued field receives a
    /// value outside its option list. Numeric fields never fail.
    pub fn with_field(
        &self,
        field: InputField,
        raw: &str,
    ) -> Result<Self, InputError> {
        let unknown = || InputError::UnknownOption {
            field: field.as_str(),
            value: raw.to_string(),
        };

        let mut next = self.clone();
        match field {
            InputField::PurchasePrice => next.property.purchase_price = coerce_decimal(raw),
            InputField::DepositPercent => next.property.deposit_percent = coerce_decimal(raw),
            InputField::Country => next.property.country = Country::parse(raw).ok_or_else(unknown)?,
            InputField::PropertyCategory => {
                next.property.category = PropertyCategory::parse(raw).ok_or_else(unknown)?
            }
            InputField::PurchaseMethod => {
                next.property.purchase_method = PurchaseMethod::parse(raw).ok_or_else(unknown)?
            }
            InputField::LegalBrokerFees => next.property.legal_broker_fees = coerce_decimal(raw),
            InputField::RenovationCost => next.property.renovation_cost = coerce_decimal(raw),
            InputField::RentalType => {
                next.rental.rental_type = RentalType::parse(raw).ok_or_else(unknown)?
            }
            InputField::NightlyRate => next.rental.nightly_rate = coerce_decimal(raw),
            InputField::OccupancyPercent => next.rental.occupancy_percent = coerce_decimal(raw),
            InputField::AstMonthlyRent => next.rental.ast_monthly_rent = coerce_decimal(raw),
            InputField::ManagementFeePercent => {
                next.rental.management_fee_percent = coerce_decimal(raw)
            }
            InputField::CouncilTax => next.rental.council_tax = coerce_decimal(raw),
            InputField::Utilities => next.rental.utilities = coerce_decimal(raw),
            InputField::EstimatedLongTermRent => {
                next.rental.estimated_long_term_rent = coerce_decimal(raw)
            }
            InputField::InterestRate => next.mortgage.interest_rate = coerce_decimal(raw),
            InputField::TermYears => next.mortgage.term_years = coerce_whole(raw),
            InputField::ArrangementFee => next.mortgage.arrangement_fee = coerce_decimal(raw),
            InputField::PaymentType => {
                next.mortgage.payment_type = PaymentType::parse(raw).ok_or_else(unknown)?
            }
        }
        Ok(next)
    }
}

/// Editable fields of [`ViabilityInputs`], named in snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    PurchasePrice,
    DepositPercent,
    Country,
    PropertyCategory,
    PurchaseMethod,
    LegalBrokerFees,
    RenovationCost,
    RentalType,
    NightlyRate,
    OccupancyPercent,
    AstMonthlyRent,
    ManagementFeePercent,
    CouncilTax,
    Utilities,
    EstimatedLongTermRent,
    InterestRate,
    TermYears,
    ArrangementFee,
    PaymentType,
}

impl InputField {
    pub const ALL: [InputField; 19] = [
        InputField::PurchasePrice,
        InputField::DepositPercent,
        InputField::Country,
        InputField::PropertyCategory,
        InputField::PurchaseMethod,
        InputField::LegalBrokerFees,
        InputField::RenovationCost,
        InputField::RentalType,
        InputField::NightlyRate,
        InputField::OccupancyPercent,
        InputField::AstMonthlyRent,
        InputField::ManagementFeePercent,
        InputField::CouncilTax,
        InputField::Utilities,
        InputField::EstimatedLongTermRent,
        InputField::InterestRate,
        InputField::TermYears,
        InputField::ArrangementFee,
        InputField::PaymentType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PurchasePrice => "purchase_price",
            Self::DepositPercent => "deposit_percent",
            Self::Country => "country",
            Self::PropertyCategory => "property_category",
            Self::PurchaseMethod => "purchase_method",
            Self::LegalBrokerFees => "legal_broker_fees",
            Self::RenovationCost => "renovation_cost",
            Self::RentalType => "rental_type",
            Self::NightlyRate => "nightly_rate",
            Self::OccupancyPercent => "occupancy_percent",
            Self::AstMonthlyRent => "ast_monthly_rent",
            Self::ManagementFeePercent => "management_fee_percent",
            Self::CouncilTax => "council_tax",
            Self::Utilities => "utilities",
            Self::EstimatedLongTermRent => "estimated_long_term_rent",
            Self::InterestRate => "interest_rate",
            Self::TermYears => "term_years",
            Self::ArrangementFee => "arrangement_fee",
            Self::PaymentType => "payment_type",
        }
    }

    pub fn parse(s: &str) -> Result<Self, InputError> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == name)
            .ok_or_else(|| InputError::UnknownField(name.to_string()))
    }
}
