use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::inputs::{InputError, coerce_decimal, coerce_whole};

/// Loan amount offered to the comparison tool before the viability
/// calculator has published one.
pub const DEFAULT_LOAN_AMOUNT: Decimal = Decimal::from_parts(315_000, 0, 0, false, 0);

/// Maximum number of offers compared side by side.
pub const MAX_OFFERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentType {
    #[default]
    Repayment,
    InterestOnly,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repayment => "repayment",
            Self::InterestOnly => "interestOnly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repayment" => Some(Self::Repayment),
            "interestonly" | "interest-only" | "interest_only" => Some(Self::InterestOnly),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Repayment => "Repayment",
            Self::InterestOnly => "Interest Only",
        }
    }
}

/// Mortgage inputs of the viability calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortgageInputs {
    /// Annual interest rate as a percentage (4.9 means 4.9%).
    pub interest_rate: Decimal,

    /// Term over which the arrangement fee is spread, in whole years.
    pub term_years: u32,

    pub arrangement_fee: Decimal,

    /// Carried with the snapshot; the viability payment is always the
    /// interest approximation regardless of this value.
    pub payment_type: PaymentType,
}

impl Default for MortgageInputs {
    fn default() -> Self {
        Self {
            interest_rate: Decimal::new(49, 1),
            term_years: 5,
            arrangement_fee: Decimal::from(4_000),
            payment_type: PaymentType::Repayment,
        }
    }
}

/// One mortgage product in the comparison tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortgageOffer {
    pub id: u32,
    pub name: String,

    /// Kept in step with the viability calculator's mortgage amount.
    pub loan_amount: Decimal,

    /// Annual interest rate as a percentage.
    pub interest_rate: Decimal,
    pub term_years: u32,

    /// Rolled into the financed amount.
    pub arrangement_fee: Decimal,
    /// Rolled into the financed amount.
    pub broker_fee: Decimal,

    /// Paid every month on top of the mortgage payment.
    #[serde(default)]
    pub monthly_fee: Decimal,
    /// Paid once, not financed.
    #[serde(default)]
    pub legal_fee: Decimal,

    pub payment_type: PaymentType,
}

impl MortgageOffer {
    /// The three offers shown when nothing has been saved yet.
    pub fn default_set(loan_amount: Decimal) -> Vec<MortgageOffer> {
        let offer = |id: u32, rate: Decimal, arrangement: i64, broker: i64| MortgageOffer {
            id,
            name: format!("Option {id}"),
            loan_amount,
            interest_rate: rate,
            term_years: 5,
            arrangement_fee: Decimal::from(arrangement),
            broker_fee: Decimal::from(broker),
            monthly_fee: Decimal::ZERO,
            legal_fee: Decimal::ZERO,
            payment_type: PaymentType::Repayment,
        };

        vec![
            offer(1, Decimal::new(49, 1), 4_000, 0),
            offer(2, Decimal::new(52, 1), 2_000, 2_500),
            offer(3, Decimal::new(47, 1), 5_999, 0),
        ]
    }

    /// Returns a copy of this offer with one field replaced by `raw`.
    ///
    /// Numeric fields coerce unparseable text to zero. The payment type
    /// rejects unknown values.
    pub fn with_field(
        &self,
        field: OfferField,
        raw: &str,
    ) -> Result<Self, InputError> {
        let mut next = self.clone();
        match field {
            OfferField::Name => next.name = raw.trim().to_string(),
            OfferField::LoanAmount => next.loan_amount = coerce_decimal(raw),
            OfferField::InterestRate => next.interest_rate = coerce_decimal(raw),
            OfferField::TermYears => next.term_years = coerce_whole(raw),
            OfferField::ArrangementFee => next.arrangement_fee = coerce_decimal(raw),
            OfferField::BrokerFee => next.broker_fee = coerce_decimal(raw),
            OfferField::MonthlyFee => next.monthly_fee = coerce_decimal(raw),
            OfferField::LegalFee => next.legal_fee = coerce_decimal(raw),
            OfferField::PaymentType => {
                next.payment_type =
                    PaymentType::parse(raw).ok_or_else(|| InputError::UnknownOption {
                        field: field.as_str(),
                        value: raw.to_string(),
                    })?
            }
        }
        Ok(next)
    }
}

/// Editable fields of a [`MortgageOffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferField {
    Name,
    LoanAmount,
    InterestRate,
    TermYears,
    ArrangementFee,
    BrokerFee,
    MonthlyFee,
    LegalFee,
    PaymentType,
}

impl OfferField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::LoanAmount => "loan_amount",
            Self::InterestRate => "interest_rate",
            Self::TermYears => "term_years",
            Self::ArrangementFee => "arrangement_fee",
            Self::BrokerFee => "broker_fee",
            Self::MonthlyFee => "monthly_fee",
            Self::LegalFee => "legal_fee",
            Self::PaymentType => "payment_type",
        }
    }

    pub fn parse(s: &str) -> Result<Self, InputError> {
        match s.trim() {
            "name" => Ok(Self::Name),
            "loan_amount" => Ok(Self::LoanAmount),
            "interest_rate" => Ok(Self::InterestRate),
            "term_years" => Ok(Self::TermYears),
            "arrangement_fee" => Ok(Self::ArrangementFee),
            "broker_fee" => Ok(Self::BrokerFee),
            "monthly_fee" => Ok(Self::MonthlyFee),
            "legal_fee" => Ok(Self::LegalFee),
            "payment_type" => Ok(Self::PaymentType),
            other => Err(InputError::UnknownField(other.to_string())),
        }
    }
}
