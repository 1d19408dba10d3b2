//! Buy-to-let viability calculations.
//!
//! Derives every figure on the viability report from one
//! [`ViabilityInputs`] snapshot. Each step is a fixed formula; nothing feeds
//! back into an earlier step.
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Nights booked per month and short-let income; pick effective income |
//! | 2    | Deposit / mortgage split (cash buys take the full price as deposit) |
//! | 3    | Transaction tax and upfront cash required |
//! | 4    | Monthly mortgage payment (interest approximation) |
//! | 5    | Management fee (short-lets add a fixed monthly surcharge) |
//! | 6    | Monthly expenditure, monthly and annual profit |
//! | 7    | Corporation tax on the annual profit |
//! | 8    | Net profit and ROI on upfront cash |
//! | 9    | Stress test at a higher hypothetical rate |
//!
//! The monthly mortgage payment here is `mortgage × rate / 12` plus the
//! arrangement fee spread over the term. It is not an amortized payment and
//! deliberately differs from the comparison tool's figure
//! (see [`crate::calculations::comparison`]).
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use btl_core::calculations::{ViabilityCalculator, ViabilityConfig};
//! use btl_core::{RateTable, ViabilityInputs};
//!
//! let config = ViabilityConfig::default();
//! let table = RateTable::from_april_2025();
//! let inputs = ViabilityInputs::default();
//!
//! let result = ViabilityCalculator::new(&config, &table)
//!     .calculate(&inputs)
//!     .unwrap();
//!
//! assert_eq!(result.mortgage_amount, dec!(315000));
//! assert_eq!(result.stamp_duty, dec!(32000));
//! assert!(result.stress_test.passes);
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{monthly_rate, months, percent_of, ratio_percent};
use crate::calculations::corporation_tax::{
    CorporationTaxConfig, CorporationTaxConfigError, CorporationTaxResult, corporation_tax,
};
use crate::calculations::stamp_duty::{StampDutyCalculator, StampDutyError};
use crate::{RateTable, ViabilityInputs};

const DAYS_PER_YEAR: Decimal = Decimal::from_parts(365, 0, 0, false, 0);
const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Errors in the calculator configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViabilityConfigError {
    #[error("short-let management surcharge must be non-negative, got {0}")]
    InvalidSurcharge(Decimal),

    #[error("stress test rate must be non-negative, got {0}")]
    InvalidStressRate(Decimal),

    #[error("stress test multiplier must be positive, got {0}")]
    InvalidStressMultiplier(Decimal),

    #[error(transparent)]
    CorporationTax(#[from] CorporationTaxConfigError),
}

/// Errors that can occur during viability calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViabilityError {
    /// A mortgage purchase needs a term to spread the arrangement fee over.
    #[error("mortgage term must be at least one year, got {0}")]
    InvalidTerm(u32),

    /// A figure grew past what a `Decimal` can hold.
    #[error("{figure} is too large to calculate")]
    Overflow { figure: &'static str },

    #[error(transparent)]
    StampDuty(#[from] StampDutyError),

    #[error(transparent)]
    Config(#[from] ViabilityConfigError),
}

fn checked(
    value: Option<Decimal>,
    figure: &'static str,
) -> Result<Decimal, ViabilityError> {
    value.ok_or(ViabilityError::Overflow { figure })
}

/// Fixed assumptions of the viability calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViabilityConfig {
    /// Flat monthly charge added to short-let management fees (cleaning,
    /// linen, guest handling).
    pub short_let_management_surcharge: Decimal,

    /// Hypothetical annual rate (percent) used by the stress test.
    pub stress_rate: Decimal,

    /// Rent must cover the stressed payment by this factor.
    pub stress_multiplier: Decimal,

    pub corporation_tax: CorporationTaxConfig,
}

impl Default for ViabilityConfig {
    fn default() -> Self {
        Self {
            short_let_management_surcharge: Decimal::from(300),
            stress_rate: Decimal::new(55, 1),
            stress_multiplier: Decimal::new(125, 2),
            corporation_tax: CorporationTaxConfig::default(),
        }
    }
}

impl ViabilityConfig {
    pub fn validate(&self) -> Result<(), ViabilityConfigError> {
        if self.short_let_management_surcharge < Decimal::ZERO {
            return Err(ViabilityConfigError::InvalidSurcharge(
                self.short_let_management_surcharge,
            ));
        }
        if self.stress_rate < Decimal::ZERO {
            return Err(ViabilityConfigError::InvalidStressRate(self.stress_rate));
        }
        if self.stress_multiplier <= Decimal::ZERO {
            return Err(ViabilityConfigError::InvalidStressMultiplier(
                self.stress_multiplier,
            ));
        }
        self.corporation_tax.validate()?;
        Ok(())
    }
}

/// Outcome of the affordability stress test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressTestResult {
    pub stress_rate: Decimal,

    /// Interest-only payment at the stress rate.
    pub stress_payment: Decimal,

    /// `stress_payment × multiplier`.
    pub min_required_rent: Decimal,

    /// Long-term rent estimate for short-lets, actual rent for ASTs.
    pub comparison_income: Decimal,

    pub passes: bool,
}

/// Every derived figure of the viability report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViabilityResult {
    pub nights_occupied_per_month: Decimal,
    pub short_let_income: Decimal,

    /// Income actually used for profit: short-let or AST rent.
    pub monthly_rental_income: Decimal,

    pub deposit: Decimal,
    pub mortgage_amount: Decimal,
    pub stamp_duty: Decimal,

    /// Deposit + stamp duty + legal/broker fees + renovation.
    pub upfront_cash: Decimal,

    pub monthly_mortgage_payment: Decimal,
    pub management_fee: Decimal,
    pub total_monthly_expenditure: Decimal,
    pub monthly_profit: Decimal,
    pub annual_profit: Decimal,
    pub corporation_tax: CorporationTaxResult,
    pub net_annual_profit: Decimal,

    /// Net annual profit as a percentage of upfront cash; zero when no cash
    /// is put in.
    pub roi: Decimal,

    pub stress_test: StressTestResult,
}

/// Calculator bound to a configuration and a rate table.
#[derive(Debug, Clone, Copy)]
pub struct ViabilityCalculator<'a> {
    config: &'a ViabilityConfig,
    table: &'a RateTable,
}

impl<'a> ViabilityCalculator<'a> {
    pub fn new(
        config: &'a ViabilityConfig,
        table: &'a RateTable,
    ) -> Self {
        Self { config, table }
    }

    /// Derives the full report for one input snapshot.
    ///
    /// # Errors
    ///
    /// - [`ViabilityError::Config`] if the configuration is invalid
    /// - [`ViabilityError::InvalidTerm`] for a mortgage with a zero-year term
    /// - [`ViabilityError::StampDuty`] if the rate table lacks the pair
    /// - [`ViabilityError::Overflow`] if an input is too large to carry through
    pub fn calculate(
        &self,
        inputs: &ViabilityInputs,
    ) -> Result<ViabilityResult, ViabilityError> {
        self.config.validate()?;

        let property = &inputs.property;
        let rental = &inputs.rental;
        let mortgage = &inputs.mortgage;
        let is_cash = property.purchase_method.is_cash();

        // Step 1: income
        let nights_occupied_per_month = checked(
            nights_per_month(rental.occupancy_percent),
            "nights occupied per month",
        )?;
        let short_let_income = checked(
            short_let_income(rental.occupancy_percent, rental.nightly_rate),
            "short-let income",
        )?;
        let monthly_rental_income = if rental.rental_type.is_short_let() {
            short_let_income
        } else {
            rental.ast_monthly_rent
        };

        // Step 2: deposit / mortgage split
        let (deposit, mortgage_amount) = if is_cash {
            (property.purchase_price, Decimal::ZERO)
        } else {
            let deposit = checked(
                percent_of(property.purchase_price, property.deposit_percent),
                "deposit",
            )?;
            let mortgage_amount =
                checked(property.purchase_price.checked_sub(deposit), "mortgage amount")?;
            (deposit, mortgage_amount)
        };

        // Step 3: upfront cash
        let stamp_duty = StampDutyCalculator::new(self.table).calculate(
            property.purchase_price,
            property.country,
            property.category,
        )?;
        let upfront_cash = checked(
            deposit
                .checked_add(stamp_duty)
                .and_then(|sum| sum.checked_add(property.legal_broker_fees))
                .and_then(|sum| sum.checked_add(property.renovation_cost)),
            "upfront cash",
        )?;

        // Step 4: mortgage payment
        let monthly_mortgage_payment = if is_cash {
            Decimal::ZERO
        } else {
            interest_approximation_payment(
                mortgage_amount,
                mortgage.interest_rate,
                mortgage.arrangement_fee,
                mortgage.term_years,
            )?
        };

        // Step 5: management
        let management_fee = checked(
            self.management_fee(
                monthly_rental_income,
                rental.management_fee_percent,
                rental.rental_type.is_short_let(),
            ),
            "management fee",
        )?;

        // Step 6: profit
        let total_monthly_expenditure = checked(
            monthly_mortgage_payment
                .checked_add(management_fee)
                .and_then(|sum| sum.checked_add(rental.council_tax))
                .and_then(|sum| sum.checked_add(rental.utilities)),
            "monthly expenditure",
        )?;
        let monthly_profit = checked(
            monthly_rental_income.checked_sub(total_monthly_expenditure),
            "monthly profit",
        )?;
        let annual_profit = checked(monthly_profit.checked_mul(MONTHS_PER_YEAR), "annual profit")?;

        // Steps 7 and 8: tax and return
        let corporation_tax = corporation_tax(annual_profit, &self.config.corporation_tax);
        let net_annual_profit = checked(
            annual_profit.checked_sub(corporation_tax.tax),
            "net annual profit",
        )?;
        let roi = checked(ratio_percent(net_annual_profit, upfront_cash), "return on cash")?;

        // Step 9: stress test
        let comparison_income = if rental.rental_type.is_short_let() {
            rental.estimated_long_term_rent
        } else {
            rental.ast_monthly_rent
        };
        let stress_test = self.stress_test(mortgage_amount, comparison_income, is_cash)?;

        debug!(
            %monthly_rental_income,
            %mortgage_amount,
            %stamp_duty,
            %monthly_profit,
            %roi,
            stress_passes = stress_test.passes,
            "computed viability"
        );

        Ok(ViabilityResult {
            nights_occupied_per_month,
            short_let_income,
            monthly_rental_income,
            deposit,
            mortgage_amount,
            stamp_duty,
            upfront_cash,
            monthly_mortgage_payment,
            management_fee,
            total_monthly_expenditure,
            monthly_profit,
            annual_profit,
            corporation_tax,
            net_annual_profit,
            roi,
            stress_test,
        })
    }

    fn management_fee(
        &self,
        income: Decimal,
        fee_percent: Decimal,
        short_let: bool,
    ) -> Option<Decimal> {
        let fee = percent_of(income, fee_percent)?;
        if short_let {
            fee.checked_add(self.config.short_let_management_surcharge)
        } else {
            Some(fee)
        }
    }

    fn stress_test(
        &self,
        mortgage_amount: Decimal,
        comparison_income: Decimal,
        is_cash: bool,
    ) -> Result<StressTestResult, ViabilityError> {
        if is_cash {
            return Ok(StressTestResult {
                stress_rate: self.config.stress_rate,
                stress_payment: Decimal::ZERO,
                min_required_rent: Decimal::ZERO,
                comparison_income,
                passes: true,
            });
        }

        let stress_payment = checked(
            mortgage_amount.checked_mul(monthly_rate(self.config.stress_rate)),
            "stressed payment",
        )?;
        let min_required_rent = checked(
            stress_payment.checked_mul(self.config.stress_multiplier),
            "minimum required rent",
        )?;

        Ok(StressTestResult {
            stress_rate: self.config.stress_rate,
            stress_payment,
            min_required_rent,
            comparison_income,
            passes: comparison_income >= min_required_rent,
        })
    }
}

/// `365 × occupancy% / 12`.
fn nights_per_month(occupancy_percent: Decimal) -> Option<Decimal> {
    percent_of(DAYS_PER_YEAR, occupancy_percent)?.checked_div(MONTHS_PER_YEAR)
}

/// Nights per month × nightly rate, dividing by twelve last so whole
/// figures stay exact.
fn short_let_income(
    occupancy_percent: Decimal,
    nightly_rate: Decimal,
) -> Option<Decimal> {
    percent_of(DAYS_PER_YEAR, occupancy_percent)?
        .checked_mul(nightly_rate)?
        .checked_div(MONTHS_PER_YEAR)
}

/// Monthly interest on the mortgage plus the arrangement fee spread evenly
/// over the term.
///
/// # Errors
///
/// [`ViabilityError::InvalidTerm`] when `term_years` is zero,
/// [`ViabilityError::Overflow`] when the payment does not fit in a `Decimal`.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use btl_core::calculations::viability::interest_approximation_payment;
///
/// let payment = interest_approximation_payment(dec!(120000), dec!(5), dec!(1200), 5).unwrap();
///
/// // 120,000 × 5% / 12 + 1,200 / 60
/// assert_eq!(payment, dec!(520));
/// ```
pub fn interest_approximation_payment(
    mortgage_amount: Decimal,
    annual_rate_percent: Decimal,
    arrangement_fee: Decimal,
    term_years: u32,
) -> Result<Decimal, ViabilityError> {
    if term_years == 0 {
        return Err(ViabilityError::InvalidTerm(term_years));
    }
    checked(
        mortgage_amount
            .checked_mul(monthly_rate(annual_rate_percent))
            .zip(arrangement_fee.checked_div(months(term_years)))
            .and_then(|(interest, fee)| interest.checked_add(fee)),
        "monthly mortgage payment",
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::common::round_half_up;
    use crate::calculations::corporation_tax::CorporationTaxBand;
    use crate::{InputField, PurchaseMethod, RentalType};

    fn calculate(inputs: &ViabilityInputs) -> Result<ViabilityResult, ViabilityError> {
        let config = ViabilityConfig::default();
        let table = RateTable::from_april_2025();
        ViabilityCalculator::new(&config, &table).calculate(inputs)
    }

    fn edit(
        inputs: ViabilityInputs,
        field: InputField,
        raw: &str,
    ) -> ViabilityInputs {
        inputs.with_field(field, raw).unwrap()
    }

    // =========================================================================
    // reference property (defaults)
    // =========================================================================

    #[test]
    fn default_inputs_income() {
        let result = calculate(&ViabilityInputs::default()).unwrap();

        assert_eq!(round_half_up(result.nights_occupied_per_month), dec!(21.29));
        assert_eq!(result.short_let_income, dec!(3832.5));
        assert_eq!(result.monthly_rental_income, dec!(3832.5));
    }

    #[test]
    fn default_inputs_purchase_split() {
        let result = calculate(&ViabilityInputs::default()).unwrap();

        assert_eq!(result.deposit, dec!(105000));
        assert_eq!(result.mortgage_amount, dec!(315000));
        assert_eq!(result.stamp_duty, dec!(32000));
        assert_eq!(result.upfront_cash, dec!(144328));
    }

    #[test]
    fn default_inputs_monthly_figures() {
        let result = calculate(&ViabilityInputs::default()).unwrap();

        // 315,000 × 4.9% / 12 + 4,000 / 60
        assert_eq!(round_half_up(result.monthly_mortgage_payment), dec!(1352.92));
        // 3,832.50 × 18% + 300
        assert_eq!(result.management_fee, dec!(989.85));
        assert_eq!(round_half_up(result.total_monthly_expenditure), dec!(2676.52));
        assert_eq!(round_half_up(result.monthly_profit), dec!(1155.98));
        assert_eq!(round_half_up(result.annual_profit), dec!(13871.80));
    }

    #[test]
    fn default_inputs_tax_and_return() {
        let result = calculate(&ViabilityInputs::default()).unwrap();

        assert_eq!(result.corporation_tax.band, CorporationTaxBand::SmallProfits);
        assert_eq!(round_half_up(result.corporation_tax.tax), dec!(2635.64));
        assert_eq!(round_half_up(result.corporation_tax.effective_rate), dec!(19.00));
        assert_eq!(round_half_up(result.net_annual_profit), dec!(11236.16));
        assert_eq!(round_half_up(result.roi), dec!(7.79));
    }

    #[test]
    fn default_inputs_stress_test_uses_long_term_estimate() {
        let result = calculate(&ViabilityInputs::default()).unwrap();

        assert_eq!(result.stress_test.stress_payment, dec!(1443.75));
        assert_eq!(result.stress_test.min_required_rent, dec!(1804.6875));
        assert_eq!(result.stress_test.comparison_income, dec!(2000));
        assert!(result.stress_test.passes);
    }

    #[test]
    fn pre_2025_table_changes_only_tax_driven_figures() {
        let config = ViabilityConfig::default();
        let table = RateTable::pre_april_2025();

        let result = ViabilityCalculator::new(&config, &table)
            .calculate(&ViabilityInputs::default())
            .unwrap();

        // 250,000 × 3% + 170,000 × 8%
        assert_eq!(result.stamp_duty, dec!(21100));
        assert_eq!(result.upfront_cash, dec!(133428));
        assert_eq!(result.mortgage_amount, dec!(315000));
    }

    // =========================================================================
    // purchase method
    // =========================================================================

    #[test]
    fn cash_purchase_has_no_mortgage() {
        let inputs = edit(ViabilityInputs::default(), InputField::PurchaseMethod, "cash");

        let result = calculate(&inputs).unwrap();

        assert_eq!(inputs.property.purchase_method, PurchaseMethod::Cash);
        assert_eq!(result.mortgage_amount, Decimal::ZERO);
        assert_eq!(result.monthly_mortgage_payment, Decimal::ZERO);
        assert_eq!(result.deposit, dec!(420000));
        assert_eq!(result.upfront_cash, dec!(459328));
    }

    #[test]
    fn cash_purchase_always_passes_stress_test() {
        let inputs = edit(ViabilityInputs::default(), InputField::PurchaseMethod, "cash");
        let inputs = edit(inputs, InputField::EstimatedLongTermRent, "0");

        let result = calculate(&inputs).unwrap();

        assert!(result.stress_test.passes);
        assert_eq!(result.stress_test.min_required_rent, Decimal::ZERO);
    }

    #[test]
    fn cash_purchase_ignores_zero_term() {
        let inputs = edit(ViabilityInputs::default(), InputField::PurchaseMethod, "cash");
        let inputs = edit(inputs, InputField::TermYears, "0");

        assert!(calculate(&inputs).is_ok());
    }

    #[test]
    fn mortgage_with_zero_term_is_rejected() {
        let inputs = edit(ViabilityInputs::default(), InputField::TermYears, "0");

        assert_eq!(calculate(&inputs), Err(ViabilityError::InvalidTerm(0)));
    }

    // =========================================================================
    // rental type
    // =========================================================================

    #[test]
    fn ast_uses_fixed_rent_without_surcharge() {
        let inputs = edit(ViabilityInputs::default(), InputField::RentalType, "ast");
        let inputs = edit(inputs, InputField::AstMonthlyRent, "2500");

        let result = calculate(&inputs).unwrap();

        assert_eq!(inputs.rental.rental_type, RentalType::Ast);
        assert_eq!(result.monthly_rental_income, dec!(2500));
        assert_eq!(result.management_fee, dec!(450));
        assert_eq!(result.stress_test.comparison_income, dec!(2500));
        assert!(result.stress_test.passes);
    }

    #[test]
    fn ast_rent_below_stressed_payment_fails() {
        let inputs = edit(ViabilityInputs::default(), InputField::RentalType, "ast");
        let inputs = edit(inputs, InputField::AstMonthlyRent, "1500");

        let result = calculate(&inputs).unwrap();

        assert!(!result.stress_test.passes);
    }

    #[test]
    fn short_let_stress_test_ignores_nightly_income() {
        let inputs = edit(ViabilityInputs::default(), InputField::NightlyRate, "1000");
        let inputs = edit(inputs, InputField::EstimatedLongTermRent, "1200");

        let result = calculate(&inputs).unwrap();

        assert!(result.monthly_rental_income > dec!(20000));
        assert!(!result.stress_test.passes);
    }

    // =========================================================================
    // losses
    // =========================================================================

    #[test]
    fn loss_leaves_net_profit_unchanged() {
        let inputs = edit(ViabilityInputs::default(), InputField::NightlyRate, "50");

        let result = calculate(&inputs).unwrap();

        assert!(result.annual_profit < Decimal::ZERO);
        assert_eq!(result.corporation_tax.tax, Decimal::ZERO);
        assert_eq!(result.net_annual_profit, result.annual_profit);
        assert!(result.roi < Decimal::ZERO);
    }

    #[test]
    fn zero_upfront_cash_reports_zero_roi() {
        let mut inputs = edit(ViabilityInputs::default(), InputField::PurchaseMethod, "cash");
        for field in [
            InputField::PurchasePrice,
            InputField::LegalBrokerFees,
            InputField::RenovationCost,
        ] {
            inputs = edit(inputs, field, "0");
        }

        let result = calculate(&inputs).unwrap();

        assert_eq!(result.upfront_cash, Decimal::ZERO);
        assert_eq!(result.roi, Decimal::ZERO);
    }

    // =========================================================================
    // oversized inputs
    // =========================================================================

    #[test]
    fn largest_price_reports_overflow() {
        let inputs = edit(
            ViabilityInputs::default(),
            InputField::PurchasePrice,
            "79228162514264337593543950335",
        );

        assert_eq!(
            calculate(&inputs),
            Err(ViabilityError::Overflow { figure: "deposit" })
        );
    }

    #[test]
    fn largest_cash_price_reports_overflow() {
        let inputs = edit(ViabilityInputs::default(), InputField::PurchaseMethod, "cash");
        let inputs = edit(inputs, InputField::PurchasePrice, "79228162514264337593543950335");

        assert_eq!(
            calculate(&inputs),
            Err(ViabilityError::Overflow {
                figure: "upfront cash"
            })
        );
    }

    #[test]
    fn huge_nightly_rate_reports_overflow() {
        let inputs = edit(
            ViabilityInputs::default(),
            InputField::NightlyRate,
            "1000000000000000000000000000",
        );

        assert_eq!(
            calculate(&inputs),
            Err(ViabilityError::Overflow {
                figure: "short-let income"
            })
        );
    }

    #[test]
    fn interest_approximation_reports_overflow() {
        assert_eq!(
            interest_approximation_payment(Decimal::MAX, dec!(2400), dec!(0), 5),
            Err(ViabilityError::Overflow {
                figure: "monthly mortgage payment"
            })
        );
    }

    // =========================================================================
    // configuration
    // =========================================================================

    #[test]
    fn config_validate_rejects_zero_multiplier() {
        let config = ViabilityConfig {
            stress_multiplier: Decimal::ZERO,
            ..Default::default()
        };

        assert_eq!(
            config.validate(),
            Err(ViabilityConfigError::InvalidStressMultiplier(Decimal::ZERO))
        );
    }

    #[test]
    fn invalid_config_surfaces_from_calculate() {
        let config = ViabilityConfig {
            short_let_management_surcharge: dec!(-1),
            ..Default::default()
        };
        let table = RateTable::from_april_2025();

        let result =
            ViabilityCalculator::new(&config, &table).calculate(&ViabilityInputs::default());

        assert_eq!(
            result,
            Err(ViabilityError::Config(ViabilityConfigError::InvalidSurcharge(
                dec!(-1)
            )))
        );
    }

    #[test]
    fn interest_approximation_rejects_zero_term() {
        assert_eq!(
            interest_approximation_payment(dec!(100000), dec!(5), dec!(0), 0),
            Err(ViabilityError::InvalidTerm(0))
        );
    }
}
