//! Side-by-side comparison of mortgage offers.
//!
//! Each offer finances `loan + arrangement fee + broker fee`. Repayment
//! offers are fully amortized over the term; interest-only offers pay
//! interest monthly and the financed principal at the end. Monthly and legal
//! fees are paid on top and count towards the total cost.
//!
//! The cheapest offer by total cost wins. Ties go to the offer listed first.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use btl_core::MortgageOffer;
//! use btl_core::calculations::compare_offers;
//!
//! let offers = MortgageOffer::default_set(dec!(315000));
//! let result = compare_offers(&offers).unwrap();
//!
//! assert_eq!(result.per_offer.len(), 3);
//! assert!(offers.contains(&result.winner));
//! ```

use std::collections::{BTreeMap, HashSet};

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{monthly_rate, months, ratio_percent};
use crate::{MAX_OFFERS, MortgageOffer, PaymentType};

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComparisonError {
    #[error("no mortgage offers to compare")]
    NoOffers,

    #[error("at most three offers can be compared, got {0}")]
    TooManyOffers(usize),

    #[error("offer id {0} appears more than once")]
    DuplicateOfferId(u32),

    #[error("offer {offer_id} has a zero-year term")]
    InvalidTerm { offer_id: u32 },

    #[error("arithmetic overflow while costing offer {offer_id}")]
    Overflow { offer_id: u32 },
}

/// Derived cost figures for one offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferMetrics {
    /// Loan plus arrangement and broker fees.
    pub financed_amount: Decimal,
    pub monthly_payment: Decimal,
    pub total_interest: Decimal,

    /// All payments, any principal due at term end, monthly fees and the
    /// legal fee.
    pub total_cost: Decimal,

    /// Twelve monthly payments.
    pub first_year_total: Decimal,

    /// `(total cost − loan) / loan / years × 100`; zero for a zero loan.
    pub effective_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub per_offer: BTreeMap<u32, OfferMetrics>,
    pub winner: MortgageOffer,
}

impl ComparisonResult {
    pub fn winner_metrics(&self) -> Option<&OfferMetrics> {
        self.per_offer.get(&self.winner.id)
    }
}

/// Costs every offer and picks the cheapest.
///
/// # Errors
///
/// - [`ComparisonError::NoOffers`] / [`ComparisonError::TooManyOffers`] when
///   the list is empty or longer than [`MAX_OFFERS`]
/// - [`ComparisonError::DuplicateOfferId`] when two offers share an id
/// - any error from [`offer_metrics`]
pub fn compare_offers(offers: &[MortgageOffer]) -> Result<ComparisonResult, ComparisonError> {
    if offers.is_empty() {
        return Err(ComparisonError::NoOffers);
    }
    if offers.len() > MAX_OFFERS {
        return Err(ComparisonError::TooManyOffers(offers.len()));
    }

    let mut seen = HashSet::new();
    for offer in offers {
        if !seen.insert(offer.id) {
            return Err(ComparisonError::DuplicateOfferId(offer.id));
        }
    }

    let mut per_offer = BTreeMap::new();
    let mut winner: Option<(&MortgageOffer, Decimal)> = None;

    for offer in offers {
        let metrics = offer_metrics(offer)?;
        let cheaper = match winner {
            Some((_, best)) => metrics.total_cost < best,
            None => true,
        };
        if cheaper {
            winner = Some((offer, metrics.total_cost));
        }
        per_offer.insert(offer.id, metrics);
    }

    let (winner, total_cost) = winner.ok_or(ComparisonError::NoOffers)?;
    debug!(winner = winner.id, %total_cost, "compared mortgage offers");

    Ok(ComparisonResult {
        per_offer,
        winner: winner.clone(),
    })
}

/// Costs a single offer.
///
/// # Errors
///
/// - [`ComparisonError::InvalidTerm`] for a zero-year term
/// - [`ComparisonError::Overflow`] if the compounding factor or a product
///   does not fit in a `Decimal`
pub fn offer_metrics(offer: &MortgageOffer) -> Result<OfferMetrics, ComparisonError> {
    if offer.term_years == 0 {
        return Err(ComparisonError::InvalidTerm { offer_id: offer.id });
    }

    let overflow = || ComparisonError::Overflow { offer_id: offer.id };

    let financed_amount = offer
        .loan_amount
        .checked_add(offer.arrangement_fee)
        .and_then(|amount| amount.checked_add(offer.broker_fee))
        .ok_or_else(overflow)?;
    let n = months(offer.term_years);
    let rate = monthly_rate(offer.interest_rate);

    let (monthly_payment, total_interest, repaid) = match offer.payment_type {
        PaymentType::Repayment => {
            let payment = amortized_payment(financed_amount, rate, offer.term_years)
                .ok_or_else(overflow)?;
            let paid = payment.checked_mul(n).ok_or_else(overflow)?;
            let interest = paid.checked_sub(financed_amount).ok_or_else(overflow)?;
            (payment, interest, paid)
        }
        PaymentType::InterestOnly => {
            let payment = financed_amount.checked_mul(rate).ok_or_else(overflow)?;
            let interest = payment.checked_mul(n).ok_or_else(overflow)?;
            let paid = interest.checked_add(financed_amount).ok_or_else(overflow)?;
            (payment, interest, paid)
        }
    };

    let total_cost = offer
        .monthly_fee
        .checked_mul(n)
        .and_then(|fees| fees.checked_add(repaid))
        .and_then(|cost| cost.checked_add(offer.legal_fee))
        .ok_or_else(overflow)?;

    let effective_rate = total_cost
        .checked_sub(offer.loan_amount)
        .and_then(|extra| ratio_percent(extra, offer.loan_amount))
        .and_then(|total| total.checked_div(Decimal::from(offer.term_years)))
        .ok_or_else(overflow)?;
    let first_year_total = monthly_payment
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or_else(overflow)?;

    Ok(OfferMetrics {
        financed_amount,
        monthly_payment,
        total_interest,
        total_cost,
        first_year_total,
        effective_rate,
    })
}

/// Level monthly payment that clears `principal` over `term_years`.
///
/// A zero rate repays the principal in equal instalments. Returns `None`
/// when `(1 + rate)^n` overflows or the term is zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use btl_core::calculations::comparison::amortized_payment;
/// use btl_core::calculations::common::{monthly_rate, round_half_up};
///
/// let payment = amortized_payment(dec!(100000), monthly_rate(dec!(5)), 25).unwrap();
/// assert_eq!(round_half_up(payment), dec!(584.59));
///
/// assert_eq!(amortized_payment(dec!(1200), dec!(0), 1), Some(dec!(100)));
/// ```
pub fn amortized_payment(
    principal: Decimal,
    monthly_rate: Decimal,
    term_years: u32,
) -> Option<Decimal> {
    if term_years == 0 {
        return None;
    }
    let n = months(term_years);
    if monthly_rate.is_zero() {
        return principal.checked_div(n);
    }

    let growth = (Decimal::ONE + monthly_rate).checked_powi(i64::from(term_years) * 12)?;
    let denominator = growth - Decimal::ONE;
    if denominator.is_zero() {
        return principal.checked_div(n);
    }

    principal
        .checked_mul(monthly_rate)?
        .checked_mul(growth)?
        .checked_div(denominator)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::common::round_half_up;

    fn offer(
        id: u32,
        loan_amount: Decimal,
        interest_rate: Decimal,
        term_years: u32,
    ) -> MortgageOffer {
        MortgageOffer {
            id,
            name: format!("Offer {id}"),
            loan_amount,
            interest_rate,
            term_years,
            arrangement_fee: Decimal::ZERO,
            broker_fee: Decimal::ZERO,
            monthly_fee: Decimal::ZERO,
            legal_fee: Decimal::ZERO,
            payment_type: PaymentType::Repayment,
        }
    }

    fn interest_only_at_cost(
        id: u32,
        total: Decimal,
    ) -> MortgageOffer {
        MortgageOffer {
            payment_type: PaymentType::InterestOnly,
            ..offer(id, total, Decimal::ZERO, 5)
        }
    }

    // =========================================================================
    // repayment
    // =========================================================================

    #[test]
    fn repayment_reference_loan() {
        let metrics = offer_metrics(&offer(1, dec!(100000), dec!(5), 25)).unwrap();

        assert_eq!(round_half_up(metrics.monthly_payment), dec!(584.59));
        assert_eq!(
            metrics.total_interest,
            metrics.monthly_payment * dec!(300) - dec!(100000)
        );
        assert_eq!(round_half_up(metrics.total_cost), dec!(175377.01));
        assert_eq!(
            metrics.first_year_total,
            metrics.monthly_payment * dec!(12)
        );
    }

    #[test]
    fn repayment_finances_arrangement_and_broker_fees() {
        let with_fees = MortgageOffer {
            arrangement_fee: dec!(2000),
            broker_fee: dec!(500),
            ..offer(1, dec!(97500), dec!(5), 25)
        };

        let metrics = offer_metrics(&with_fees).unwrap();
        let plain = offer_metrics(&offer(2, dec!(100000), dec!(5), 25)).unwrap();

        assert_eq!(metrics.financed_amount, dec!(100000));
        assert_eq!(metrics.monthly_payment, plain.monthly_payment);
    }

    #[test]
    fn repayment_zero_rate_divides_evenly() {
        let metrics = offer_metrics(&offer(1, dec!(120000), Decimal::ZERO, 10)).unwrap();

        assert_eq!(metrics.monthly_payment, dec!(1000));
        assert_eq!(metrics.total_interest, Decimal::ZERO);
        assert_eq!(metrics.total_cost, dec!(120000));
        assert_eq!(metrics.effective_rate, Decimal::ZERO);
    }

    // =========================================================================
    // interest-only
    // =========================================================================

    #[test]
    fn interest_only_pays_principal_at_term_end() {
        let interest_only = MortgageOffer {
            payment_type: PaymentType::InterestOnly,
            ..offer(1, dec!(300000), dec!(6), 5)
        };

        let metrics = offer_metrics(&interest_only).unwrap();

        assert_eq!(metrics.monthly_payment, dec!(1500));
        assert_eq!(metrics.total_interest, dec!(90000));
        assert_eq!(metrics.total_cost, dec!(390000));
        // 90,000 / 300,000 / 5 years
        assert_eq!(metrics.effective_rate, dec!(6));
    }

    #[test]
    fn monthly_and_legal_fees_add_to_total_cost() {
        let with_fees = MortgageOffer {
            payment_type: PaymentType::InterestOnly,
            monthly_fee: dec!(10),
            legal_fee: dec!(750),
            ..offer(1, dec!(300000), dec!(6), 5)
        };

        let metrics = offer_metrics(&with_fees).unwrap();

        assert_eq!(metrics.total_cost, dec!(390000) + dec!(600) + dec!(750));
        assert_eq!(metrics.first_year_total, dec!(18000));
    }

    // =========================================================================
    // edge cases
    // =========================================================================

    #[test]
    fn zero_loan_has_zero_effective_rate() {
        let metrics = offer_metrics(&offer(1, Decimal::ZERO, dec!(5), 5)).unwrap();

        assert_eq!(metrics.total_cost, Decimal::ZERO);
        assert_eq!(metrics.effective_rate, Decimal::ZERO);
    }

    #[test]
    fn zero_term_is_rejected() {
        assert_eq!(
            offer_metrics(&offer(7, dec!(100000), dec!(5), 0)),
            Err(ComparisonError::InvalidTerm { offer_id: 7 })
        );
    }

    #[test]
    fn runaway_compounding_overflows() {
        let absurd = offer(3, dec!(100000), dec!(100000000), 40);

        assert_eq!(
            offer_metrics(&absurd),
            Err(ComparisonError::Overflow { offer_id: 3 })
        );
    }

    // =========================================================================
    // compare_offers
    // =========================================================================

    #[test]
    fn cheapest_offer_wins() {
        let offers = vec![
            offer(1, dec!(200000), dec!(5.2), 5),
            offer(2, dec!(200000), dec!(4.7), 5),
            offer(3, dec!(200000), dec!(4.9), 5),
        ];

        let result = compare_offers(&offers).unwrap();

        assert_eq!(result.winner.id, 2);
        assert_eq!(result.per_offer.len(), 3);
        assert_eq!(
            result.winner_metrics(),
            result.per_offer.get(&2)
        );
    }

    #[test]
    fn first_of_equal_minimums_wins() {
        let offers = vec![
            interest_only_at_cost(1, dec!(500000)),
            interest_only_at_cost(2, dec!(480000)),
            interest_only_at_cost(3, dec!(480000)),
        ];

        let result = compare_offers(&offers).unwrap();

        assert_eq!(result.per_offer[&2].total_cost, dec!(480000));
        assert_eq!(result.per_offer[&3].total_cost, dec!(480000));
        assert_eq!(result.winner.id, 2);
    }

    #[test]
    fn single_offer_wins_by_default() {
        let result = compare_offers(&[offer(9, dec!(1000), dec!(3), 1)]).unwrap();

        assert_eq!(result.winner.id, 9);
    }

    #[test]
    fn empty_list_is_rejected() {
        assert_eq!(compare_offers(&[]), Err(ComparisonError::NoOffers));
    }

    #[test]
    fn more_than_three_offers_is_rejected() {
        let offers: Vec<_> = (1..=4).map(|id| offer(id, dec!(1000), dec!(3), 1)).collect();

        assert_eq!(
            compare_offers(&offers),
            Err(ComparisonError::TooManyOffers(4))
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let offers = vec![
            offer(1, dec!(1000), dec!(3), 1),
            offer(1, dec!(2000), dec!(3), 1),
        ];

        assert_eq!(
            compare_offers(&offers),
            Err(ComparisonError::DuplicateOfferId(1))
        );
    }

    #[test]
    fn default_set_costs_cleanly() {
        let result = compare_offers(&MortgageOffer::default_set(dec!(315000))).unwrap();

        assert_eq!(
            result.per_offer.keys().copied().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(result.per_offer[&2].financed_amount, dec!(319500));
    }

    // =========================================================================
    // amortization identity
    // =========================================================================

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn amortized_payment_clears_the_balance(
            principal in 1_000i64..1_000_000,
            rate_bps in 1i64..1_500,
            term_years in 1u32..=40,
        ) {
            let principal = Decimal::from(principal);
            let rate = monthly_rate(Decimal::new(rate_bps, 2));
            let payment = amortized_payment(principal, rate, term_years).unwrap();

            let mut balance = principal;
            for _ in 0..term_years * 12 {
                balance = balance * (Decimal::ONE + rate) - payment;
            }

            prop_assert!(balance.abs() < dec!(0.05), "balance left: {balance}");
        }
    }
}
