//! Plain-text renderings of session state, one `Display` type per command.

use std::fmt;

use btl_core::calculations::StampDutyBreakdown;
use btl_core::{ComparisonSession, Country, PaymentType, ViabilitySession};

use crate::format::{gbp, gbp_pence, percent, rate};

const LABEL_WIDTH: usize = 28;

fn tax_name(country: Country) -> &'static str {
    match country {
        Country::England => "Stamp Duty Land Tax",
        Country::Wales => "Land Transaction Tax",
    }
}

fn row(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    value: &str,
) -> fmt::Result {
    writeln!(f, "  {label:<LABEL_WIDTH$} {value:>14}")
}

pub struct ViabilityReport<'a>(pub &'a ViabilitySession);

impl fmt::Display for ViabilityReport<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let inputs = self.0.inputs();
        let result = self.0.result();
        let property = &inputs.property;
        let rental = &inputs.rental;
        let mortgage = &inputs.mortgage;

        writeln!(
            f,
            "Viability: {} | {} | {} | rates: {}",
            property.country.label(),
            property.category.label(),
            rental.rental_type.label(),
            self.0.table().name
        )?;

        writeln!(f)?;
        writeln!(f, "Purchase")?;
        row(f, "Purchase price", &gbp(property.purchase_price))?;
        if property.purchase_method.is_cash() {
            row(f, "Cash purchase", &gbp(property.purchase_price))?;
        } else {
            row(
                f,
                &format!("Deposit ({})", percent(property.deposit_percent, 0)),
                &gbp(result.deposit),
            )?;
            row(f, "Mortgage amount", &gbp(result.mortgage_amount))?;
        }
        row(f, tax_name(property.country), &gbp(result.stamp_duty))?;
        row(f, "Legal & broker fees", &gbp(property.legal_broker_fees))?;
        row(f, "Renovation", &gbp(property.renovation_cost))?;
        row(f, "Upfront cash", &gbp(result.upfront_cash))?;

        writeln!(f)?;
        writeln!(f, "Monthly")?;
        if rental.rental_type.is_short_let() {
            row(
                f,
                &format!(
                    "Income ({} nights at {})",
                    result.nights_occupied_per_month.round_dp(1).normalize(),
                    gbp(rental.nightly_rate)
                ),
                &gbp_pence(result.monthly_rental_income),
            )?;
        } else {
            row(f, "Rent", &gbp_pence(result.monthly_rental_income))?;
        }
        if !property.purchase_method.is_cash() {
            let kind = match mortgage.payment_type {
                PaymentType::InterestOnly => "interest only",
                PaymentType::Repayment => "repayment",
            };
            row(
                f,
                &format!(
                    "Mortgage ({}, {kind})",
                    percent(mortgage.interest_rate, 2)
                ),
                &gbp_pence(result.monthly_mortgage_payment),
            )?;
        }
        row(
            f,
            &format!("Management ({})", percent(rental.management_fee_percent, 0)),
            &gbp_pence(result.management_fee),
        )?;
        row(f, "Council tax", &gbp_pence(rental.council_tax))?;
        row(f, "Utilities", &gbp_pence(rental.utilities))?;
        row(f, "Total expenditure", &gbp_pence(result.total_monthly_expenditure))?;
        row(f, "Profit", &gbp_pence(result.monthly_profit))?;

        writeln!(f)?;
        writeln!(f, "Annual")?;
        row(f, "Profit before tax", &gbp(result.annual_profit))?;
        row(
            f,
            &format!(
                "Corporation tax ({}, {})",
                result.corporation_tax.band.label().to_lowercase(),
                percent(result.corporation_tax.effective_rate, 2)
            ),
            &gbp(result.corporation_tax.tax),
        )?;
        row(f, "Net profit", &gbp(result.net_annual_profit))?;
        row(f, "Return on cash", &percent(result.roi, 2))?;

        let stress = &result.stress_test;
        writeln!(f)?;
        writeln!(f, "Stress test at {}", percent(stress.stress_rate, 1))?;
        row(f, "Stressed payment", &gbp_pence(stress.stress_payment))?;
        row(f, "Minimum rent", &gbp_pence(stress.min_required_rent))?;
        row(f, "Rent tested", &gbp_pence(stress.comparison_income))?;
        row(f, "Result", if stress.passes { "PASS" } else { "FAIL" })
    }
}

pub struct ComparisonReport<'a>(pub &'a ComparisonSession);

impl fmt::Display for ComparisonReport<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let comparison = self.0.comparison();

        writeln!(
            f,
            "{:<3} {:<22} {:>10} {:>7} {:>5} {:>12} {:>12} {:>12} {:>8}",
            "id", "offer", "loan", "rate", "term", "monthly", "interest", "total", "eff."
        )?;
        for offer in self.0.offers() {
            let Some(metrics) = comparison.per_offer.get(&offer.id) else {
                continue;
            };
            let marker = if offer.id == comparison.winner.id {
                " *"
            } else {
                ""
            };
            writeln!(
                f,
                "{:<3} {:<22} {:>10} {:>7} {:>5} {:>12} {:>12} {:>12} {:>8}{marker}",
                offer.id,
                offer.name,
                gbp(offer.loan_amount),
                percent(offer.interest_rate, 2),
                format!("{}y", offer.term_years),
                gbp_pence(metrics.monthly_payment),
                gbp(metrics.total_interest),
                gbp(metrics.total_cost),
                percent(metrics.effective_rate, 2),
            )?;
        }

        writeln!(f)?;
        write!(f, "Best value: {}", comparison.winner.name)?;
        if let Some(metrics) = comparison.winner_metrics() {
            write!(
                f,
                ", {} over the term, {} in the first year",
                gbp(metrics.total_cost),
                gbp(metrics.first_year_total)
            )?;
        }
        writeln!(f)
    }
}

pub struct StampDutyReport<'a>(pub &'a StampDutyBreakdown);

impl fmt::Display for StampDutyReport<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let breakdown = self.0;

        writeln!(
            f,
            "{} on {} ({}, {})",
            tax_name(breakdown.country),
            gbp(breakdown.price),
            breakdown.country.label(),
            breakdown.category.label()
        )?;
        if breakdown.relief_applied {
            writeln!(f, "First-time buyer relief applied")?;
        }

        for charge in &breakdown.charges {
            let band = match charge.upper_bound {
                Some(upper) => format!("{} to {}", gbp(charge.lower_bound), gbp(upper)),
                None => format!("above {}", gbp(charge.lower_bound)),
            };
            writeln!(
                f,
                "  {band:<26} {:>6} on {:>10} {:>12}",
                rate(charge.rate),
                gbp(charge.taxable_amount),
                gbp_pence(charge.tax)
            )?;
        }

        writeln!(f, "  {:<26} {:>33}", "Total", gbp(breakdown.total))
    }
}
