//! Calculation engines for the buy-to-let tools.
//!
//! Every engine is a pure function of its inputs: the transaction tax
//! engine, the viability report built on it, corporation tax, and the
//! mortgage offer comparison.

pub mod common;
pub mod comparison;
pub mod corporation_tax;
pub mod stamp_duty;
pub mod viability;

pub use comparison::{ComparisonError, ComparisonResult, OfferMetrics, compare_offers, offer_metrics};
pub use corporation_tax::{
    CorporationTaxBand, CorporationTaxConfig, CorporationTaxConfigError, CorporationTaxResult,
    corporation_tax,
};
pub use stamp_duty::{
    BandCharge, StampDutyBreakdown, StampDutyCalculator, StampDutyError, compute_transaction_tax,
};
pub use viability::{
    StressTestResult, ViabilityCalculator, ViabilityConfig, ViabilityConfigError, ViabilityError,
    ViabilityResult,
};
