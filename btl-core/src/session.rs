//! Editing sessions for the two tools.
//!
//! A session owns the current input snapshot and the result derived from
//! it. Edits build a new snapshot and recompute everything; the snapshot and
//! result are only replaced when the recompute succeeds, so the two never
//! disagree.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use crate::calculations::{
    ComparisonError, ComparisonResult, ViabilityCalculator, ViabilityConfig, ViabilityError,
    ViabilityResult, compare_offers,
};
use crate::shared::{MortgageAmountWatcher, SharedMortgageAmount};
use crate::{InputError, InputField, MortgageOffer, OfferField, RateTable, ViabilityInputs};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Viability(#[from] ViabilityError),

    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    #[error("no mortgage offer with id {0}")]
    UnknownOffer(u32),
}

/// The viability calculator's live state.
#[derive(Debug)]
pub struct ViabilitySession {
    config: ViabilityConfig,
    table: RateTable,
    inputs: ViabilityInputs,
    result: ViabilityResult,
    shared: SharedMortgageAmount,
}

impl ViabilitySession {
    /// Computes the first result and publishes its mortgage amount.
    pub fn new(
        config: ViabilityConfig,
        table: RateTable,
        inputs: ViabilityInputs,
        shared: SharedMortgageAmount,
    ) -> Result<Self, SessionError> {
        let result = ViabilityCalculator::new(&config, &table).calculate(&inputs)?;
        shared.publish(result.mortgage_amount);
        info!(table = %table.name, "viability session started");

        Ok(Self {
            config,
            table,
            inputs,
            result,
            shared,
        })
    }

    pub fn inputs(&self) -> &ViabilityInputs {
        &self.inputs
    }

    pub fn result(&self) -> &ViabilityResult {
        &self.result
    }

    pub fn table(&self) -> &RateTable {
        &self.table
    }

    /// Sets one field from raw text and recomputes.
    pub fn apply(
        &mut self,
        field: InputField,
        raw: &str,
    ) -> Result<&ViabilityResult, SessionError> {
        let next = self.inputs.with_field(field, raw)?;
        debug!(field = field.as_str(), raw, "applying viability edit");
        self.replace(next)
    }

    /// Swaps in a whole snapshot and recomputes.
    pub fn replace(
        &mut self,
        inputs: ViabilityInputs,
    ) -> Result<&ViabilityResult, SessionError> {
        let result = ViabilityCalculator::new(&self.config, &self.table).calculate(&inputs)?;
        self.shared.publish(result.mortgage_amount);
        self.inputs = inputs;
        self.result = result;
        Ok(&self.result)
    }
}

/// The offer comparison's live state.
#[derive(Debug)]
pub struct ComparisonSession {
    offers: Vec<MortgageOffer>,
    comparison: ComparisonResult,
    watcher: MortgageAmountWatcher,
}

impl ComparisonSession {
    /// Starts from `offers` as given; call [`Self::sync_loan_amount`] to pick
    /// up amounts published afterwards.
    pub fn new(
        offers: Vec<MortgageOffer>,
        watcher: MortgageAmountWatcher,
    ) -> Result<Self, SessionError> {
        let comparison = compare_offers(&offers)?;
        Ok(Self {
            offers,
            comparison,
            watcher,
        })
    }

    pub fn offers(&self) -> &[MortgageOffer] {
        &self.offers
    }

    pub fn comparison(&self) -> &ComparisonResult {
        &self.comparison
    }

    /// Applies a newly published mortgage amount to every offer.
    ///
    /// Returns `Ok(false)` when nothing was published since the last sync.
    /// An amount the offers cannot take stays pending for the next sync.
    pub fn sync_loan_amount(&mut self) -> Result<bool, SessionError> {
        let Some(amount) = self.watcher.pending_amount() else {
            return Ok(false);
        };
        self.set_loan_amount(amount)?;
        self.watcher.mark_seen(amount);
        Ok(true)
    }

    /// Overwrites the loan amount of every offer and recomputes.
    pub fn set_loan_amount(
        &mut self,
        amount: Decimal,
    ) -> Result<&ComparisonResult, SessionError> {
        let next: Vec<MortgageOffer> = self
            .offers
            .iter()
            .map(|offer| MortgageOffer {
                loan_amount: amount,
                ..offer.clone()
            })
            .collect();
        debug!(%amount, "syncing loan amount across offers");
        self.replace(next)
    }

    /// Sets one field of one offer from raw text and recomputes.
    pub fn apply(
        &mut self,
        offer_id: u32,
        field: OfferField,
        raw: &str,
    ) -> Result<&ComparisonResult, SessionError> {
        let index = self
            .offers
            .iter()
            .position(|offer| offer.id == offer_id)
            .ok_or(SessionError::UnknownOffer(offer_id))?;

        let mut next = self.offers.clone();
        next[index] = next[index].with_field(field, raw)?;
        debug!(offer_id, field = field.as_str(), raw, "applying offer edit");
        self.replace(next)
    }

    /// Swaps in a whole offer set and recomputes.
    pub fn replace(
        &mut self,
        offers: Vec<MortgageOffer>,
    ) -> Result<&ComparisonResult, SessionError> {
        let comparison = compare_offers(&offers)?;
        self.offers = offers;
        self.comparison = comparison;
        Ok(&self.comparison)
    }
}
