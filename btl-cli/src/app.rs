use anyhow::{Context, Result, anyhow};
use btl_core::calculations::{StampDutyBreakdown, StampDutyCalculator, ViabilityConfig};
use btl_core::store::{RepositoryRegistry, load_offers_or_default, saved_mortgage_amount};
use btl_core::{
    ComparisonSession, Country, DEFAULT_LOAN_AMOUNT, InputError, InputField, InputRepository,
    MortgageOffer, OfferField, PropertyCategory, RateTable, RepositoryError, SessionError,
    SharedMortgageAmount, ViabilityInputs, ViabilitySession, coerce_decimal,
};
use btl_data::RateTableLoader;
use btl_db_sqlite::SqliteRepositoryFactory;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{AppConfig, RatesSection};

/// A malformed `--set` argument.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("expected field=value, got '{0}'")]
    MissingEquals(String),

    #[error("expected offer_id.field=value, got '{0}'")]
    MissingOfferId(String),

    #[error("'{0}' is not an offer id")]
    InvalidOfferId(String),

    #[error(transparent)]
    Input(#[from] InputError),
}

/// Memory plus every backend crate linked into this binary.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

pub async fn open_repository(config: &AppConfig) -> Result<Box<dyn InputRepository>> {
    build_registry()
        .create(&config.database)
        .await
        .with_context(|| format!("Failed to open {} backend", config.database.backend))
}

/// The CSV table when one is configured, otherwise the embedded schedule.
pub fn load_rate_table(rates: &RatesSection) -> Result<RateTable> {
    let Some(path) = &rates.csv else {
        return Ok(rates.schedule.table());
    };

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "custom".to_string());
    let effective_from = rates
        .effective_from
        .unwrap_or_else(|| rates.schedule.table().effective_from);

    let table = RateTableLoader::load_from_path(path, &name, effective_from)
        .with_context(|| format!("Failed to load rate table: {}", path.display()))?;
    info!(table = %table.name, path = %path.display(), "loaded rate table");
    Ok(table)
}

/// Splits `field=value`.
pub fn parse_edit(raw: &str) -> Result<(InputField, &str), EditError> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| EditError::MissingEquals(raw.to_string()))?;
    Ok((InputField::parse(field)?, value))
}

/// Splits `offer_id.field=value`.
pub fn parse_offer_edit(raw: &str) -> Result<(u32, OfferField, &str), EditError> {
    let (target, value) = raw
        .split_once('=')
        .ok_or_else(|| EditError::MissingEquals(raw.to_string()))?;
    let (id, field) = target
        .split_once('.')
        .ok_or_else(|| EditError::MissingOfferId(raw.to_string()))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| EditError::InvalidOfferId(id.to_string()))?;
    Ok((id, OfferField::parse(field)?, value))
}

/// Applies every `field=value` edit to `inputs`. Nothing is evaluated, so
/// the outcome does not depend on the order of the edits.
pub fn apply_edits(
    mut inputs: ViabilityInputs,
    edits: &[String],
) -> Result<ViabilityInputs> {
    for raw in edits {
        let (field, value) = parse_edit(raw)?;
        debug!(field = field.as_str(), value, "applying viability edit");
        inputs = inputs
            .with_field(field, value)
            .with_context(|| format!("Failed to apply '{raw}'"))?;
    }
    Ok(inputs)
}

/// Applies every `offer_id.field=value` edit to `offers`, again without
/// evaluating in between.
pub fn apply_offer_edits(
    mut offers: Vec<MortgageOffer>,
    edits: &[String],
) -> Result<Vec<MortgageOffer>> {
    for raw in edits {
        let (id, field, value) = parse_offer_edit(raw)?;
        let offer = offers
            .iter_mut()
            .find(|offer| offer.id == id)
            .ok_or(SessionError::UnknownOffer(id))?;
        debug!(offer_id = id, field = field.as_str(), value, "applying offer edit");
        *offer = offer
            .with_field(field, value)
            .with_context(|| format!("Failed to apply '{raw}'"))?;
    }
    Ok(offers)
}

/// Evaluates the saved snapshot (or defaults) with `edits` applied and
/// optionally saves it.
pub async fn run_viability(
    repo: &dyn InputRepository,
    config: ViabilityConfig,
    table: RateTable,
    edits: &[String],
    save: bool,
) -> Result<ViabilitySession> {
    let inputs = match repo.load_viability().await {
        Ok(saved) => {
            debug!(saved_at = %saved.saved_at, "loaded saved viability inputs");
            saved.inputs
        }
        Err(RepositoryError::NotFound) => ViabilityInputs::default(),
        Err(e) => return Err(e).context("Failed to load saved viability inputs"),
    };
    let inputs = apply_edits(inputs, edits)?;

    let session = ViabilitySession::new(config, table, inputs, SharedMortgageAmount::default())
        .context("Viability inputs cannot be evaluated")?;

    if save {
        let saved = repo
            .save_viability(session.inputs(), session.result().mortgage_amount)
            .await
            .context("Failed to save viability inputs")?;
        info!(saved_at = %saved.saved_at, "saved viability inputs");
    }

    Ok(session)
}

/// Opens the saved offers (or defaults), moves every loan onto the saved
/// viability mortgage amount, applies `edits` and optionally saves.
pub async fn run_compare(
    repo: &dyn InputRepository,
    edits: &[String],
    save: bool,
) -> Result<ComparisonSession> {
    let offers = load_offers_or_default(repo)
        .await
        .context("Failed to load saved mortgage offers")?;
    let saved_amount = saved_mortgage_amount(repo)
        .await
        .context("Failed to load saved mortgage amount")?;

    let shared = SharedMortgageAmount::new(saved_amount.unwrap_or(DEFAULT_LOAN_AMOUNT));
    let watcher = match saved_amount {
        Some(_) => shared.watch_pending(),
        None => shared.watch(),
    };
    let mut session = ComparisonSession::new(offers, watcher)
        .context("Saved mortgage offers cannot be compared")?;
    if session
        .sync_loan_amount()
        .context("Saved mortgage amount cannot be compared")?
    {
        debug!(amount = %shared.current(), "offers follow saved mortgage amount");
    }

    if !edits.is_empty() {
        let offers = apply_offer_edits(session.offers().to_vec(), edits)?;
        session
            .replace(offers)
            .context("Edited mortgage offers cannot be compared")?;
    }

    if save {
        repo.save_offers(session.offers())
            .await
            .context("Failed to save mortgage offers")?;
        info!(offers = session.offers().len(), "saved mortgage offers");
    }

    Ok(session)
}

pub fn run_stamp_duty(
    table: &RateTable,
    price: &str,
    country: &str,
    category: &str,
) -> Result<StampDutyBreakdown> {
    let country = Country::parse(country)
        .ok_or_else(|| anyhow!("unknown country '{country}' (expected england or wales)"))?;
    let category = PropertyCategory::parse(category).ok_or_else(|| {
        anyhow!("unknown category '{category}' (expected first, next or additional)")
    })?;

    StampDutyCalculator::new(table)
        .breakdown(coerce_decimal(price), country, category)
        .context("Failed to compute transaction tax")
}

pub async fn run_reset(repo: &dyn InputRepository) -> Result<()> {
    repo.clear().await.context("Failed to clear saved inputs")?;
    info!("cleared saved inputs");
    Ok(())
}
