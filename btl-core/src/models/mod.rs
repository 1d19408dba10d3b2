mod inputs;
mod mortgage;
mod property;
mod rate_table;
mod rental;

pub use inputs::{InputError, InputField, ViabilityInputs, coerce_decimal, coerce_whole};
pub use mortgage::{
    DEFAULT_LOAN_AMOUNT, MAX_OFFERS, MortgageInputs, MortgageOffer, OfferField, PaymentType,
};
pub use property::{Country, PropertyCategory, PropertyInputs, PurchaseMethod};
pub use rate_table::{CategoryRule, RateSchedule, RateTable, RateTableError, TaxBand};
pub use rental::{RentalInputs, RentalType};
