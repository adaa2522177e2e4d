//! Domain types for the exchange-rate cache.

mod currency;
mod rate;

pub use currency::CurrencyCode;
pub use rate::{
    AMOUNT_SCALE, Freshness, RATE_SCALE, RateEntry, RateSource, round_amount, round_rate,
};
