//! The composite response.

use serde::{Deserialize, Serialize};

use crate::upstream::types::CurrentWeather;

/// Fallback when the dictionary has no example sentence.
pub const NO_EXAMPLE: &str = "No example available";

/// Everything known about one country, assembled from all five upstreams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub country: String,
    pub capital: String,
    pub population: u64,
    pub flag: String,
    pub weather: Option<CurrentWeather>,
    pub fun_fact: String,
    pub random_image: String,
    pub word_of_the_day: WordOfTheDay,
    pub currency_conversion: CurrencyConversion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordOfTheDay {
    pub word: String,
    pub meaning: Option<String>,
    pub example: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConversion {
    pub from: String,
    pub to: String,
    pub rate: f64,
}
