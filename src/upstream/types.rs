//! Wire types for the upstream services.
//!
//! Only the fields the aggregate consumes are modelled. Every field is
//! optional on the wire; accessors apply the documented fallbacks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One record from the country lookup service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CountryRecord {
    pub name: CountryName,
    pub capital: Vec<String>,
    pub population: u64,
    pub flags: Flags,
    #[serde(rename = "capitalInfo")]
    pub capital_info: CapitalInfo,
    /// Currency code → details, in document order.
    pub currencies: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CountryName {
    pub common: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Flags {
    pub png: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CapitalInfo {
    pub latlng: Vec<f64>,
}

impl CountryRecord {
    pub fn common_name(&self) -> Option<&str> {
        self.name.common.as_deref()
    }

    /// First listed capital, `"N/A"` when absent.
    pub fn capital(&self) -> &str {
        self.capital.first().map(String::as_str).unwrap_or("N/A")
    }

    /// Capital coordinates, each defaulting to 0.
    pub fn coordinates(&self) -> (f64, f64) {
        let lat = self.capital_info.latlng.first().copied().unwrap_or(0.0);
        let lon = self.capital_info.latlng.get(1).copied().unwrap_or(0.0);
        (lat, lon)
    }

    /// PNG flag URL, empty when absent.
    pub fn flag(&self) -> &str {
        self.flags.png.as_deref().unwrap_or("")
    }

    /// Primary currency code, `"USD"` when none is listed.
    pub fn currency_code(&self) -> &str {
        self.currencies.keys().next().map(String::as_str).unwrap_or("USD")
    }
}

/// Forecast response; only the current conditions are used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForecastResponse {
    pub current_weather: Option<CurrentWeather>,
}

/// Current conditions, passed through to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub windspeed: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One dictionary entry for a word.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DictionaryEntry {
    pub word: Option<String>,
    pub meanings: Vec<Meaning>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Meaning {
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Definition {
    pub definition: Option<String>,
    pub example: Option<String>,
}

impl DictionaryEntry {
    /// First definition of the first meaning.
    pub fn first_definition(&self) -> Option<&Definition> {
        self.meanings.first().and_then(|m| m.definitions.first())
    }
}

/// Exchange-rate table relative to USD.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RatesResponse {
    pub rates: HashMap<String, f64>,
}

impl RatesResponse {
    /// Rate for `code`, 1 when the table lacks it.
    pub fn rate_for(&self, code: &str) -> f64 {
        self.rates.get(code).copied().unwrap_or(1.0)
    }
}
