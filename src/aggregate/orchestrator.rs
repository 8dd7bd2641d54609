//! Request-level control flow of an aggregation.
//!
//! ```text
//! validate term → rate limit → cache lookup
//!     → country lookup (mandatory, sequential)
//!     → weather ∥ trivia ∥ dictionary ∥ exchange (all-or-nothing join)
//!     → assemble → cache write
//! ```
//!
//! A failure anywhere after the cache lookup aborts the request. The join
//! drops the remaining branches on the first error, and nothing is cached.

use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::time::Instant;
use url::Url;

use crate::aggregate::error::AggregateError;
use crate::aggregate::types::{AggregateResult, CurrencyConversion, WordOfTheDay, NO_EXAMPLE};
use crate::aggregate::validation::{normalize, validate_country};
use crate::cache::TtlCache;
use crate::config::{ContentConfig, ServiceConfig};
use crate::resilience::{CircuitBreakerRegistry, RetryingClient};
use crate::security::SlidingWindowRateLimiter;
use crate::upstream::types::{CountryRecord, DictionaryEntry, ForecastResponse, RatesResponse};
use crate::upstream::{ClientInitError, UpstreamApi};

/// Fallback word if the configured list is somehow empty.
const DEFAULT_WORD: &str = "serendipity";

/// Long-lived aggregation context shared by all requests.
#[derive(Debug)]
pub struct Aggregator {
    api: UpstreamApi,
    breakers: Arc<CircuitBreakerRegistry>,
    limiter: Arc<SlidingWindowRateLimiter>,
    cache: Arc<TtlCache<AggregateResult>>,
    content: ContentConfig,
    rate_limit_enabled: bool,
}

impl Aggregator {
    /// Build the aggregator and its registries from configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ClientInitError> {
        let breakers = Arc::new(CircuitBreakerRegistry::new(&config.circuit_breaker));
        let api = UpstreamApi::new(&config.upstreams, RetryingClient::new(breakers.clone()))?;

        Ok(Self {
            api,
            breakers,
            limiter: Arc::new(SlidingWindowRateLimiter::new(&config.rate_limit)),
            cache: Arc::new(TtlCache::new(&config.cache)),
            content: config.content.clone(),
            rate_limit_enabled: config.rate_limit.enabled,
        })
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowRateLimiter> {
        &self.limiter
    }

    pub fn cache(&self) -> &Arc<TtlCache<AggregateResult>> {
        &self.cache
    }

    /// Produce the aggregate for `country` on behalf of `client`.
    pub async fn handle(
        &self,
        country: Option<&str>,
        client: &str,
    ) -> Result<Arc<AggregateResult>, AggregateError> {
        let term = validate_country(country)?;

        if self.rate_limit_enabled && !self.limiter.allow(client) {
            return Err(AggregateError::RateLimited);
        }

        let key = normalize(term);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(country = %key, "Serving aggregate from cache");
            return Ok(hit);
        }

        let started = Instant::now();
        let record = self
            .api
            .lookup_country(&key)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AggregateError::NotFound(term.to_string()))?;

        let (lat, lon) = record.coordinates();
        let word = self.pick_word();

        let (forecast, fact, entries, rates) = tokio::try_join!(
            self.api.current_weather(lat, lon),
            self.api.random_fact(),
            self.api.define(&word),
            self.api.usd_rates(),
        )
        .map_err(|e| {
            tracing::warn!(
                country = %key,
                service = %e.service(),
                error = %e,
                "Fan-out failed, aggregate discarded"
            );
            e
        })?;

        let result = self.assemble(&key, record, forecast, fact, word, entries, rates);
        tracing::info!(
            country = %key,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregate assembled"
        );
        Ok(self.cache.set(key, result))
    }

    fn pick_word(&self) -> String {
        self.content
            .words
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_WORD.to_string())
    }

    /// Seeded placeholder image for `key`.
    fn image_url(&self, key: &str) -> String {
        let width = self.content.image_width.to_string();
        let height = self.content.image_height.to_string();
        match Url::parse(&self.content.image_base_url) {
            Ok(mut url) => {
                if let Ok(mut path) = url.path_segments_mut() {
                    path.pop_if_empty().extend([key, &width, &height]);
                }
                url.to_string()
            }
            Err(_) => format!("{}/{}/{}/{}", self.content.image_base_url, key, width, height),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        key: &str,
        record: CountryRecord,
        forecast: ForecastResponse,
        fact: String,
        word: String,
        entries: Vec<DictionaryEntry>,
        rates: RatesResponse,
    ) -> AggregateResult {
        let entry = entries.into_iter().next().unwrap_or_default();
        let definition = entry.first_definition();
        let word_of_the_day = WordOfTheDay {
            word: entry.word.clone().unwrap_or(word),
            meaning: definition.and_then(|d| d.definition.clone()),
            example: definition
                .and_then(|d| d.example.clone())
                .filter(|example| !example.is_empty())
                .unwrap_or_else(|| NO_EXAMPLE.to_string()),
        };

        let currency = record.currency_code().to_string();
        AggregateResult {
            country: record
                .common_name()
                .map(str::to_string)
                .unwrap_or_else(|| key.to_string()),
            capital: record.capital().to_string(),
            population: record.population,
            flag: record.flag().to_string(),
            weather: forecast.current_weather,
            fun_fact: fact,
            random_image: self.image_url(key),
            word_of_the_day,
            currency_conversion: CurrencyConversion {
                from: "USD".to_string(),
                rate: rates.rate_for(&currency),
                to: currency,
            },
        }
    }
}
