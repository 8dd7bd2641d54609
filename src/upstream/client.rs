//! HTTP access to the five upstream services.
//!
//! # Responsibilities
//! - Build each service's request from its configured base URL
//! - Map transport, status and decoding failures to `UpstreamError`
//! - Route every call through the retrying, breaker-guarded client
//!
//! # Design Decisions
//! - One pooled `reqwest::Client` shared by all services (keep-alive)
//! - A 404 from the country service means "no such country", not a failure
//! - Payloads are decoded into minimal wire types, never interpreted here

use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::UpstreamsConfig;
use crate::resilience::{RetryPolicy, RetryingClient};
use crate::upstream::error::UpstreamError;
use crate::upstream::types::{CountryRecord, DictionaryEntry, ForecastResponse, RatesResponse};
use crate::upstream::{COUNTRIES, DICTIONARY, EXCHANGE, TRIVIA, WEATHER};

const WEATHER_USER_AGENT: &str = "SuperAPI/1.0";

/// Error building the upstream API.
#[derive(Debug, Error)]
pub enum ClientInitError {
    #[error("invalid base URL for {service}: {source}")]
    BaseUrl {
        service: &'static str,
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Base URL and retry policy of one service.
#[derive(Debug, Clone)]
struct Endpoint {
    base: Url,
    policy: RetryPolicy,
}

impl Endpoint {
    /// Base URL with `segments` appended as percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Typed client for the five upstream services.
#[derive(Debug, Clone)]
pub struct UpstreamApi {
    http: Client,
    retrying: RetryingClient,
    countries: Endpoint,
    weather: Endpoint,
    trivia: Endpoint,
    dictionary: Endpoint,
    exchange: Endpoint,
}

impl UpstreamApi {
    pub fn new(
        config: &UpstreamsConfig,
        retrying: RetryingClient,
    ) -> Result<Self, ClientInitError> {
        let http = Client::builder()
            .user_agent(concat!("super-info/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let endpoint = |service: &'static str, upstream: &crate::config::UpstreamConfig| {
            Url::parse(&upstream.base_url)
                .map(|base| Endpoint {
                    base,
                    policy: RetryPolicy::from(upstream),
                })
                .map_err(|source| ClientInitError::BaseUrl { service, source })
        };

        Ok(Self {
            http,
            retrying,
            countries: endpoint(COUNTRIES, &config.countries)?,
            weather: endpoint(WEATHER, &config.weather)?,
            trivia: endpoint(TRIVIA, &config.trivia)?,
            dictionary: endpoint(DICTIONARY, &config.dictionary)?,
            exchange: endpoint(EXCHANGE, &config.exchange)?,
        })
    }

    /// Country records matching `term`; empty when nothing matches.
    pub async fn lookup_country(&self, term: &str) -> Result<Vec<CountryRecord>, UpstreamError> {
        let url = self.countries.url(&["v3.1", "name", term]);
        self.retrying
            .fetch(COUNTRIES, &self.countries.policy, || {
                let request = self.http.get(url.clone());
                async move {
                    let response = send(COUNTRIES, request).await?;
                    if response.status() == StatusCode::NOT_FOUND {
                        return Ok(Vec::new());
                    }
                    decode_json(COUNTRIES, response).await
                }
            })
            .await
    }

    /// Current weather at the given coordinates.
    pub async fn current_weather(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<ForecastResponse, UpstreamError> {
        let mut url = self.weather.url(&["v1", "forecast"]);
        url.query_pairs_mut()
            .append_pair("latitude", &lat.to_string())
            .append_pair("longitude", &lon.to_string())
            .append_pair("current_weather", "true");

        self.retrying
            .fetch(WEATHER, &self.weather.policy, || {
                let request = self
                    .http
                    .get(url.clone())
                    .header(USER_AGENT, HeaderValue::from_static(WEATHER_USER_AGENT));
                async move { decode_json(WEATHER, send(WEATHER, request).await?).await }
            })
            .await
    }

    /// A random trivia fact as plain text.
    pub async fn random_fact(&self) -> Result<String, UpstreamError> {
        let url = self.trivia.url(&["random", "trivia"]);
        self.retrying
            .fetch(TRIVIA, &self.trivia.policy, || {
                let request = self.http.get(url.clone());
                async move {
                    let response = success(TRIVIA, send(TRIVIA, request).await?)?;
                    response
                        .text()
                        .await
                        .map_err(|e| UpstreamError::from_reqwest(TRIVIA, e))
                }
            })
            .await
    }

    /// Dictionary entries for `word`.
    pub async fn define(&self, word: &str) -> Result<Vec<DictionaryEntry>, UpstreamError> {
        let url = self.dictionary.url(&["api", "v2", "entries", "en", word]);
        self.retrying
            .fetch(DICTIONARY, &self.dictionary.policy, || {
                let request = self.http.get(url.clone());
                async move { decode_json(DICTIONARY, send(DICTIONARY, request).await?).await }
            })
            .await
    }

    /// Exchange-rate table relative to USD.
    pub async fn usd_rates(&self) -> Result<RatesResponse, UpstreamError> {
        let url = self.exchange.url(&["v6", "latest", "USD"]);
        self.retrying
            .fetch(EXCHANGE, &self.exchange.policy, || {
                let request = self.http.get(url.clone());
                async move { decode_json(EXCHANGE, send(EXCHANGE, request).await?).await }
            })
            .await
    }
}

async fn send(service: &str, request: reqwest::RequestBuilder) -> Result<Response, UpstreamError> {
    request
        .send()
        .await
        .map_err(|e| UpstreamError::from_reqwest(service, e))
}

fn success(service: &str, response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(UpstreamError::Status {
            service: service.to_string(),
            status: status.as_u16(),
        })
    }
}

async fn decode_json<T: DeserializeOwned>(
    service: &str,
    response: Response,
) -> Result<T, UpstreamError> {
    let response = success(service, response)?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| UpstreamError::from_reqwest(service, e))?;
    serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode {
        service: service.to_string(),
        message: e.to_string(),
    })
}
