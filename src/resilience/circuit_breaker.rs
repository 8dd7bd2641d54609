//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: upstream assumed down, calls fail fast
//! - Half-Open: testing if upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: reset window elapsed since the last failure
//! Half-Open → Closed: probe call succeeds
//! Half-Open → Open: probe call fails
//! ```
//!
//! # Design Decisions
//! - One breaker per upstream name, created lazily on first use
//! - Fail fast in Open state (the wrapped call is never started)
//! - Single probe in Half-Open; concurrent callers are rejected until it resolves
//! - Failure counting is cumulative across concurrent callers
//! - State is only touched under the per-name map entry lock, never across an await

use dashmap::DashMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    fn gauge_value(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a breaker rejects a call without running it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit open for '{service}', retry in {}ms", retry_after.as_millis())]
pub struct CircuitOpenError {
    pub service: String,
    pub retry_after: Duration,
}

/// Per-upstream breaker bookkeeping.
#[derive(Debug, Clone)]
struct BreakerState {
    state: CircuitState,
    failures: u32,
    last_failure: Option<Instant>,
    probe_in_flight: bool,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            last_failure: None,
            probe_in_flight: false,
        }
    }
}

/// Point-in-time view of one breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failures: u32,
}

/// Releases the probe slot if the probing future is dropped before completion.
struct ProbeGuard<'a> {
    registry: &'a CircuitBreakerRegistry,
    name: &'a str,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.release_probe(self.name);
        }
    }
}

/// Registry of named circuit breakers.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, BreakerState>,
    failure_threshold: u32,
    reset_window: Duration,
}

impl CircuitBreakerRegistry {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self::with_params(config.failure_threshold, config.reset_window())
    }

    pub fn with_params(failure_threshold: u32, reset_window: Duration) -> Self {
        Self {
            breakers: DashMap::new(),
            failure_threshold,
            reset_window,
        }
    }

    /// Run `operation` under the breaker named `name`.
    ///
    /// A rejected call returns `CircuitOpenError` (converted into `E`) and does
    /// not touch the failure count. Any error returned by the operation itself
    /// is recorded as a failure and handed back unchanged.
    pub async fn execute<T, E, F, Fut>(&self, name: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
    {
        let probe = self.try_acquire(name)?;
        let mut guard = ProbeGuard {
            registry: self,
            name,
            armed: probe,
        };

        let result = operation().await;
        guard.armed = false;

        match result {
            Ok(value) => {
                self.record_success(name, probe);
                Ok(value)
            }
            Err(e) => {
                self.record_failure(name, probe);
                Err(e)
            }
        }
    }

    /// Free the half-open probe slot of a call that was dropped mid-flight.
    fn release_probe(&self, name: &str) {
        if let Some(mut entry) = self.breakers.get_mut(name) {
            entry.value_mut().probe_in_flight = false;
        }
        tracing::debug!(service = %name, "Half-open probe cancelled");
    }

    /// Admission check. Returns whether this call is the half-open probe.
    fn try_acquire(&self, name: &str) -> Result<bool, CircuitOpenError> {
        let mut entry = self
            .breakers
            .entry(name.to_string())
            .or_insert_with(BreakerState::new);
        let breaker = entry.value_mut();

        match breaker.state {
            CircuitState::Closed => Ok(false),
            CircuitState::Open => {
                let elapsed = breaker
                    .last_failure
                    .map(|at| at.elapsed())
                    .unwrap_or(self.reset_window);
                if elapsed < self.reset_window {
                    return Err(CircuitOpenError {
                        service: name.to_string(),
                        retry_after: self.reset_window - elapsed,
                    });
                }
                breaker.state = CircuitState::HalfOpen;
                breaker.probe_in_flight = true;
                metrics::record_breaker_state(name, breaker.state.gauge_value());
                tracing::info!(service = %name, "Circuit half-open, admitting probe");
                Ok(true)
            }
            CircuitState::HalfOpen => {
                if breaker.probe_in_flight {
                    return Err(CircuitOpenError {
                        service: name.to_string(),
                        retry_after: Duration::ZERO,
                    });
                }
                breaker.probe_in_flight = true;
                Ok(true)
            }
        }
    }

    /// Record a completed call.
    ///
    /// Only the half-open probe, or a call finishing while the breaker is still
    /// closed, may reset the count. A call admitted before the breaker tripped
    /// leaves OPEN/HALF_OPEN and the probe slot untouched.
    fn record_success(&self, name: &str, probe: bool) {
        if let Some(mut entry) = self.breakers.get_mut(name) {
            let breaker = entry.value_mut();
            if probe {
                tracing::info!(service = %name, "Probe succeeded, circuit closed");
                breaker.state = CircuitState::Closed;
                breaker.failures = 0;
                breaker.probe_in_flight = false;
                metrics::record_breaker_state(name, breaker.state.gauge_value());
            } else if breaker.state == CircuitState::Closed {
                breaker.failures = 0;
            } else {
                tracing::debug!(
                    service = %name,
                    state = %breaker.state,
                    "Late success ignored, breaker not closed"
                );
            }
        }
    }

    fn record_failure(&self, name: &str, probe: bool) {
        if let Some(mut entry) = self.breakers.get_mut(name) {
            let breaker = entry.value_mut();
            breaker.failures = breaker.failures.saturating_add(1);
            breaker.last_failure = Some(Instant::now());
            if probe {
                breaker.probe_in_flight = false;
            }

            let trip = breaker.failures >= self.failure_threshold
                || breaker.state == CircuitState::HalfOpen;
            if trip && breaker.state != CircuitState::Open {
                tracing::warn!(
                    service = %name,
                    failures = breaker.failures,
                    previous = %breaker.state,
                    "Circuit opened"
                );
            }
            if trip {
                breaker.state = CircuitState::Open;
            }
            metrics::record_breaker_state(name, breaker.state.gauge_value());
        }
    }

    /// Current state of a breaker (`Closed` if it was never used).
    pub fn state(&self, name: &str) -> CircuitState {
        self.breakers
            .get(name)
            .map(|b| b.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Current consecutive failure count of a breaker.
    pub fn failures(&self, name: &str) -> u32 {
        self.breakers.get(name).map(|b| b.failures).unwrap_or(0)
    }

    /// Snapshot of every breaker created so far, sorted by name.
    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let mut all: Vec<_> = self
            .breakers
            .iter()
            .map(|r| BreakerSnapshot {
                name: r.key().clone(),
                state: r.value().state,
                failures: r.value().failures,
            })
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Boom,
        Open(CircuitOpenError),
    }

    impl From<CircuitOpenError> for TestError {
        fn from(e: CircuitOpenError) -> Self {
            TestError::Open(e)
        }
    }

    fn registry() -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::with_params(5, Duration::from_secs(60))
    }

    async fn fail(registry: &CircuitBreakerRegistry, name: &str) -> Result<(), TestError> {
        registry.execute(name, || async { Err::<(), _>(TestError::Boom) }).await
    }

    async fn succeed(registry: &CircuitBreakerRegistry, name: &str) -> Result<u32, TestError> {
        registry.execute(name, || async { Ok::<_, TestError>(7) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold() {
        let registry = registry();

        for i in 1..5 {
            assert_eq!(fail(&registry, "weather").await, Err(TestError::Boom));
            assert_eq!(registry.state("weather"), CircuitState::Closed);
            assert_eq!(registry.failures("weather"), i);
        }

        assert_eq!(fail(&registry, "weather").await, Err(TestError::Boom));
        assert_eq!(registry.state("weather"), CircuitState::Open);
        assert_eq!(registry.failures("weather"), 5);

        // Other upstreams are unaffected.
        assert_eq!(registry.state("trivia"), CircuitState::Closed);
        assert_eq!(succeed(&registry, "trivia").await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_count() {
        let registry = registry();
        for _ in 0..4 {
            let _ = fail(&registry, "trivia").await;
        }
        assert_eq!(succeed(&registry, "trivia").await, Ok(7));
        assert_eq!(registry.failures("trivia"), 0);

        for _ in 0..4 {
            let _ = fail(&registry, "trivia").await;
        }
        assert_eq!(registry.state("trivia"), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_calling() {
        let registry = registry();
        for _ in 0..5 {
            let _ = fail(&registry, "dictionary").await;
        }

        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = registry
            .execute("dictionary", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        match result {
            Err(TestError::Open(e)) => {
                assert_eq!(e.service, "dictionary");
                assert_eq!(e.retry_after, Duration::from_secs(60));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // A rejection is not a failure.
        assert_eq!(registry.failures("dictionary"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_success_closes() {
        let registry = registry();
        for _ in 0..5 {
            let _ = fail(&registry, "exchange").await;
        }

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(matches!(succeed(&registry, "exchange").await, Err(TestError::Open(_))));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(succeed(&registry, "exchange").await, Ok(7));
        assert_eq!(registry.state("exchange"), CircuitState::Closed);
        assert_eq!(registry.failures("exchange"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_failure_reopens() {
        let registry = registry();
        for _ in 0..5 {
            let _ = fail(&registry, "countries").await;
        }

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(fail(&registry, "countries").await, Err(TestError::Boom));
        assert_eq!(registry.state("countries"), CircuitState::Open);

        // The reset window restarts from the failed probe.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(matches!(succeed(&registry, "countries").await, Err(TestError::Open(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_single_probe() {
        let registry = Arc::new(registry());
        for _ in 0..5 {
            let _ = fail(&registry, "weather").await;
        }
        tokio::time::advance(Duration::from_secs(60)).await;

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let probe_registry = registry.clone();
        let probe = tokio::spawn(async move {
            probe_registry
                .execute("weather", || async move {
                    let _ = release_rx.await;
                    Ok::<_, TestError>(1)
                })
                .await
        });
        for _ in 0..10 {
            if registry.state("weather") == CircuitState::HalfOpen {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.state("weather"), CircuitState::HalfOpen);

        assert!(matches!(succeed(&registry, "weather").await, Err(TestError::Open(_))));

        release_tx.send(()).unwrap();
        assert_eq!(probe.await.unwrap(), Ok(1));
        assert_eq!(registry.state("weather"), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_probe_frees_slot() {
        let registry = registry();
        for _ in 0..5 {
            let _ = fail(&registry, "dictionary").await;
        }
        tokio::time::advance(Duration::from_secs(60)).await;

        let slow_probe = registry.execute("dictionary", || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, TestError>(0)
        });
        let cancelled = tokio::time::timeout(Duration::from_millis(10), slow_probe).await;
        assert!(cancelled.is_err());
        assert_eq!(registry.state("dictionary"), CircuitState::HalfOpen);

        assert_eq!(succeed(&registry, "dictionary").await, Ok(7));
        assert_eq!(registry.state("dictionary"), CircuitState::Closed);
    }

    /// Start a call admitted while closed that succeeds once released.
    async fn spawn_slow_success(
        registry: &Arc<CircuitBreakerRegistry>,
        name: &'static str,
    ) -> (tokio::sync::oneshot::Sender<()>, tokio::task::JoinHandle<Result<u32, TestError>>) {
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let slow_registry = registry.clone();
        let handle = tokio::spawn(async move {
            slow_registry
                .execute(name, || async move {
                    let _ = release_rx.await;
                    Ok::<_, TestError>(3)
                })
                .await
        });
        // Admission creates the breaker entry.
        for _ in 0..10 {
            if !registry.snapshot().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.snapshot().len(), 1);
        (release_tx, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_keeps_breaker_open() {
        let registry = Arc::new(registry());
        let (release_tx, slow) = spawn_slow_success(&registry, "weather").await;

        for _ in 0..5 {
            let _ = fail(&registry, "weather").await;
        }
        assert_eq!(registry.state("weather"), CircuitState::Open);

        release_tx.send(()).unwrap();
        assert_eq!(slow.await.unwrap(), Ok(3));

        assert_eq!(registry.state("weather"), CircuitState::Open);
        assert_eq!(registry.failures("weather"), 5);
        assert!(matches!(succeed(&registry, "weather").await, Err(TestError::Open(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_keeps_probe_slot() {
        let registry = Arc::new(registry());
        let (straggler_tx, straggler) = spawn_slow_success(&registry, "trivia").await;

        for _ in 0..5 {
            let _ = fail(&registry, "trivia").await;
        }
        tokio::time::advance(Duration::from_secs(60)).await;

        let (probe_tx, probe_rx) = tokio::sync::oneshot::channel::<()>();
        let probe_registry = registry.clone();
        let probe = tokio::spawn(async move {
            probe_registry
                .execute("trivia", || async move {
                    let _ = probe_rx.await;
                    Ok::<_, TestError>(1)
                })
                .await
        });
        for _ in 0..10 {
            if registry.state("trivia") == CircuitState::HalfOpen {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.state("trivia"), CircuitState::HalfOpen);

        straggler_tx.send(()).unwrap();
        assert_eq!(straggler.await.unwrap(), Ok(3));
        assert_eq!(registry.state("trivia"), CircuitState::HalfOpen);
        assert_eq!(registry.failures("trivia"), 5);

        // The probe is still in flight, so a second caller is turned away.
        assert!(matches!(succeed(&registry, "trivia").await, Err(TestError::Open(_))));

        probe_tx.send(()).unwrap();
        assert_eq!(probe.await.unwrap(), Ok(1));
        assert_eq!(registry.state("trivia"), CircuitState::Closed);
        assert_eq!(registry.failures("trivia"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failures_are_cumulative() {
        let registry = Arc::new(registry());
        let mut handles = Vec::new();
        for _ in 0..5 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .execute("trivia", || async {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Err::<(), _>(TestError::Boom)
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err(TestError::Boom));
        }
        assert_eq!(registry.failures("trivia"), 5);
        assert_eq!(registry.state("trivia"), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_snapshot_sorted() {
        let registry = registry();
        let _ = succeed(&registry, "weather").await;
        let _ = fail(&registry, "countries").await;

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].name, "countries");
        assert_eq!(snapshot[0].failures, 1);
        assert_eq!(snapshot[1].name, "weather");
        assert_eq!(snapshot[1].state, CircuitState::Closed);
    }
}
