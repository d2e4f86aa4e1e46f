use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::ConfigError;

/// Runtime circuit state for one guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker open.
    pub failure_threshold: u32,
    /// Time after the last failure before a trial call is let through.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(10),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        Ok(())
    }
}

/// Call rejected by an open breaker; the guarded operation was not invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker '{breaker}' is open")]
pub struct CircuitOpen {
    pub breaker: String,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    trial_in_flight: bool,
    /// Bumped on every OPEN -> HALF_OPEN edge; a trial permit only settles
    /// the half-open period it was issued for.
    trial_epoch: u64,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            trial_in_flight: false,
            trial_epoch: 0,
        }
    }
}

impl CircuitInner {
    fn owns_trial(&self, epoch: Option<u64>) -> bool {
        epoch == Some(self.trial_epoch) && self.trial_in_flight
    }
}

/// Thread-safe circuit breaker guarding a single downstream operation.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    fn lock(&self) -> MutexGuard<'_, CircuitInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `operation` through the breaker.
    ///
    /// Errors from `operation` are counted and returned unchanged. While the
    /// breaker is open the operation is not polled at all and the call fails
    /// with `E::from(CircuitOpen)`.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<CircuitOpen>,
    {
        let permit = self.acquire().map_err(E::from)?;
        let outcome = operation.await;
        self.settle(permit, outcome.is_ok());
        outcome
    }

    fn acquire(&self) -> Result<Permit<'_>, CircuitOpen> {
        let mut inner = self.lock();
        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen if !inner.trial_in_flight => true,
            CircuitState::HalfOpen => return Err(self.rejection()),
            CircuitState::Open => {
                let recovered = inner
                    .last_failure_at
                    .is_some_and(|at| at.elapsed() >= self.config.recovery_timeout);
                if !recovered {
                    return Err(self.rejection());
                }
                inner.state = CircuitState::HalfOpen;
                inner.trial_epoch = inner.trial_epoch.wrapping_add(1);
                info!(breaker = %self.name, "circuit half-open, allowing trial call");
                true
            }
        };

        if trial {
            inner.trial_in_flight = true;
        }
        Ok(Permit {
            breaker: self,
            trial_epoch: trial.then_some(inner.trial_epoch),
            settled: false,
        })
    }

    fn rejection(&self) -> CircuitOpen {
        CircuitOpen {
            breaker: self.name.clone(),
        }
    }

    fn settle(&self, mut permit: Permit<'_>, succeeded: bool) {
        {
            let mut inner = self.lock();
            if succeeded {
                self.on_success(&mut inner, permit.trial_epoch);
            } else {
                self.on_failure(&mut inner, permit.trial_epoch);
            }
        }
        permit.settled = true;
    }

    /// Only the trial of the current half-open period closes the breaker. A
    /// call admitted earlier that succeeds late resets the failure count and
    /// leaves the state alone.
    fn on_success(&self, inner: &mut CircuitInner, trial_epoch: Option<u64>) {
        inner.consecutive_failures = 0;
        if !inner.owns_trial(trial_epoch) {
            return;
        }
        inner.trial_in_flight = false;
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            info!(breaker = %self.name, "circuit closed");
        }
    }

    fn on_failure(&self, inner: &mut CircuitInner, trial_epoch: Option<u64>) {
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(Instant::now());
        if inner.owns_trial(trial_epoch) {
            inner.trial_in_flight = false;
        }

        if inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold
        {
            if inner.state != CircuitState::Open {
                warn!(
                    breaker = %self.name,
                    failures = inner.consecutive_failures,
                    "circuit opened"
                );
            }
            inner.state = CircuitState::Open;
        }
    }

    /// Record a success observed outside `call`. It never closes an open
    /// breaker.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        self.on_success(&mut inner, None);
    }

    /// Record a failure observed outside `call`.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        self.on_failure(&mut inner, None);
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }
}

/// Admission ticket for one call. Dropping it unsettled (the caller was
/// cancelled) frees the half-open trial slot without recording an outcome.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial_epoch: Option<u64>,
    settled: bool,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.trial_epoch.is_some() && !self.settled {
            let mut inner = self.breaker.lock();
            if inner.owns_trial(self.trial_epoch) {
                inner.trial_in_flight = false;
            }
        }
    }
}

/// Process-wide breakers, one per operation name, created on first use.
#[derive(Debug)]
pub struct BreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub const fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(breaker) = breakers.get(name) {
            return Arc::clone(breaker);
        }
        let breaker = Arc::new(CircuitBreaker::new(name, self.config));
        breakers.insert(name.to_owned(), Arc::clone(&breaker));
        breaker
    }

    /// Current state of every breaker created so far, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, CircuitState)> {
        let breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut states = breakers
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.state()))
            .collect::<Vec<_>>();
        states.sort_by(|left, right| left.0.cmp(&right.0));
        states
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
