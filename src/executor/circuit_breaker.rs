use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: usize,
    pub window: Duration,
    pub cooldown: Duration,
}

/// Sliding-window failure breaker: opens when `failure_threshold` failures
/// land inside `window`, stays open until `cooldown` elapses, then resets
/// both the window and the failure count. Grounded on the teacher's
/// `arbitrage/cooldown.rs::RouteCooldown`, adapted from per-route escalating
/// block-based backoff to a single flat time-windowed failure count, per
/// spec.md §4.9.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    failures: VecDeque<DateTime<Utc>>,
    opened_at: Option<DateTime<Utc>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        CircuitBreaker {
            config,
            failures: VecDeque::new(),
            opened_at: None,
        }
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        while let Some(&front) = self.failures.front() {
            if now - front > self.config.window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    /// True if the breaker is currently rejecting attempts. Resets itself
    /// once `cooldown` has elapsed since it opened.
    pub fn is_open(&mut self, now: DateTime<Utc>) -> bool {
        match self.opened_at {
            Some(opened_at) if now - opened_at >= self.config.cooldown => {
                self.opened_at = None;
                self.failures.clear();
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Records a failure; opens the breaker once the sliding window holds
    /// `failure_threshold` entries.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        if self.opened_at.is_some() {
            return;
        }
        self.prune(now);
        self.failures.push_back(now);
        if self.failures.len() >= self.config.failure_threshold {
            self.opened_at = Some(now);
        }
    }

    /// A success clears the accumulated failure history without waiting out
    /// the cooldown (the breaker wasn't open, so there's nothing to reset).
    pub fn record_success(&mut self) {
        self.failures.clear();
    }

    pub fn active_failure_count(&self) -> usize {
        self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            window: Duration::seconds(60),
            cooldown: Duration::seconds(30),
        }
    }

    #[test]
    fn closed_until_threshold_reached() {
        let mut breaker = CircuitBreaker::new(config());
        let t0 = Utc::now();
        assert!(!breaker.is_open(t0));
        breaker.record_failure(t0);
        breaker.record_failure(t0 + Duration::seconds(1));
        assert!(!breaker.is_open(t0 + Duration::seconds(2)), "below threshold");
        breaker.record_failure(t0 + Duration::seconds(2));
        assert!(breaker.is_open(t0 + Duration::seconds(3)), "property 8: N >= threshold opens it");
    }

    #[test]
    fn failures_outside_window_do_not_accumulate() {
        let mut breaker = CircuitBreaker::new(config());
        let t0 = Utc::now();
        breaker.record_failure(t0);
        breaker.record_failure(t0 + Duration::seconds(1));
        // third failure arrives after the first has aged out of the window
        breaker.record_failure(t0 + Duration::seconds(90));
        assert!(!breaker.is_open(t0 + Duration::seconds(91)));
    }

    #[test]
    fn reopens_closed_after_cooldown_elapses() {
        let mut breaker = CircuitBreaker::new(config());
        let t0 = Utc::now();
        for i in 0..3 {
            breaker.record_failure(t0 + Duration::seconds(i));
        }
        assert!(breaker.is_open(t0 + Duration::seconds(3)));
        assert!(!breaker.is_open(t0 + Duration::seconds(40)), "cooldown elapsed");
        assert_eq!(breaker.active_failure_count(), 0);
    }

    #[test]
    fn success_clears_history() {
        let mut breaker = CircuitBreaker::new(config());
        let t0 = Utc::now();
        breaker.record_failure(t0);
        breaker.record_failure(t0 + Duration::seconds(1));
        breaker.record_success();
        assert_eq!(breaker.active_failure_count(), 0);
        breaker.record_failure(t0 + Duration::seconds(2));
        assert!(!breaker.is_open(t0 + Duration::seconds(2)), "cleared history, one failure isn't enough");
    }
}
