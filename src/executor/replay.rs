use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Signal id → execution timestamp. Entries older than `ttl` are pruned
/// lazily on lookup, never on a timer. Per spec.md §4.9/§9, 60s is the
/// default window; it must exceed the longest feasible leg2 timeout to
/// prevent race re-entry.
#[derive(Debug)]
pub struct ReplayGuard {
    seen: HashMap<String, DateTime<Utc>>,
    ttl: Duration,
}

impl ReplayGuard {
    pub fn new(ttl: Duration) -> Self {
        ReplayGuard { seen: HashMap::new(), ttl }
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.seen.retain(|_, &mut at| now - at <= ttl);
    }

    /// Records `signal_id` at `now` and returns `true` if it had not been
    /// seen within the TTL window; `false` (no mutation) if it's a replay.
    pub fn check_and_record(&mut self, signal_id: &str, now: DateTime<Utc>) -> bool {
        self.prune(now);
        if self.seen.contains_key(signal_id) {
            return false;
        }
        self.seen.insert(signal_id.to_string(), now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_passes_repeat_is_rejected() {
        let mut guard = ReplayGuard::new(Duration::seconds(60));
        let t0 = Utc::now();
        assert!(guard.check_and_record("sig-1", t0));
        assert!(!guard.check_and_record("sig-1", t0 + Duration::seconds(1)), "property 6: duplicate rejected");
    }

    #[test]
    fn entry_expires_after_ttl() {
        let mut guard = ReplayGuard::new(Duration::seconds(60));
        let t0 = Utc::now();
        assert!(guard.check_and_record("sig-1", t0));
        assert!(guard.check_and_record("sig-1", t0 + Duration::seconds(61)), "TTL elapsed, no longer a replay");
    }

    #[test]
    fn distinct_ids_are_independent() {
        let mut guard = ReplayGuard::new(Duration::seconds(60));
        let t0 = Utc::now();
        assert!(guard.check_and_record("sig-1", t0));
        assert!(guard.check_and_record("sig-2", t0));
    }
}
