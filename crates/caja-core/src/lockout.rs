//! # Login Lockout State Machine
//!
//! Tracks failed login attempts per identifier and enforces a timed lockout.
//!
//! ## State Machine (per identifier)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │           failure            failure            failure                 │
//! │  ┌──────┐ ───────► ┌──────┐ ───────► ┌──────┐ ───────► ┌────────────┐  │
//! │  │ 0/3  │          │ 1/3  │          │ 2/3  │          │ LOCKED     │  │
//! │  └──────┘ ◄─────── └──────┘ ◄─────── └──────┘          │ now + 5min │  │
//! │     ▲      success            success                  └─────┬──────┘  │
//! │     │                                                        │          │
//! │     └──────────────── lockout expires, or success ───────────┘          │
//! │                                                                         │
//! │  While locked, EVERY attempt fails with the remaining minutes -        │
//! │  even one carrying the correct secret.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bucket Key
//! Buckets are keyed by the trimmed, lowercased identifier the caller typed,
//! so `Admin` and `admin` share one bucket. The tracker never needs the
//! resolved user id.
//!
//! ## Purity
//! The tracker never reads the clock; callers pass `now`. This keeps the
//! state machine deterministic and directly testable.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::{LOCKOUT_MINUTES, MAX_LOGIN_ATTEMPTS};

// =============================================================================
// Outcomes
// =============================================================================

/// What a recorded failure did to the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Failure counted; attempts shown as `attempts`/`MAX_LOGIN_ATTEMPTS`.
    Counted { attempts: u32 },
    /// The failure tripped the threshold; locked for `minutes` minutes.
    LockedOut { minutes: i64 },
}

// =============================================================================
// Tracker
// =============================================================================

#[derive(Debug, Clone, Default)]
struct Bucket {
    attempts: u32,
    locked_until: Option<DateTime<Utc>>,
}

/// Per-identifier failed-attempt counters with timed lockout.
///
/// Independent of the user collection: state lives keyed by what was typed,
/// not by any resolved user id.
#[derive(Debug, Default)]
pub struct LockoutTracker {
    buckets: HashMap<String, Bucket>,
}

impl LockoutTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(identifier: &str) -> String {
        identifier.trim().to_lowercase()
    }

    /// Minutes remaining in an active lockout window, rounded up.
    ///
    /// Returns `None` when the identifier is not locked (or the window has
    /// already expired).
    pub fn remaining_lockout_minutes(&self, identifier: &str, now: DateTime<Utc>) -> Option<i64> {
        let bucket = self.buckets.get(&Self::key(identifier))?;
        let until = bucket.locked_until?;
        if until <= now {
            return None;
        }
        let remaining_ms = (until - now).num_milliseconds();
        // Ceiling of remaining-ms / 60000, per the reported "try again in N minutes"
        Some((remaining_ms + 59_999) / 60_000)
    }

    /// Records a failed attempt against an identifier.
    ///
    /// On reaching [`MAX_LOGIN_ATTEMPTS`] the bucket locks for
    /// [`LOCKOUT_MINUTES`] and the attempt counter resets to zero, so the
    /// next failure after the window expires starts a fresh count.
    pub fn record_failure(&mut self, identifier: &str, now: DateTime<Utc>) -> FailureOutcome {
        let bucket = self.buckets.entry(Self::key(identifier)).or_default();

        bucket.attempts += 1;
        if bucket.attempts >= MAX_LOGIN_ATTEMPTS {
            bucket.attempts = 0;
            bucket.locked_until = Some(now + Duration::minutes(LOCKOUT_MINUTES));
            FailureOutcome::LockedOut {
                minutes: LOCKOUT_MINUTES,
            }
        } else {
            FailureOutcome::Counted {
                attempts: bucket.attempts,
            }
        }
    }

    /// Clears the counter and any lockout after a successful login.
    pub fn reset(&mut self, identifier: &str) {
        self.buckets.remove(&Self::key(identifier));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2026-01-05T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_three_failures_lock_the_identifier() {
        let mut tracker = LockoutTracker::new();
        let now = t0();

        assert_eq!(
            tracker.record_failure("maria", now),
            FailureOutcome::Counted { attempts: 1 }
        );
        assert_eq!(
            tracker.record_failure("maria", now),
            FailureOutcome::Counted { attempts: 2 }
        );
        assert_eq!(
            tracker.record_failure("maria", now),
            FailureOutcome::LockedOut { minutes: 5 }
        );

        // Locked with the full window remaining
        assert_eq!(tracker.remaining_lockout_minutes("maria", now), Some(5));
    }

    #[test]
    fn test_remaining_minutes_round_up() {
        let mut tracker = LockoutTracker::new();
        let now = t0();
        for _ in 0..3 {
            tracker.record_failure("maria", now);
        }

        // 4 minutes 30 seconds in: 30s remain, reported as 1 minute
        let later = now + Duration::seconds(270);
        assert_eq!(tracker.remaining_lockout_minutes("maria", later), Some(1));

        // Window over
        let expired = now + Duration::minutes(5);
        assert_eq!(tracker.remaining_lockout_minutes("maria", expired), None);
    }

    #[test]
    fn test_lockout_bucket_is_case_insensitive() {
        // Decision pinned: "Admin" and "admin" share one bucket
        let mut tracker = LockoutTracker::new();
        let now = t0();

        tracker.record_failure("Admin", now);
        tracker.record_failure("ADMIN", now);
        assert_eq!(
            tracker.record_failure("admin", now),
            FailureOutcome::LockedOut { minutes: 5 }
        );
        assert!(tracker.remaining_lockout_minutes("AdMiN", now).is_some());
    }

    #[test]
    fn test_reset_clears_counter_and_lockout() {
        let mut tracker = LockoutTracker::new();
        let now = t0();

        tracker.record_failure("maria", now);
        tracker.record_failure("maria", now);
        tracker.reset("maria");

        // Fresh count after reset
        assert_eq!(
            tracker.record_failure("maria", now),
            FailureOutcome::Counted { attempts: 1 }
        );

        for _ in 0..2 {
            tracker.record_failure("maria", now);
        }
        assert!(tracker.remaining_lockout_minutes("maria", now).is_some());
        tracker.reset("maria");
        assert_eq!(tracker.remaining_lockout_minutes("maria", now), None);
    }

    #[test]
    fn test_count_restarts_after_lockout_expires() {
        let mut tracker = LockoutTracker::new();
        let now = t0();
        for _ in 0..3 {
            tracker.record_failure("maria", now);
        }

        let after = now + Duration::minutes(6);
        assert_eq!(tracker.remaining_lockout_minutes("maria", after), None);
        // Counter was reset when the lockout was set
        assert_eq!(
            tracker.record_failure("maria", after),
            FailureOutcome::Counted { attempts: 1 }
        );
    }
}
