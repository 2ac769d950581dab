// crates/research-orchestrator/src/clock.rs
// ============================================================================
// Module: Clocks
// Description: Production and test implementations of the Clock contract.
// Purpose: Give the engine exactly one time authority per process.
// Dependencies: research-core
// ============================================================================

//! ## Overview
//! The orchestrator is the only place wall-clock time enters the engine.
//! [`SystemClock`] reads the system time once per operation; [`ManualClock`]
//! lets tests fast-forward leases, retries, and TTLs instead of sleeping, so
//! every timing-sensitive proof is deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use research_core::Timestamp;
use research_core::interfaces::Clock;

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Clock reading the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Timestamp::from_unix_millis(millis)
    }
}

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Clock advanced explicitly, for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current time in unix milliseconds.
    now_millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock starting at the given time.
    #[must_use]
    pub fn starting_at(now: Timestamp) -> Self {
        Self {
            now_millis: AtomicI64::new(now.as_unix_millis()),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: Timestamp) {
        self.now_millis.store(now.as_unix_millis(), Ordering::SeqCst);
    }

    /// Advances the current time by the given milliseconds.
    pub fn advance_millis(&self, millis: i64) {
        self.now_millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.now_millis.load(Ordering::SeqCst))
    }
}
