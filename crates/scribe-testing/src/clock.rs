use scribe_core::{Clock, HostSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hostname reported by [`fixed_host`].
pub const TEST_HOSTNAME: &str = "test-host";

/// Pid reported by [`fixed_host`].
pub const TEST_PID: u32 = 4242;

pub fn fixed_host() -> HostSnapshot {
    HostSnapshot::fixed(TEST_HOSTNAME, TEST_PID)
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<AtomicU64>,
}

impl FixedClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_millis)),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
