use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Single-fire broadcast signal
///
/// Only the first call to [`CapSignal::fire`] takes effect; every waiter on
/// [`CapSignal::fired`] is released by it.
#[derive(Debug, Default)]
pub struct CapSignal {
    fired: AtomicBool,
    token: CancellationToken,
}

impl CapSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `true` for the call that fired it.
    pub fn fire(&self) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Wait until the signal has fired
    pub async fn fired(&self) {
        self.token.cancelled().await
    }
}
