//! The single process-wide cancellation flag (§5, §9 "Global state"). Set
//! by a signal handler, checked at loop boundaries in the resolver and the
//! coordinator, cleared between top-level commands. No other global
//! mutable state is permitted in the core.

use std::sync::atomic::{AtomicBool, Ordering};

static CANCELLED: AtomicBool = AtomicBool::new(false);

/// Request cancellation of whatever long-running operation is in
/// progress. Safe to call from a signal handler: a single relaxed store.
pub fn request() {
    CANCELLED.store(true, Ordering::SeqCst);
}

pub fn is_requested() -> bool {
    CANCELLED.load(Ordering::SeqCst)
}

/// Reset the flag between top-level commands.
pub fn clear() {
    CANCELLED.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn request_then_clear_round_trips() {
        clear();
        assert!(!is_requested());
        request();
        assert!(is_requested());
        clear();
        assert!(!is_requested());
    }
}
