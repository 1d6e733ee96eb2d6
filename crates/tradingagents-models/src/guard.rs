use std::sync::atomic::{AtomicU32, Ordering};

/// Returned when a run has used up its agent invocation budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardExhausted {
    pub limit: u32,
}

/// Run-scoped counter bounding total agent invocations.
///
/// The check and the increment are a single atomic step, so concurrent
/// analysts can never push the count past `limit`, and an invocation that
/// would exceed the limit is refused before it starts.
#[derive(Debug)]
pub struct RecursionGuard {
    limit: u32,
    count: AtomicU32,
}

impl RecursionGuard {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            count: AtomicU32::new(0),
        }
    }

    /// Reserve one invocation. Returns the new count on success.
    pub fn try_acquire(&self) -> Result<u32, GuardExhausted> {
        self.count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                (c < self.limit).then_some(c + 1)
            })
            .map(|prev| prev + 1)
            .map_err(|_| GuardExhausted { limit: self.limit })
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn refuses_before_exceeding() {
        let guard = RecursionGuard::new(2);
        assert_eq!(guard.try_acquire(), Ok(1));
        assert_eq!(guard.try_acquire(), Ok(2));
        assert_eq!(guard.try_acquire(), Err(GuardExhausted { limit: 2 }));
        assert_eq!(guard.count(), 2);
        assert_eq!(guard.remaining(), 0);
    }

    #[test]
    fn concurrent_acquires_never_overshoot() {
        let guard = Arc::new(RecursionGuard::new(50));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let g = Arc::clone(&guard);
                std::thread::spawn(move || (0..20).filter(|_| g.try_acquire().is_ok()).count())
            })
            .collect();
        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 50);
        assert_eq!(guard.count(), 50);
    }
}
