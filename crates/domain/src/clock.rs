use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

/// Abstracts wall-clock reads and sleeps so the Scheduler Loop and its tests
/// never call `Utc::now()` / `tokio::time::sleep` directly.
///
/// Production code uses `SystemClock`; scenario tests use `TestClock`, which
/// only advances when told to, so a deadline can be crossed deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Sleep until `deadline`, or return immediately if it is already past.
    fn sleep_until(&self, deadline: DateTime<Utc>) -> futures::future::BoxFuture<'_, ()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep_until(&self, deadline: DateTime<Utc>) -> futures::future::BoxFuture<'_, ()> {
        Box::pin(async move {
            let now = Utc::now();
            if deadline <= now {
                return;
            }
            let wait = (deadline - now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(wait).await;
        })
    }
}

/// A manually-advanceable clock for tests. `now()` is a millisecond counter
/// set at construction and moved forward with `advance`/`set`; `sleep_until`
/// polls rather than blocking on a timer, so scenario tests can drive the
/// scheduler loop to a deadline without a real wait.
pub struct TestClock {
    millis: Arc<AtomicI64>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    pub fn handle(&self) -> TestClockHandle {
        TestClockHandle {
            millis: self.millis.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TestClockHandle {
    millis: Arc<AtomicI64>,
}

impl TestClockHandle {
    pub fn advance(&self, delta: chrono::Duration) {
        self.millis
            .fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.millis.store(instant.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst))
            .single()
            .expect("valid timestamp")
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst))
            .single()
            .expect("valid timestamp")
    }

    fn sleep_until(&self, deadline: DateTime<Utc>) -> futures::future::BoxFuture<'_, ()> {
        Box::pin(async move {
            loop {
                if self.now() >= deadline {
                    return;
                }
                tokio::task::yield_now().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_clock_sleep_until_past_returns_immediately() {
        let clock = SystemClock;
        let past = clock.now() - chrono::Duration::seconds(5);
        clock.sleep_until(past).await;
    }

    #[tokio::test]
    async fn test_clock_advances_only_when_told() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let clock = TestClock::new(start);
        let handle = clock.handle();
        assert_eq!(clock.now(), start);

        handle.advance(chrono::Duration::seconds(10));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(10));
    }

    #[tokio::test]
    async fn test_clock_sleep_until_resolves_once_advanced() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let clock = Arc::new(TestClock::new(start));
        let handle = clock.handle();
        let deadline = start + chrono::Duration::seconds(2);

        let clock2 = clock.clone();
        let waiter = tokio::spawn(async move {
            clock2.sleep_until(deadline).await;
        });

        tokio::task::yield_now().await;
        handle.advance(chrono::Duration::seconds(5));
        waiter.await.unwrap();
    }
}
