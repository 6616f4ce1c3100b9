//! Retry and pacing helpers for remote calls.

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::HttpSettings;
use crate::error::Result;

/// Retries transient failures with linear backoff (`backoff * attempt`).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_settings(http: &HttpSettings) -> Self {
        Self::new(http.max_retries, http.retry_backoff)
    }

    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let wait = self.backoff * attempt;
                    warn!(
                        "{what} failed ({err}), retry {attempt}/{} in {}ms",
                        self.max_retries,
                        wait.as_millis()
                    );
                    thread::sleep(wait);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Keeps a minimum delay between consecutive submissions.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                let remaining = self.delay - elapsed;
                debug!("Pacing: sleeping {}ms", remaining.as_millis());
                thread::sleep(remaining);
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use std::cell::Cell;

    fn throttled() -> SyncError {
        SyncError::HttpStatus {
            endpoint: "stocks".to_string(),
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        }
    }

    #[test]
    fn retries_transient_errors_until_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let value = policy
            .run("upload", || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(throttled())
                } else {
                    Ok(42)
                }
            })
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let result: Result<()> = policy.run("upload", || {
            calls.set(calls.get() + 1);
            Err(throttled())
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn does_not_retry_rejections() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let result: Result<()> = policy.run("upload", || {
            calls.set(calls.get() + 1);
            Err(SyncError::HttpStatus {
                endpoint: "prices".to_string(),
                status: reqwest::StatusCode::UNAUTHORIZED,
                body: "bad token".to_string(),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn pacer_does_not_wait_before_first_call() {
        let mut pacer = Pacer::new(Duration::from_secs(60));
        let started = Instant::now();
        pacer.wait();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
