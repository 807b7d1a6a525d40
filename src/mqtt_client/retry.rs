// SPDX-License-Identifier: MPL-2.0

//! Reconnection backoff policy.

use std::future::Future;
use std::time::Duration;

use crate::mqtt_client::error::ClientError;
use crate::mqtt_client::opts::ConnectOptions;

/// Exponential backoff. Delays grow by `factor` per attempt up to `max`,
/// and [`Backoff::reset`] returns to `initial` after a successful open.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            initial,
            max,
            factor,
            current: initial,
        }
    }

    /// Delay to sleep before the next attempt. Advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let scaled = self.current.as_secs_f64() * self.factor;
        self.current = Duration::from_secs_f64(scaled).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Decides whether a failed connection attempt is worth repeating and how
/// long to wait before repeating it.
#[derive(Debug, Clone)]
pub struct Reconnector {
    backoff: Backoff,
    stop_on_protocol_error: bool,
    stop_on_broker_rejection: bool,
}

impl Reconnector {
    pub fn from_options(opts: &ConnectOptions) -> Self {
        Self {
            backoff: Backoff::new(
                opts.reconnect_initial_delay,
                opts.reconnect_max_delay,
                opts.reconnect_factor,
            ),
            stop_on_protocol_error: opts.stop_on_protocol_error,
            stop_on_broker_rejection: opts.stop_on_broker_rejection,
        }
    }

    pub fn should_retry(&self, error: &ClientError) -> bool {
        match error {
            ClientError::BrokerRejectedConnection { .. } => !self.stop_on_broker_rejection,
            e if e.is_protocol_error() => !self.stop_on_protocol_error,
            e => e.should_reconnect(),
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        self.backoff.next_delay()
    }

    pub fn reset(&mut self) {
        self.backoff.reset();
    }

    /// Drives `attempt` until it succeeds or fails with an error the policy
    /// refuses to retry. Resets the backoff on success.
    pub async fn run<T, F, Fut>(&mut self, mut attempt: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        loop {
            match attempt().await {
                Ok(value) => {
                    self.reset();
                    return Ok(value);
                }
                Err(error) if self.should_retry(&error) => {
                    let delay = self.next_delay();
                    tracing::info!(error = %error, delay_ms = delay.as_millis() as u64,
                        "connection attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    tracing::error!(error = %error, "connection attempt failed, giving up");
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delays_double_up_to_the_cap_and_reset() {
        let mut backoff = Backoff::new(
            Duration::from_secs(1),
            Duration::from_secs(10),
            2.0,
        );
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 10, 10]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn rejection_and_protocol_errors_stop_by_default() {
        let reconnector = Reconnector::from_options(&ConnectOptions::default());
        assert!(!reconnector.should_retry(&ClientError::BrokerRejectedConnection {
            reason_code: 0x87
        }));
        assert!(!reconnector.should_retry(&ClientError::Protocol("bad CONNACK".into())));
        assert!(reconnector.should_retry(&ClientError::ConnectionTimeout));
        assert!(reconnector.should_retry(
            &io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into()
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn run_retries_transient_failures() {
        let mut opts = ConnectOptions::default();
        opts.reconnect_initial_delay = Duration::from_millis(10);
        let mut reconnector = Reconnector::from_options(&opts);

        let attempts = AtomicU32::new(0);
        let result = reconnector
            .run(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ClientError::ConnectionTimeout)
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run_stops_on_broker_rejection() {
        let mut reconnector = Reconnector::from_options(&ConnectOptions::default());
        let result: Result<(), _> = reconnector
            .run(|| async {
                Err(ClientError::BrokerRejectedConnection { reason_code: 0x9c })
            })
            .await;
        assert!(matches!(
            result,
            Err(ClientError::BrokerRejectedConnection { reason_code: 0x9c })
        ));
    }
}
