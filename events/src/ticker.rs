use crate::{Payload, Publisher};
use chrono::{DateTime, Local};
use log::*;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Periodically publishes a synthetic "the time is ..." event.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Body of the synthetic event emitted at `now`.
    pub fn message_at(now: DateTime<Local>) -> Payload {
        Payload::from(format!("the time is {now}"))
    }

    /// Publish one event per period until `cancel` fires or the publisher closes.
    ///
    /// The first event goes out one full period after start.
    pub async fn run<P>(self, publisher: &P, cancel: CancellationToken)
    where
        P: Publisher + ?Sized,
    {
        let mut interval = time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Ticker cancelled");
                    return;
                }
                _ = interval.tick() => {}
            }

            debug!("Sending event");
            match publisher.publish(Self::message_at(Local::now())).await {
                Ok(()) => {}
                Err(e) if e.is_closed() => {
                    info!("Ticker target closed, stopping");
                    return;
                }
                Err(e) => warn!("Ticker failed to publish event: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every payload and closes after `limit` of them.
    struct Recorder {
        payloads: Mutex<Vec<Payload>>,
        limit: usize,
        fail_first: bool,
    }

    impl Recorder {
        fn new(limit: usize) -> Self {
            Self {
                payloads: Mutex::new(Vec::new()),
                limit,
                fail_first: false,
            }
        }

        fn count(&self) -> usize {
            self.payloads.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Publisher for Recorder {
        async fn publish(&self, payload: Payload) -> Result<(), Error> {
            let mut payloads = self.payloads.lock().unwrap();
            if payloads.len() >= self.limit {
                return Err(Error::closed());
            }
            payloads.push(payload);
            if self.fail_first && payloads.len() == 1 {
                return Err(Error::backend("transient"));
            }
            Ok(())
        }
    }

    #[test]
    fn message_uses_the_time_is_prefix() {
        let payload = Ticker::message_at(Local::now());
        assert!(payload.starts_with(b"the time is "));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_publisher_closes() {
        let recorder = Recorder::new(3);
        Ticker::new(Duration::from_secs(2))
            .run(&recorder, CancellationToken::new())
            .await;

        assert_eq!(recorder.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn first_event_waits_one_period() {
        let recorder = Recorder::new(usize::MAX);
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let run = Ticker::new(Duration::from_secs(2)).run(&recorder, cancel.clone());
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => panic!("ticker exited early"),
            _ = time::sleep(Duration::from_millis(1999)) => {}
        }
        assert_eq!(recorder.count(), 0);

        tokio::select! {
            _ = &mut run => panic!("ticker exited early"),
            _ = time::sleep(Duration::from_millis(2)) => {}
        }
        assert_eq!(recorder.count(), 1);
        assert!(started.elapsed() >= Duration::from_secs(2));

        cancel.cancel();
        run.await;
        assert_eq!(recorder.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_ticking_after_backend_error() {
        let mut recorder = Recorder::new(2);
        recorder.fail_first = true;

        Ticker::new(Duration::from_secs(1))
            .run(&recorder, CancellationToken::new())
            .await;

        assert_eq!(recorder.count(), 2);
    }

    #[tokio::test]
    async fn cancelled_ticker_publishes_nothing() {
        let recorder = Recorder::new(usize::MAX);
        let cancel = CancellationToken::new();
        cancel.cancel();

        Ticker::new(Duration::from_secs(60))
            .run(&recorder, cancel)
            .await;

        assert_eq!(recorder.count(), 0);
    }
}
