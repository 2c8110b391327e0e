//! Sample-rate throttling for telemetry event streams

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

use crate::telemetry::{TelemetryEvent, TelemetrySample};

/// Extension trait to throttle the samples of any telemetry event stream
pub trait SampleThrottleExt: Stream<Item = TelemetryEvent> {
    /// Emit at most one sample per interval
    ///
    /// Uses "latest-wins" semantics for samples. Status events are never
    /// delayed or dropped.
    fn throttle_samples(self, period: Duration) -> SampleThrottle<Self>
    where
        Self: Sized,
    {
        SampleThrottle::new(self, period)
    }
}

impl<T: Stream<Item = TelemetryEvent>> SampleThrottleExt for T {}

pin_project! {
    /// A stream combinator that limits the sample rate
    pub struct SampleThrottle<S> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Option<TelemetrySample>,
        done: bool,
    }
}

impl<S> SampleThrottle<S> {
    /// Create a new throttled stream
    pub fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period);
        // Don't burst after an idle link
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, pending: None, done: false }
    }
}

impl<S: Stream<Item = TelemetryEvent>> Stream for SampleThrottle<S> {
    type Item = TelemetryEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain everything available, keeping only the latest sample
        while !*this.done {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(TelemetryEvent::Sample(sample))) => *this.pending = Some(sample),
                Poll::Ready(Some(status)) => return Poll::Ready(Some(status)),
                Poll::Ready(None) => *this.done = true,
                Poll::Pending => break,
            }
        }

        if this.pending.is_some() {
            if this.interval.poll_tick(cx).is_ready() {
                return Poll::Ready(this.pending.take().map(TelemetryEvent::Sample));
            }
            return Poll::Pending;
        }

        if *this.done { Poll::Ready(None) } else { Poll::Pending }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::StatusEvent;
    use futures::StreamExt;

    fn sample(n: u64) -> TelemetryEvent {
        TelemetryEvent::Sample(TelemetrySample {
            latitude: 47.0,
            longitude: 8.0,
            relative_altitude_m: 20.0,
            timestamp_ms: n,
        })
    }

    #[tokio::test]
    async fn burst_collapses_to_latest_sample() {
        let events = futures::stream::iter((1..=50).map(sample));
        let out: Vec<_> = events.throttle_samples(Duration::from_millis(20)).collect().await;

        // The whole burst is ready before the first tick, so only the last survives
        assert_eq!(out, vec![sample(50)]);
    }

    #[tokio::test]
    async fn status_events_are_never_dropped() {
        let events = futures::stream::iter(vec![
            sample(1),
            TelemetryEvent::StatusChanged(StatusEvent::timeout()),
            sample(2),
            TelemetryEvent::StatusChanged(StatusEvent::connected()),
            sample(3),
        ]);
        let out: Vec<_> = events.throttle_samples(Duration::from_millis(20)).collect().await;

        let statuses: Vec<_> = out.iter().filter_map(TelemetryEvent::status).collect();
        assert_eq!(statuses.len(), 2);
        assert_eq!(out.last(), Some(&sample(3)));
    }

    #[tokio::test]
    async fn spaced_samples_all_pass() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut throttled = tokio_stream::wrappers::UnboundedReceiverStream::new(rx)
            .throttle_samples(Duration::from_millis(10));

        for n in 0..3 {
            tx.send(sample(n)).unwrap();
            assert_eq!(throttled.next().await, Some(sample(n)));
            tokio::time::sleep(Duration::from_millis(15)).await;
        }
        drop(tx);
        assert_eq!(throttled.next().await, None);
    }
}
