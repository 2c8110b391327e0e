//! Telemetry Relay: a connect/stream/reconnect loop that never gives up
//!
//! The relay owns a [`LinkSession`] on a spawned task and publishes
//! [`TelemetryEvent`]s to any number of consumers. Publishing never blocks:
//! events go out on a broadcast channel, and the current status and latest
//! sample are mirrored on watch channels for late joiners.
//!
//! Startup is explicit so consumers can attach before the first event:
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use mavgcs::{Endpoint, LinkSession, TelemetryRelay};
//! use mavgcs::config::GcsConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> mavgcs::Result<()> {
//! let config = GcsConfig::default();
//! let endpoint: Endpoint = "udp:127.0.0.1:14551".parse()?;
//! let relay = TelemetryRelay::new(LinkSession::new(endpoint, config.link), config.relay);
//! let mut events = relay.subscribe();
//! let handle = relay.start();
//!
//! while let Some(event) = events.next().await {
//!     println!("{event:?}");
//! }
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::RelayConfig;
use crate::session::{ConnectionState, LinkSession};
use crate::stream::SampleThrottleExt;
use crate::telemetry::{StatusEvent, TelemetryEvent, TelemetrySample};
use crate::types::UpdateRate;

/// Fan-out side shared by the loop and every handle
struct Publisher {
    events: broadcast::Sender<TelemetryEvent>,
    status: watch::Sender<StatusEvent>,
    latest: watch::Sender<Option<TelemetrySample>>,
}

impl Publisher {
    fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        let (status, _) = watch::channel(StatusEvent::idle());
        let (latest, _) = watch::channel(None);
        Self { events, status, latest }
    }

    fn publish_status(&self, event: StatusEvent) {
        debug!("Relay status: {:?} ({})", event.status, event.message);
        self.status.send_replace(event.clone());
        // No subscribers is fine
        let _ = self.events.send(TelemetryEvent::StatusChanged(event));
    }

    fn publish_sample(&self, sample: TelemetrySample) {
        trace!("Sample {:.7}, {:.7} @ {} m", sample.latitude, sample.longitude, sample.relative_altitude_m);
        self.latest.send_replace(Some(sample));
        let _ = self.events.send(TelemetryEvent::Sample(sample));
    }

    /// Current status first, then live events
    fn subscribe(&self) -> BoxStream<'static, TelemetryEvent> {
        // Subscribe before reading the status so no transition falls in between
        let live = BroadcastStream::new(self.events.subscribe()).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("Telemetry consumer lagging, skipped {} events", skipped);
                    None
                }
            }
        });
        let current = TelemetryEvent::StatusChanged(self.status.borrow().clone());
        stream::once(async move { current }).chain(live).boxed()
    }
}

/// A relay that has not been started yet
pub struct TelemetryRelay {
    session: LinkSession,
    config: RelayConfig,
    publisher: Arc<Publisher>,
}

impl TelemetryRelay {
    pub fn new(session: LinkSession, config: RelayConfig) -> Self {
        let publisher = Arc::new(Publisher::new(config.event_capacity));
        Self { session, config, publisher }
    }

    /// Attach a consumer before the loop starts
    pub fn subscribe(&self) -> BoxStream<'static, TelemetryEvent> {
        self.publisher.subscribe()
    }

    /// Spawn the relay loop
    pub fn start(self) -> RelayHandle {
        let cancel = CancellationToken::new();
        let publisher = Arc::clone(&self.publisher);
        let task = tokio::spawn(relay_loop(self.session, self.config, publisher, cancel.clone()));
        RelayHandle { publisher: self.publisher, cancel, task: Some(task) }
    }
}

/// Control handle for a running relay
///
/// Dropping the handle stops the loop.
pub struct RelayHandle {
    publisher: Arc<Publisher>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RelayHandle {
    /// Every event, current status first
    pub fn subscribe(&self) -> BoxStream<'static, TelemetryEvent> {
        self.publisher.subscribe()
    }

    /// Events with samples limited to `rate`
    pub fn subscribe_at(&self, rate: UpdateRate) -> BoxStream<'static, TelemetryEvent> {
        match rate.throttle_interval() {
            None => self.subscribe(),
            Some(period) => self.subscribe().throttle_samples(period).boxed(),
        }
    }

    pub fn current_status(&self) -> StatusEvent {
        self.publisher.status.borrow().clone()
    }

    pub fn latest_sample(&self) -> Option<TelemetrySample> {
        *self.publisher.latest.borrow()
    }

    /// Observe status transitions without the sample traffic
    pub fn watch_status(&self) -> watch::Receiver<StatusEvent> {
        self.publisher.status.subscribe()
    }

    /// Cancellation token shared with the loop, e.g. for ctrl-c wiring
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the loop and wait for it to close the link
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Relay task failed: {}", e);
            }
        }
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn relay_loop(
    mut session: LinkSession,
    config: RelayConfig,
    publisher: Arc<Publisher>,
    cancel: CancellationToken,
) {
    let endpoint = session.describe();
    info!("Telemetry relay started on {}", endpoint);
    let mut samples = 0u64;

    // Reconnect cycles are announced by the status that ended the previous one
    publisher.publish_status(StatusEvent::connecting(&endpoint));

    'relay: loop {
        let state = tokio::select! {
            _ = cancel.cancelled() => break 'relay,
            state = session.connect() => state,
        };

        if state == ConnectionState::Connected {
            publisher.publish_status(StatusEvent::connected());

            loop {
                let received = tokio::select! {
                    _ = cancel.cancelled() => break 'relay,
                    received = session.receive_matching(|_| true, config.idle_timeout) => received,
                };

                match received {
                    Ok(Some(received)) => {
                        if let Some(sample) = TelemetrySample::decode(&received) {
                            samples += 1;
                            publisher.publish_sample(sample);
                        }
                    }
                    Ok(None) => {
                        warn!("No telemetry on {} for {:?}", endpoint, config.idle_timeout);
                        publisher.publish_status(StatusEvent::timeout());
                        break;
                    }
                    Err(e) => {
                        error!("Telemetry link error on {}: {}", endpoint, e);
                        publisher.publish_status(StatusEvent::error(&e));
                        break;
                    }
                }
            }
        } else {
            publisher.publish_status(StatusEvent::reconnecting());
        }

        session.close().await;

        tokio::select! {
            _ = cancel.cancelled() => break 'relay,
            _ = tokio::time::sleep(config.reconnect_backoff) => {}
        }
    }

    session.close().await;
    publisher.publish_status(StatusEvent::stopped());
    info!("Telemetry relay stopped after {} samples", samples);
}
