//! Connection handle over a running driver

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ReplayConfig, SerialConfig};
use crate::driver::{Driver, DriverStats};
use crate::provider::Provider;
use crate::providers::{ReplayProvider, SerialProvider};
use crate::stream::ThrottleExt;
use crate::types::{Message, MeterIdentity, UpdateRate};
use crate::{MeterError, Result};

#[cfg(test)]
mod tests;

/// Connection to a meter, live or replayed.
///
/// Owns the driver task through its cancellation token; dropping the
/// connection stops reading.
pub struct MeterConnection {
    /// Latest decoded message
    messages: watch::Receiver<Option<Arc<Message>>>,

    /// Feed receiver created with the driver, handed to the first lossless
    /// subscriber so it sees messages decoded before it subscribed
    backlog: Mutex<Option<broadcast::Receiver<Arc<Message>>>>,

    /// Template for later lossless subscribers
    feed: broadcast::Receiver<Arc<Message>>,

    /// Latest identity
    identity: watch::Receiver<Option<Arc<MeterIdentity>>>,

    stats: watch::Receiver<DriverStats>,

    /// Source cadence, if known
    source_interval: Option<Duration>,

    /// Cancellation token for stopping tasks
    cancel: CancellationToken,
}

impl MeterConnection {
    /// Start reading from any provider.
    pub fn from_provider<P: Provider>(provider: P) -> Self {
        let source_interval = provider.nominal_interval();
        let channels = Driver::spawn(provider);

        let feed = channels.feed.resubscribe();
        Self {
            messages: channels.messages,
            backlog: Mutex::new(Some(channels.feed)),
            feed,
            identity: channels.identity,
            stats: channels.stats,
            source_interval,
            cancel: channels.cancel,
        }
    }

    /// Open a serial port and start reading.
    pub async fn open_serial(config: &SerialConfig) -> Result<Self> {
        let provider = SerialProvider::open(config).await?;
        info!(device = provider.device(), "Meter connection opened");
        Ok(Self::from_provider(provider))
    }

    /// Replay a capture file.
    pub async fn open_replay(config: &ReplayConfig) -> Result<Self> {
        let provider = ReplayProvider::open(config).await?;
        info!(path = %config.path.display(), "Replay connection opened");
        Ok(Self::from_provider(provider))
    }

    /// Subscribe to decoded messages
    ///
    /// At the native rate every message is delivered in order. The first
    /// such subscriber starts from the first message of the connection,
    /// later ones from the moment they subscribe. A subscriber more than
    /// [`FEED_CAPACITY`](crate::driver::FEED_CAPACITY) messages behind loses
    /// the oldest ones.
    ///
    /// With a throttled rate a new subscriber first sees the latest message,
    /// if any; messages in between are dropped and the latest one is
    /// delivered. Either stream ends when the driver stops.
    pub fn subscribe(&self, rate: UpdateRate) -> BoxStream<'static, Arc<Message>> {
        match rate.throttle_interval(self.source_interval) {
            None => self.every_message().boxed(),
            Some(period) => {
                debug!(?period, "Throttling subscription");
                WatchStream::new(self.messages.clone())
                    .filter_map(|opt| async move { opt })
                    .throttle(period)
                    .boxed()
            }
        }
    }

    fn every_message(&self) -> impl Stream<Item = Arc<Message>> + use<> {
        let receiver = self
            .backlog
            .lock()
            .ok()
            .and_then(|mut backlog| backlog.take())
            .unwrap_or_else(|| self.feed.resubscribe());

        BroadcastStream::new(receiver).filter_map(|item| async move {
            match item {
                Ok(message) => Some(message),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber fell behind, messages dropped");
                    None
                }
            }
        })
    }

    /// Get identity updates as a stream
    ///
    /// Yields the current identity first, then every change.
    pub fn identity_updates(&self) -> impl Stream<Item = Arc<MeterIdentity>> + use<> {
        WatchStream::new(self.identity.clone()).filter_map(|opt| async move { opt })
    }

    /// Get current identity (if any message has been decoded)
    pub fn current_identity(&self) -> Option<Arc<MeterIdentity>> {
        self.identity.borrow().clone()
    }

    /// Latest decoded message, `None` before the first one.
    pub fn current_message(&self) -> Option<Arc<Message>> {
        self.messages.borrow().clone()
    }

    /// Wait for a message to be available.
    pub async fn first_message(&self, timeout: Duration) -> Result<Arc<Message>> {
        let mut messages = self.messages.clone();
        let wait = async {
            let current = messages.wait_for(Option::is_some).await;
            current.ok().and_then(|m| m.clone())
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => {
                Err(MeterError::connection_failed("reader stopped before a message arrived"))
            }
            Err(_) => Err(MeterError::Timeout { duration: timeout }),
        }
    }

    /// Driver counters.
    pub fn stats(&self) -> DriverStats {
        *self.stats.borrow()
    }

    /// Whether the driver task is still reading.
    pub fn is_running(&self) -> bool {
        !self.stats.borrow().finished && !self.cancel.is_cancelled()
    }

    /// Wait until the driver task has stopped.
    pub async fn finished(&self) -> DriverStats {
        let mut stats = self.stats.clone();
        match stats.wait_for(|s| s.finished).await {
            Ok(stats) => *stats,
            Err(_) => *self.stats.borrow(),
        }
    }

    /// Stop reading. Subscriptions end shortly after.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Source cadence used to normalize update rates.
    pub fn source_interval(&self) -> Option<Duration> {
        self.source_interval
    }
}

impl Drop for MeterConnection {
    fn drop(&mut self) {
        debug!("Dropping meter connection");
        self.cancel.cancel();
    }
}
