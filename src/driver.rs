//! Driver spawns and manages the frame reader task

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::provider::Provider;
use super::types::{IdentityTracker, Message, MeterIdentity};

/// Consecutive transport errors tolerated before the driver gives up.
const MAX_ERRORS: u32 = 10;

/// Messages buffered for each lossless subscriber.
pub const FEED_CAPACITY: usize = 1024;

/// Wait before retrying after the `error_count`-th consecutive error.
fn backoff_delay(error_count: u32) -> Duration {
    Duration::from_millis(50 * (1 << error_count.min(5)))
}

/// Counters published by the frame reader task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Frames received from the provider.
    pub frames: u64,
    /// Frames that decoded into a message.
    pub messages: u64,
    /// Frames discarded because they did not decode.
    pub decode_errors: u64,
    /// Set once the task has stopped.
    pub finished: bool,
}

/// Result of spawning driver tasks
pub struct DriverChannels {
    /// Latest decoded message
    pub messages: watch::Receiver<Option<Arc<Message>>>,
    /// Every decoded message, in order, subscribed before the task started
    pub feed: broadcast::Receiver<Arc<Message>>,
    /// Meter identity, updated when a message changes it
    pub identity: watch::Receiver<Option<Arc<MeterIdentity>>>,
    /// Running counters
    pub stats: watch::Receiver<DriverStats>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

struct Senders {
    messages: watch::Sender<Option<Arc<Message>>>,
    feed: broadcast::Sender<Arc<Message>>,
    identity: watch::Sender<Option<Arc<MeterIdentity>>>,
    stats: watch::Sender<DriverStats>,
}

/// Driver spawns and manages the frame reader task
///
/// The task owns the provider. It decodes every frame, drops the ones that
/// fail to decode, and publishes messages and identity changes on watch
/// channels. Every message also goes out on a broadcast feed, so subscribers
/// that need each reading do not depend on the task yielding between frames.
pub struct Driver;

impl Driver {
    /// Spawn the frame reader task for the given provider
    ///
    /// Returns watch receivers for messages, identity and counters, plus a
    /// cancellation token for graceful shutdown.
    pub fn spawn<P>(provider: P) -> DriverChannels
    where
        P: Provider,
    {
        let (message_tx, message_rx) = watch::channel(None);
        let (feed_tx, feed_rx) = broadcast::channel(FEED_CAPACITY);
        let (identity_tx, identity_rx) = watch::channel(None);
        let (stats_tx, stats_rx) = watch::channel(DriverStats::default());

        let cancel = CancellationToken::new();
        let senders = Senders {
            messages: message_tx,
            feed: feed_tx,
            identity: identity_tx,
            stats: stats_tx,
        };

        let cancel_reader = cancel.clone();
        tokio::spawn(async move {
            Self::frame_reader_task(provider, senders, cancel_reader).await;
        });

        DriverChannels {
            messages: message_rx,
            feed: feed_rx,
            identity: identity_rx,
            stats: stats_rx,
            cancel,
        }
    }

    /// Frame reader task - reads frames, decodes them and tracks identity
    async fn frame_reader_task<P>(mut provider: P, tx: Senders, cancel: CancellationToken)
    where
        P: Provider,
    {
        info!("Frame reader task started");
        let mut stats = DriverStats::default();
        let mut tracker = IdentityTracker::new();
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Frame reader cancelled");
                    break;
                }
                result = provider.next_frame() => result,
            };

            match result {
                Ok(Some(packet)) => {
                    stats.frames += 1;
                    error_count = 0;

                    let message = match Message::decode(&packet.data) {
                        Ok(message) => message,
                        Err(failed) => {
                            stats.decode_errors += 1;
                            warn!(
                                sequence = packet.sequence,
                                error = %failed.error,
                                frame = %packet.hex(),
                                "Discarding frame that failed to decode"
                            );
                            tx.stats.send_replace(stats);
                            continue;
                        }
                    };

                    stats.messages += 1;
                    trace!(sequence = packet.sequence, shape = ?message.shape, "Decoded frame");

                    if let Some(identity) = tracker.observe(&message) {
                        info!(
                            meter_id = identity.meter_id.as_deref().unwrap_or("-"),
                            meter_type = identity.meter_type.as_deref().unwrap_or("-"),
                            shapes = identity.shapes.len(),
                            "Meter identity updated"
                        );
                        tx.identity.send_replace(Some(Arc::new(identity.clone())));
                    }

                    tx.stats.send_replace(stats);
                    let message = Arc::new(message);
                    // No feed receivers only means no lossless subscriber yet.
                    let _ = tx.feed.send(Arc::clone(&message));
                    if tx.messages.send(Some(message)).is_err() {
                        debug!("Message receivers dropped, shutting down");
                        break;
                    }

                    // In-memory sources never return Pending; let subscribers run.
                    tokio::task::yield_now().await;
                }
                Ok(None) => {
                    info!(frames = stats.frames, "Provider stream ended");
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!("Provider error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many provider errors, shutting down");
                        break;
                    }

                    // Exponential backoff: 100ms after the first error, doubling up to 1.6s
                    let backoff = backoff_delay(error_count);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        stats.finished = true;
        tx.stats.send_replace(stats);
        info!(
            frames = stats.frames,
            messages = stats.messages,
            decode_errors = stats.decode_errors,
            "Frame reader task ended"
        );
    }
}
