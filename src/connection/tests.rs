//! Connection tests over the replay provider
//!
//! These verify that decoded messages and identity changes reach subscribers,
//! and that throttled subscriptions deliver the latest reading.

use super::*;
use crate::providers::ReplayProvider;
use crate::test_utils::{MessageBuilder, fixture_stream};
use crate::types::Shape;
use futures::StreamExt;

const METER_INTERVAL: Duration = Duration::from_secs(2);

/// Minimal lists with rising import power, a full list after every third.
fn capture(lists: i32) -> Vec<u8> {
    let mut bytes = Vec::new();
    for n in 1..=lists {
        bytes.extend(MessageBuilder::new(Shape::Minimal).active_power_positive(n).build_stream());
        if n % 3 == 0 {
            bytes.extend(fixture_stream());
        }
    }
    bytes
}

fn paced(bytes: Vec<u8>) -> MeterConnection {
    MeterConnection::from_provider(
        ReplayProvider::from_bytes(bytes).with_frame_interval(METER_INTERVAL),
    )
}

#[tokio::test(start_paused = true)]
async fn native_subscription_sees_every_paced_message() {
    let connection = paced(capture(3));
    let messages: Vec<_> = connection.subscribe(UpdateRate::Native).collect().await;

    let shapes: Vec<_> = messages.iter().map(|m| m.shape).collect();
    assert_eq!(
        shapes,
        [
            Some(Shape::Minimal),
            Some(Shape::Minimal),
            Some(Shape::Minimal),
            Some(Shape::ThreePhaseEnergy)
        ]
    );
    assert_eq!(messages[2].active_power_positive, Some(3));
    assert_eq!(messages[3].meter_id.as_deref(), Some("1234567890123456"));
}

#[tokio::test]
async fn native_subscription_is_lossless_without_pacing() {
    let connection = MeterConnection::from_provider(ReplayProvider::from_bytes(capture(9)));
    let messages: Vec<_> = connection.subscribe(UpdateRate::Native).collect().await;

    // Nine minimal lists plus three full lists.
    assert_eq!(messages.len(), 12);
    let minimal: Vec<_> = messages
        .iter()
        .filter(|m| m.shape == Some(Shape::Minimal))
        .map(|m| m.active_power_positive)
        .collect();
    assert_eq!(minimal, (1..=9).map(Some).collect::<Vec<_>>());
    assert_eq!(connection.finished().await.messages, 12);
}

#[tokio::test(start_paused = true)]
async fn later_native_subscriber_starts_from_now() {
    let connection = paced(capture(6));
    let mut first = connection.subscribe(UpdateRate::Native);
    assert_eq!(first.next().await.unwrap().active_power_positive, Some(1));
    assert_eq!(first.next().await.unwrap().active_power_positive, Some(2));

    let second: Vec<_> = connection.subscribe(UpdateRate::Native).collect().await;
    assert_eq!(second.first().and_then(|m| m.active_power_positive), Some(3));
    assert_eq!(second.len(), 6);
}

#[tokio::test(start_paused = true)]
async fn throttled_subscription_delivers_latest() {
    let connection = paced(capture(6));
    assert_eq!(connection.source_interval(), Some(METER_INTERVAL));

    let start = tokio::time::Instant::now();
    let messages: Vec<_> =
        connection.subscribe(UpdateRate::Every(Duration::from_secs(5))).collect().await;

    // Eight frames over 14 seconds, at most one per 5 seconds after the first.
    assert!(messages.len() >= 3 && messages.len() <= 4, "got {}", messages.len());
    assert_eq!(messages[0].active_power_positive, Some(1));
    assert!(start.elapsed() >= Duration::from_secs(14));

    let last = messages.last().unwrap();
    assert_eq!(last.shape, Some(Shape::ThreePhaseEnergy));
}

#[tokio::test(start_paused = true)]
async fn identity_updates_follow_new_shapes() {
    let connection = paced(capture(6));
    let identities: Vec<_> = connection.identity_updates().collect().await;

    assert_eq!(identities.len(), 2);
    assert!(identities[0].meter_id.is_none());
    assert_eq!(identities[0].phase_count(), 0);
    assert_eq!(identities[1].meter_type.as_deref(), Some("MA304H4D"));
    assert!(identities[1].reports_energy());

    let current = connection.current_identity().unwrap();
    assert_eq!(*current, *identities[1]);
}

#[tokio::test(start_paused = true)]
async fn first_message_waits_for_data() {
    let connection = paced(capture(1));
    let message = connection.first_message(Duration::from_secs(1)).await.unwrap();
    assert_eq!(message.active_power_positive, Some(1));
    assert_eq!(connection.current_message().as_deref(), Some(&*message));
}

#[tokio::test(start_paused = true)]
async fn first_message_times_out_on_silent_source() {
    let (_keep_open, reader) = tokio::io::duplex(64);
    let connection =
        MeterConnection::from_provider(crate::providers::ReaderProvider::new(reader));

    let err = connection.first_message(Duration::from_secs(3)).await.unwrap_err();
    assert!(matches!(err, MeterError::Timeout { duration } if duration == Duration::from_secs(3)));
    assert!(connection.is_running());
}

#[tokio::test]
async fn garbage_only_capture_ends_without_messages() {
    let connection = MeterConnection::from_provider(ReplayProvider::from_bytes(vec![0x55; 300]));
    let stats = connection.finished().await;

    assert_eq!(stats.messages, 0);
    assert!(connection.current_identity().is_none());
    assert!(connection.first_message(Duration::from_secs(1)).await.is_err());
    assert!(!connection.is_running());
}

#[tokio::test(start_paused = true)]
async fn dropping_connection_ends_subscriptions() {
    let connection = paced(capture(30));
    let mut stream = connection.subscribe(UpdateRate::Native);
    assert!(stream.next().await.is_some());

    drop(connection);
    let rest: Vec<_> = stream.collect().await;
    assert!(rest.len() <= 1, "stream kept running after drop");
}
