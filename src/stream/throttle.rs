//! Stream throttling utilities

use futures::Stream;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Instant, Sleep, sleep};

/// Extension trait to add throttling to any Stream
pub trait ThrottleExt: Stream {
    /// Emit at most one item per `period`.
    ///
    /// The first item passes straight through. Items arriving while the gate
    /// is closed replace each other, and the latest one is emitted when the
    /// gate opens. An item still held when the inner stream ends is emitted
    /// before the throttled stream ends.
    fn throttle(self, period: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, period)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// Latest-wins rate limiter, see [`ThrottleExt::throttle`].
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        #[pin]
        gate: Sleep,
        period: Duration,
        armed: bool,
        pending: Option<S::Item>,
        upstream_done: bool,
    }
}

impl<S: Stream> Throttle<S> {
    /// Create a new throttled stream
    pub fn new(stream: S, period: Duration) -> Self {
        Self {
            stream,
            gate: sleep(Duration::ZERO),
            period,
            armed: false,
            pending: None,
            upstream_done: false,
        }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.upstream_done {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.upstream_done = true,
                Poll::Pending => break,
            }
        }

        if this.pending.is_none() {
            return if *this.upstream_done { Poll::Ready(None) } else { Poll::Pending };
        }

        if *this.armed && this.gate.as_mut().poll(cx).is_pending() {
            return Poll::Pending;
        }

        this.gate.as_mut().reset(Instant::now() + *this.period);
        *this.armed = true;
        Poll::Ready(this.pending.take())
    }
}
