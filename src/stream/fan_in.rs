use std::fmt;
use std::pin::{pin, Pin};
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;

use crate::stream::StreamComposeExt;

/// Stream returned by [`fan_in`].
///
/// Yields the values of all input streams interleaved in whatever order
/// their relays produce them. Ends only after every relay task has fully
/// terminated, so no input can still be producing when end-of-stream is
/// reported.
#[must_use = "streams do nothing unless polled"]
pub struct FanIn<T> {
    receiver: mpsc::Receiver<T>,
    drained: bool,
    ended: bool,
    wait: BoxFuture<'static, ()>,
    _relays: DropGuard,
}

/// Merges any number of streams into one stream.
///
/// One relay task is spawned per input; each wraps its input via
/// [`StreamComposeExt::or_done`] and races every send against `token`, so
/// cancelling the token drives the merged stream to end-of-stream without
/// leaving any relay blocked. There is no ordering guarantee across inputs.
///
/// Dropping the merged stream tears the relays down even if `token` never
/// fires. Must be called from within a Tokio runtime.
pub fn fan_in<I>(streams: I, token: CancellationToken) -> FanIn<<I::Item as Stream>::Item>
where
    I: IntoIterator,
    I::Item: Stream + Send + 'static,
    <I::Item as Stream>::Item: Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let relay_token = token.child_token();
    let tracker = TaskTracker::new();

    for stream in streams {
        let relay = relay(stream, relay_token.clone(), tx.clone());
        #[cfg(feature = "tracing")]
        let relay = tracing::Instrument::in_current_span(relay);
        tracker.spawn(relay);
    }
    // The channel reports end-of-stream once the last relay drops its
    // sender.
    drop(tx);
    tracker.close();

    let wait = {
        let tracker = tracker.clone();
        async move { tracker.wait().await }.boxed()
    };

    FanIn {
        receiver: rx,
        drained: false,
        ended: false,
        wait,
        _relays: relay_token.drop_guard(),
    }
}

async fn relay<St>(source: St, token: CancellationToken, output: mpsc::Sender<St::Item>)
where
    St: Stream,
{
    let mut source = pin!(source.or_done(token.clone()));
    while let Some(value) = source.next().await {
        tokio::select! {
            _ = token.cancelled() => return,
            sent = output.send(value) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

impl<T> Stream for FanIn<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.ended {
            return Poll::Ready(None);
        }

        if !this.drained {
            match this.receiver.poll_recv(cx) {
                Poll::Ready(Some(item)) => return Poll::Ready(Some(item)),
                Poll::Ready(None) => this.drained = true,
                Poll::Pending => return Poll::Pending,
            }
        }

        // All senders are gone; wait for the relay tasks to fully terminate
        // before reporting end-of-stream.
        match this.wait.as_mut().poll(cx) {
            Poll::Ready(()) => {
                this.ended = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for FanIn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanIn")
            .field("receiver", &self.receiver)
            .field("drained", &self.drained)
            .finish_non_exhaustive()
    }
}
