use std::pin::{pin, Pin};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::stream::StreamComposeExt;

/// One side of a [`StreamComposeExt::tee`] split.
///
/// Yields every source value exactly once, in source order. Ends when the
/// source ends or the token is cancelled. Dropping this side stops delivery
/// to it without affecting the other side.
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct TeeStream<T> {
    receiver: mpsc::Receiver<T>,
    _relay: Arc<DropGuard>,
}

impl<T> Stream for TeeStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

pub(crate) fn split<St>(
    stream: St,
    token: CancellationToken,
) -> (TeeStream<St::Item>, TeeStream<St::Item>)
where
    St: Stream + Send + 'static,
    St::Item: Clone + Send + 'static,
{
    let (left_tx, left_rx) = mpsc::channel(1);
    let (right_tx, right_rx) = mpsc::channel(1);

    // The relay listens on a child token whose guard is shared by the two
    // halves, so dropping both halves tears the relay down even when the
    // caller's token never fires.
    let relay_token = token.child_token();
    let guard = Arc::new(relay_token.clone().drop_guard());

    let relay = relay(stream, relay_token, left_tx, right_tx);
    #[cfg(feature = "tracing")]
    let relay = tracing::Instrument::in_current_span(relay);
    tokio::spawn(relay);

    (
        TeeStream {
            receiver: left_rx,
            _relay: Arc::clone(&guard),
        },
        TeeStream {
            receiver: right_rx,
            _relay: guard,
        },
    )
}

async fn relay<St>(
    source: St,
    token: CancellationToken,
    left: mpsc::Sender<St::Item>,
    right: mpsc::Sender<St::Item>,
) where
    St: Stream,
    St::Item: Clone,
{
    let mut source = pin!(source.or_done(token.clone()));
    let mut left_open = true;
    let mut right_open = true;

    while let Some(value) = source.next().await {
        let mut left_pending = left_open;
        let mut right_pending = right_open;

        // Once a side accepts the value it is excluded from further
        // attempts, so the second delivery only contends on the remaining
        // side. A side whose receiver is gone counts as delivered and stays
        // closed for later values.
        while left_pending || right_pending {
            tokio::select! {
                _ = token.cancelled() => return,
                sent = left.send(value.clone()), if left_pending => {
                    left_pending = false;
                    left_open = sent.is_ok();
                }
                sent = right.send(value.clone()), if right_pending => {
                    right_pending = false;
                    right_open = sent.is_ok();
                }
            }
        }

        if !left_open && !right_open {
            return;
        }
    }
}
