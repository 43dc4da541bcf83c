use std::pin::{pin, Pin};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::stream::StreamComposeExt;

/// One branch of a [`StreamComposeExt::fan_out`] split.
///
/// Branches compete for the source's values: every value is yielded by
/// exactly one branch, with no ordering or fairness guarantee across
/// branches. A branch ends when the source ends or the token is cancelled.
#[pin_project::pin_project]
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct FanOutBranch<T> {
    #[pin]
    receiver: async_channel::Receiver<T>,
    _pump: Arc<DropGuard>,
}

impl<T> Stream for FanOutBranch<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().receiver.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.receiver.size_hint()
    }
}

pub(crate) fn distribute<St>(
    stream: St,
    branches: usize,
    token: CancellationToken,
) -> Vec<FanOutBranch<St::Item>>
where
    St: Stream + Send + 'static,
    St::Item: Send + 'static,
{
    // A one-value multi-consumer channel: whichever branch polls first
    // steals the in-flight value, which is what makes the branches
    // work-stealing workers over a single shared source.
    let (tx, rx) = async_channel::bounded(1);

    // The pump listens on a child token whose guard is shared by the
    // branches, so dropping every branch tears the pump down even when the
    // caller's token never fires.
    let pump_token = token.child_token();
    let guard = Arc::new(pump_token.clone().drop_guard());

    let pump = pump(stream, pump_token, tx);
    #[cfg(feature = "tracing")]
    let pump = tracing::Instrument::in_current_span(pump);
    tokio::spawn(pump);

    (0..branches)
        .map(|_| FanOutBranch {
            receiver: rx.clone(),
            _pump: Arc::clone(&guard),
        })
        .collect()
}

async fn pump<St>(source: St, token: CancellationToken, output: async_channel::Sender<St::Item>)
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
