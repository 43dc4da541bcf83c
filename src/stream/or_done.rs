use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

#[cfg(doc)]
use crate::stream::StreamComposeExt;

/// Stream for the [`StreamComposeExt::or_done`] method.
///
/// Ends on whichever of {source ended, token cancelled} is observed first.
/// Polling is biased towards cancellation so that an always-ready source
/// cannot delay shutdown: once the token fires, the very next poll reports
/// end-of-stream and the source is never polled again.
///
/// The stream is fused: after it has ended it keeps reporting
/// end-of-stream.
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
#[pin_project::pin_project]
pub struct OrDone<St> {
    #[pin]
    cancellation: WaitForCancellationFutureOwned,
    #[pin]
    stream: St,
    terminated: bool,
}

impl<St> OrDone<St> {
    pub(crate) fn new(stream: St, token: CancellationToken) -> Self {
        Self {
            cancellation: token.cancelled_owned(),
            stream,
            terminated: false,
        }
    }
}

impl<St> Stream for OrDone<St>
where
    St: Stream,
{
    type Item = St::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.terminated {
            return Poll::Ready(None);
        }

        if this.cancellation.poll(cx).is_ready() {
            *this.terminated = true;
            return Poll::Ready(None);
        }

        match this.stream.poll_next(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item)),
            Poll::Ready(None) => {
                *this.terminated = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.terminated {
            return (0, Some(0));
        }
        // Cancellation may cut the stream short at any point.
        (0, self.stream.size_hint().1)
    }
}
