use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use crate::stream::or_done::OrDone;
#[cfg(doc)]
use crate::stream::StreamComposeExt;

/// Stream for the [`StreamComposeExt::bridge`] method.
///
/// Flattens a stream of streams into one stream. Inner streams are adopted
/// strictly in the order the outer stream yields them and drained to
/// completion one at a time; both the outer reads and the inner reads are
/// raced against the token. An inner stream that never ends blocks
/// progression until cancellation; there is no per-inner-stream timeout.
#[must_use = "streams do nothing unless polled"]
#[pin_project::pin_project]
pub struct Bridge<St>
where
    St: Stream,
{
    #[pin]
    outer: OrDone<St>,
    #[pin]
    inner: Option<OrDone<St::Item>>,
    token: CancellationToken,
}

impl<St> Bridge<St>
where
    St: Stream,
    St::Item: Stream,
{
    pub(crate) fn new(stream: St, token: CancellationToken) -> Self {
        Self {
            outer: OrDone::new(stream, token.clone()),
            inner: None,
            token,
        }
    }
}

impl<St> Stream for Bridge<St>
where
    St: Stream,
    St::Item: Stream,
{
    type Item = <St::Item as Stream>::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(inner) = this.inner.as_mut().as_pin_mut() {
                match inner.poll_next(cx) {
                    Poll::Ready(Some(item)) => return Poll::Ready(Some(item)),
                    Poll::Ready(None) => this.inner.set(None),
                    Poll::Pending => return Poll::Pending,
                }
            }

            match this.outer.as_mut().poll_next(cx) {
                Poll::Ready(Some(stream)) => {
                    // Each adopted inner stream gets its own cancellation
                    // race, so a blocked inner read never outlives the token.
                    this.inner.set(Some(OrDone::new(stream, this.token.clone())));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // Unadopted inner streams have unknown lengths and cancellation can
        // end the stream at any point.
        (0, None)
    }
}

impl<St> fmt::Debug for Bridge<St>
where
    St: Stream + fmt::Debug,
    St::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("outer", &self.outer)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
