use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Stream for the [`repeat`](crate::generate::repeat) function.
///
/// Always ready: the consumer's polling pace is the only throttle. Ends
/// when the token is cancelled (checked before every item), or immediately
/// if constructed with no values.
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
#[pin_project::pin_project]
pub struct Repeat<T> {
    #[pin]
    cancellation: WaitForCancellationFutureOwned,
    values: Vec<T>,
    cursor: usize,
    terminated: bool,
}

impl<T> Repeat<T> {
    pub(crate) fn new(values: Vec<T>, token: CancellationToken) -> Self {
        Self {
            cancellation: token.cancelled_owned(),
            values,
            cursor: 0,
            terminated: false,
        }
    }
}

impl<T> Stream for Repeat<T>
where
    T: Clone,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.terminated || this.values.is_empty() {
            return Poll::Ready(None);
        }

        if this.cancellation.poll(cx).is_ready() {
            *this.terminated = true;
            return Poll::Ready(None);
        }

        let item = this.values[*this.cursor].clone();
        *this.cursor = (*this.cursor + 1) % this.values.len();
        Poll::Ready(Some(item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.terminated || self.values.is_empty() {
            return (0, Some(0));
        }
        // Unbounded until cancellation is observed.
        (0, None)
    }
}
