use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Stream for the [`repeat_with`](crate::generate::repeat_with) function.
///
/// Calls its generator once per poll, forever; the cancellation check runs
/// before every call, so a cancelled token means the generator is never
/// invoked again.
#[must_use = "streams do nothing unless polled"]
#[pin_project::pin_project]
pub struct RepeatWith<F> {
    #[pin]
    cancellation: WaitForCancellationFutureOwned,
    op: F,
    terminated: bool,
}

impl<F> RepeatWith<F> {
    pub(crate) fn new(op: F, token: CancellationToken) -> Self {
        Self {
            cancellation: token.cancelled_owned(),
            op,
            terminated: false,
        }
    }
}

impl<F, T> Stream for RepeatWith<F>
where
    F: FnMut() -> T,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.terminated {
            return Poll::Ready(None);
        }

        if this.cancellation.poll(cx).is_ready() {
            *this.terminated = true;
            return Poll::Ready(None);
        }

        Poll::Ready(Some((this.op)()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.terminated {
            return (0, Some(0));
        }
        (0, None)
    }
}

impl<F> fmt::Debug for RepeatWith<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatWith")
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}
