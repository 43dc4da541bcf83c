use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use crate::stream::or_done::OrDone;
#[cfg(doc)]
use crate::stream::StreamComposeExt;

/// Stream for the [`StreamComposeExt::transform`] method.
///
/// Applies a function to every item of the source, with every source read
/// raced against the token.
#[must_use = "streams do nothing unless polled"]
#[pin_project::pin_project]
pub struct Transform<St, F> {
    #[pin]
    stream: OrDone<St>,
    op: F,
}

impl<St, F> Transform<St, F> {
    pub(crate) fn new(stream: St, op: F, token: CancellationToken) -> Self {
        Self {
            stream: OrDone::new(stream, token),
            op,
        }
    }
}

impl<St, F, U> Stream for Transform<St, F>
where
    St: Stream,
    F: FnMut(St::Item) -> U,
{
    type Item = U;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        this.stream
            .poll_next(cx)
            .map(|opt| opt.map(|item| (this.op)(item)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

impl<St, F> fmt::Debug for Transform<St, F>
where
    St: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{stream, StreamExt};
    use tokio_util::sync::CancellationToken;

    use crate::stream::StreamComposeExt;

    #[tokio::test]
    async fn test_transform_applies_arithmetic_stages_in_order() {
        let token = CancellationToken::new();
        let values: Vec<i64> = stream::iter(1..=9i64)
            .transform(|v| v * 2, token.clone())
            .transform(|v| v + 1, token)
            .collect()
            .await;

        assert_eq!(values, &[3, 5, 7, 9, 11, 13, 15, 17, 19]);
    }

    #[tokio::test]
    async fn test_transform_ends_on_cancellation() {
        let token = CancellationToken::new();
        let mut doubled = std::pin::pin!(stream::pending::<i64>().transform(|v| v * 2, token.clone()));

        token.cancel();
        assert_eq!(doubled.next().await, None);
    }
}
