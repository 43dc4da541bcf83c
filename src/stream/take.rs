use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use crate::stream::or_done::OrDone;
#[cfg(doc)]
use crate::stream::StreamComposeExt;

/// Stream for the [`StreamComposeExt::take_with_token`] method.
///
/// Yields at most `count` items; fewer if the source ends or the token is
/// cancelled first. Composing two takes over the same source is equivalent
/// to a single take of the smaller count.
#[must_use = "streams do nothing unless polled"]
#[pin_project::pin_project]
pub struct Take<St> {
    #[pin]
    stream: OrDone<St>,
    remaining: usize,
}

impl<St> Take<St> {
    pub(crate) fn new(stream: St, count: usize, token: CancellationToken) -> Self {
        Self {
            stream: OrDone::new(stream, token),
            remaining: count,
        }
    }
}

impl<St> Stream for Take<St>
where
    St: Stream,
{
    type Item = St::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.remaining == 0 {
            return Poll::Ready(None);
        }

        match this.stream.poll_next(cx) {
            Poll::Ready(Some(item)) => {
                *this.remaining -= 1;
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                *this.remaining = 0;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.stream.size_hint();
        let upper = upper.map_or(self.remaining, |u| u.min(self.remaining));
        (lower.min(self.remaining), Some(upper))
    }
}

impl<St> fmt::Debug for Take<St>
where
    St: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Take")
            .field("stream", &self.stream)
            .field("remaining", &self.remaining)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{stream, StreamExt};
    use tokio_util::sync::CancellationToken;

    use crate::generate;
    use crate::stream::StreamComposeExt;

    #[tokio::test]
    async fn test_take_with_token_yields_exactly_count_items() {
        let token = CancellationToken::new();
        let values: Vec<u32> = generate::repeat(vec![7], token.clone())
            .take_with_token(10_000, token)
            .collect()
            .await;

        assert_eq!(values.len(), 10_000);
        assert!(values.iter().all(|&v| v == 7));
    }

    #[tokio::test]
    async fn test_take_with_token_preserves_cyclic_order() {
        let token = CancellationToken::new();
        let values: Vec<u32> = generate::repeat(vec![1, 2, 3], token.clone())
            .take_with_token(10, token)
            .collect()
            .await;

        assert_eq!(values, &[1, 2, 3, 1, 2, 3, 1, 2, 3, 1]);
    }

    #[tokio::test]
    async fn test_take_with_token_yields_fewer_on_a_short_source() {
        let token = CancellationToken::new();
        let values: Vec<u32> = stream::iter([1, 2])
            .take_with_token(5, token)
            .collect()
            .await;

        assert_eq!(values, &[1, 2]);
    }

    #[tokio::test]
    async fn test_take_with_token_ends_on_cancellation() {
        let token = CancellationToken::new();
        let mut taken = std::pin::pin!(stream::pending::<u32>().take_with_token(5, token.clone()));

        token.cancel();
        assert_eq!(taken.next().await, None);
    }

    #[tokio::test]
    async fn test_stacked_takes_behave_like_the_smaller_take() {
        let token = CancellationToken::new();
        let stacked: Vec<u32> = generate::repeat(vec![1, 2, 3], token.clone())
            .take_with_token(8, token.clone())
            .take_with_token(5, token.clone())
            .collect()
            .await;
        let single: Vec<u32> = generate::repeat(vec![1, 2, 3], token.clone())
            .take_with_token(5, token)
            .collect()
            .await;

        assert_eq!(stacked, single);
        assert_eq!(stacked, &[1, 2, 3, 1, 2]);
    }
}
