use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use crate::stream::or_done::OrDone;
#[cfg(doc)]
use crate::stream::StreamComposeExt;

/// Stream for the [`StreamComposeExt::try_transform`] method.
///
/// Applies a fallible operation to every item, with every source read raced
/// against the token. A failed operation becomes that item's `Err(...)`
/// result and travels downstream alongside the successes, so the consumer
/// handles failures with the full context of the larger program instead of
/// a mid-pipeline stage swallowing them.
#[must_use = "streams do nothing unless polled"]
#[pin_project::pin_project]
pub struct TryTransform<St, F> {
    #[pin]
    stream: OrDone<St>,
    op: F,
}

impl<St, F> TryTransform<St, F> {
    pub(crate) fn new(stream: St, op: F, token: CancellationToken) -> Self {
        Self {
            stream: OrDone::new(stream, token),
            op,
        }
    }
}

impl<St, F, U, E> Stream for TryTransform<St, F>
where
    St: Stream,
    F: FnMut(St::Item) -> Result<U, E>,
{
    type Item = Result<U, E>;

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

impl<St, F> fmt::Debug for TryTransform<St, F>
where
    St: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryTransform")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{stream, StreamExt};
    use tokio_util::sync::CancellationToken;

    use crate::stream::StreamComposeExt;

    fn check_url(url: &str) -> Result<usize, String> {
        if url.starts_with("https://") {
            Ok(url.len())
        } else {
            Err(format!("unsupported url: {url}"))
        }
    }

    #[tokio::test]
    async fn test_try_transform_delivers_per_item_errors_downstream() {
        let token = CancellationToken::new();
        let results: Vec<Result<usize, String>> =
            stream::iter(["https://ok", "bad url", "https://also-ok"])
                .try_transform(check_url, token)
                .collect()
                .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Ok(10));
        assert_eq!(
            results[1],
            Err("unsupported url: bad url".to_string())
        );
        assert_eq!(results[2], Ok(15));
    }

    #[tokio::test]
    async fn test_try_transform_lets_the_consumer_stop_after_too_many_errors() {
        let token = CancellationToken::new();
        let mut checked = std::pin::pin!(stream::iter(["a", "b", "c", "https://ok"])
            .try_transform(check_url, token.clone()));

        // The consumer decides the error policy; here it gives up after the
        // third failure and cancels the pipeline.
        let mut err_count = 0;
        while let Some(result) = checked.next().await {
            if result.is_err() {
                err_count += 1;
                if err_count >= 3 {
                    token.cancel();
                }
            }
        }

        assert_eq!(err_count, 3);
    }

    #[tokio::test]
    async fn test_try_transform_ends_on_cancellation() {
        let token = CancellationToken::new();
        let mut checked = std::pin::pin!(stream::pending::<&str>().try_transform(check_url, token.clone()));

        token.cancel();
        assert_eq!(checked.next().await, None);
    }
}
