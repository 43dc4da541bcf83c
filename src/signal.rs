//! Combinators over [`CancellationToken`]s.
//!
//! A [`CancellationToken`] is the shutdown signal shared by every stage of a
//! pipeline: it is cancelled at most once, by its owner, and once cancelled
//! every waiter observes the cancellation forever. The combinators here only
//! compose tokens; they never cancel the caller's tokens themselves.
use futures_util::future::{self, FutureExt};
use tokio_util::sync::CancellationToken;

/// Returns a token that never becomes cancelled.
///
/// Useful as the signal for a pipeline that should only terminate when its
/// sources are exhausted. The returned token is the only handle to its
/// cancellation state, so nothing can ever cancel it behind the caller's
/// back (unless the caller cancels it explicitly, at which point it is just
/// an ordinary token).
pub fn never() -> CancellationToken {
    CancellationToken::new()
}

/// Returns a token that is cancelled as soon as *any* of `tokens` is
/// cancelled.
///
/// - With no input tokens this is [`never`].
/// - With a single input token, that token is returned unchanged.
/// - Otherwise a single merge task races all inputs and cancels the combined
///   token once, even if several inputs fire concurrently. The task exits as
///   soon as the first input fires; if no input ever fires it parks until
///   the runtime shuts down.
///
/// Must be called from within a Tokio runtime when two or more tokens are
/// passed.
pub fn any_cancelled<I>(tokens: I) -> CancellationToken
where
    I: IntoIterator<Item = CancellationToken>,
{
    let mut tokens: Vec<_> = tokens.into_iter().collect();
    match tokens.len() {
        0 => never(),
        1 => tokens.swap_remove(0),
        _ => {
            let combined = CancellationToken::new();
            let waiters: Vec<_> = tokens
                .into_iter()
                .map(|token| token.cancelled_owned().boxed())
                .collect();

            let merge = {
                let combined = combined.clone();
                async move {
                    future::select_all(waiters).await;
                    combined.cancel();
                }
            };
            #[cfg(feature = "tracing")]
            let merge = tracing::Instrument::in_current_span(merge);
            tokio::spawn(merge);

            combined
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time;
    use tokio_util::sync::CancellationToken;

    use crate::signal::{any_cancelled, never};

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_fire() {
        let token = never();
        let waited = time::timeout(Duration::from_secs(3600), token.cancelled()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_any_cancelled_empty_input() {
        let combined = any_cancelled([]);
        assert!(!combined.is_cancelled());
    }

    #[tokio::test]
    async fn test_any_cancelled_single_input_is_passed_through() {
        let token = CancellationToken::new();
        let combined = any_cancelled([token.clone()]);

        assert!(!combined.is_cancelled());
        token.cancel();
        combined.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_any_cancelled_fires_with_the_earliest_input() {
        let tokens: Vec<CancellationToken> =
            (0..3).map(|_| CancellationToken::new()).collect();
        let combined = any_cancelled(tokens.clone());

        // Cancel in reverse declaration order: the last token fires first.
        for (i, token) in tokens.into_iter().enumerate() {
            tokio::spawn(async move {
                time::sleep(Duration::from_secs(3 - i as u64)).await;
                token.cancel();
            });
        }

        let start = time::Instant::now();
        combined.cancelled().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_any_cancelled_concurrent_fires_are_harmless() {
        let first = CancellationToken::new();
        let second = CancellationToken::new();
        let combined = any_cancelled([first.clone(), second.clone()]);

        first.cancel();
        second.cancel();

        combined.cancelled().await;
        assert!(combined.is_cancelled());
    }
}
