//! Extension methods for anything that implements the [`Stream`] trait.
use futures_util::Stream;
#[cfg(doc)]
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

mod bridge;
mod fan_in;
mod fan_out;
mod or_done;
mod project;
mod take;
mod tee;
mod transform;
mod try_transform;

pub use bridge::Bridge;
pub use fan_in::{fan_in, FanIn};
pub use fan_out::FanOutBranch;
pub use or_done::OrDone;
pub use project::{Project, ProjectionError};
pub use take::Take;
pub use tee::TeeStream;
pub use transform::Transform;
pub use try_transform::TryTransform;

/// Extension trait for [`Stream`] to add cancellation-aware composition
/// methods to it.
///
/// Every adaptor that takes a [`CancellationToken`] reports end-of-stream
/// within one poll of the token being cancelled, regardless of whether its
/// source is ready, pending, or blocked mid-send. Cancellation is never an
/// error: a cancelled pipeline shuts down silently, exactly as if its
/// sources had run dry.
pub trait StreamComposeExt: Stream {
    /// Races every read from this stream against `token`.
    ///
    /// The returned stream ends as soon as either the source ends or the
    /// token is cancelled, whichever is observed first; after that the
    /// source is never polled again. This is the universal adaptor the
    /// other combinators are built from: it makes a stream of unknown
    /// cancellation behavior safe to drain inside a cancellable pipeline.
    fn or_done(self, token: CancellationToken) -> OrDone<Self>
    where
        Self: Sized,
    {
        OrDone::new(self, token)
    }

    /// Flattens a stream of streams into a single stream.
    ///
    /// Inner streams are drained strictly in the order they are yielded,
    /// one at a time; each inner read and each outer read is raced against
    /// `token`. An inner stream that never ends blocks progression to the
    /// next one until the token is cancelled; there is no per-inner-stream
    /// timeout.
    fn bridge(self, token: CancellationToken) -> Bridge<Self>
    where
        Self: Sized,
        Self::Item: Stream,
    {
        Bridge::new(self, token)
    }

    /// Yields at most `count` items from this stream, racing against
    /// `token`.
    ///
    /// Ends after exactly `count` items, or earlier if the source ends or
    /// the token is cancelled first. Unlike [`StreamExt::take`] this never
    /// leaves the stage blocked on a source read past cancellation.
    fn take_with_token(self, count: usize, token: CancellationToken) -> Take<Self>
    where
        Self: Sized,
    {
        Take::new(self, count, token)
    }

    /// Applies `op` to every item, racing every source read against
    /// `token`.
    ///
    /// The cancellation-aware equivalent of [`StreamExt::map`]: a one-stage
    /// building block for arithmetic and reshaping steps in a pipeline.
    fn transform<F, U>(self, op: F, token: CancellationToken) -> Transform<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> U,
    {
        Transform::new(self, op, token)
    }

    /// Converts every item to `T` via [`TryInto`], racing every source read
    /// against `token`.
    ///
    /// A failed conversion yields `Err(`[`ProjectionError`]`)` for that item
    /// only; the stream continues with the next item. This is the typed
    /// replacement for draining a dynamically-typed stream through unchecked
    /// casts.
    fn project<T>(self, token: CancellationToken) -> Project<Self, T>
    where
        Self: Sized,
        Self::Item: TryInto<T>,
    {
        Project::new(self, token)
    }

    /// Applies a fallible `op` to every item, racing every source read
    /// against `token`.
    ///
    /// A failed operation yields `Err(...)` for that item only; the stream
    /// continues with the next item. Errors travel downstream paired with
    /// the values, so the consumer decides whether to skip them, count
    /// them, or cancel the pipeline, rather than a mid-pipeline stage
    /// making that call without the full picture.
    fn try_transform<F, U, E>(self, op: F, token: CancellationToken) -> TryTransform<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> Result<U, E>,
    {
        TryTransform::new(self, op, token)
    }

    /// Splits this stream into two streams that each yield every value.
    ///
    /// A relay task reads the source (via [`StreamComposeExt::or_done`])
    /// and delivers each value to both sides exactly once, in source order.
    /// The relay does not read the next value until both sides have
    /// accepted the current one. Each side's one-value channel buffer plus
    /// the value held at the relay let one side consume up to two values
    /// ahead of the other; past that the relay throttles it until the
    /// slower side catches up.
    ///
    /// Dropping one side stops delivery to it without affecting the other;
    /// dropping both sides tears the relay down even if `token` never
    /// fires.
    fn tee(self, token: CancellationToken) -> (TeeStream<Self::Item>, TeeStream<Self::Item>)
    where
        Self: Sized + Send + 'static,
        Self::Item: Clone + Send + 'static,
    {
        tee::split(self, token)
    }

    /// Distributes this stream over `branches` streams that compete for its
    /// values.
    ///
    /// A pump task reads the source (via [`StreamComposeExt::or_done`]) into
    /// a one-value shared channel; each returned branch steals whichever
    /// value it gets to first. Every value is delivered to exactly one
    /// branch, with no ordering or fairness guarantee across branches. Feed
    /// the branches through per-worker stages and merge them back with
    /// [`fan_in`].
    ///
    /// Dropping every branch tears the pump down even if `token` never
    /// fires.
    fn fan_out(self, branches: usize, token: CancellationToken) -> Vec<FanOutBranch<Self::Item>>
    where
        Self: Sized + Send + 'static,
        Self::Item: Send + 'static,
    {
        fan_out::distribute(self, branches, token)
    }
}

impl<St> StreamComposeExt for St where St: Stream {}

#[cfg(test)]
mod tests {
    use futures_util::{stream, StreamExt};
    use tokio_util::sync::CancellationToken;

    use crate::stream::{fan_in, StreamComposeExt};
    use crate::{generate, signal};

    #[tokio::test]
    async fn test_cancelling_the_shared_token_unwinds_a_composed_pipeline() {
        let token = CancellationToken::new();

        let (left, right) = generate::repeat(vec![1u32, 2, 3], token.clone()).tee(token.clone());
        let mut merged = fan_in([left, right], token.clone());

        assert!(merged.next().await.is_some());

        token.cancel();
        // Every stage observes the token; the merged stream reaches
        // end-of-stream after at most the handful of values still buffered
        // in the relays.
        while merged.next().await.is_some() {}
    }

    #[tokio::test]
    async fn test_cancelling_one_leaf_signal_unwinds_the_composed_pipeline() {
        let leaf = CancellationToken::new();
        let token = signal::any_cancelled([leaf.clone(), signal::never()]);

        let mut pipeline = generate::repeat_with(|| 5u64, token.clone())
            .transform(|v| v * 2, token.clone())
            .tee(token.clone())
            .0;

        assert_eq!(pipeline.next().await, Some(10));

        leaf.cancel();
        while pipeline.next().await.is_some() {}
    }

    #[tokio::test]
    async fn test_take_bounds_a_bridged_fan_out_pipeline() {
        let token = CancellationToken::new();

        let batches = stream::iter((0..4u32).map(|i| stream::iter(vec![i * 2, i * 2 + 1])));
        let workers: Vec<_> = batches
            .bridge(token.clone())
            .fan_out(2, token.clone())
            .into_iter()
            .map(|branch| branch.transform(|v| v + 100, token.clone()))
            .collect();

        let mut values: Vec<u32> = fan_in(workers, token.clone())
            .take_with_token(8, token)
            .collect()
            .await;
        values.sort_unstable();

        assert_eq!(values, &[100, 101, 102, 103, 104, 105, 106, 107]);
    }
}
