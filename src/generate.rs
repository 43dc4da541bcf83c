//! Source stages that generate values until cancelled.
//!
//! Generators are the entry points of a pipeline: they own no upstream and
//! produce values forever, so the cancellation token is the only thing that
//! ends them. Bound them with
//! [`take_with_token`](crate::stream::StreamComposeExt::take_with_token) or
//! by cancelling the token.
use tokio_util::sync::CancellationToken;

mod repeat;
mod repeat_with;

pub use repeat::Repeat;
pub use repeat_with::RepeatWith;

/// Replays `values` cyclically forever, until `token` is cancelled.
///
/// An empty `values` ends the stream immediately.
pub fn repeat<T>(values: Vec<T>, token: CancellationToken) -> Repeat<T>
where
    T: Clone,
{
    Repeat::new(values, token)
}

/// Yields `op()` results forever, until `token` is cancelled.
pub fn repeat_with<F, T>(op: F, token: CancellationToken) -> RepeatWith<F>
where
    F: FnMut() -> T,
{
    RepeatWith::new(op, token)
}
