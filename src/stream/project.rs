use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::stream::or_done::OrDone;
#[cfg(doc)]
use crate::stream::StreamComposeExt;

/// Error yielded by [`Project`] when an item cannot be converted to the
/// target type.
///
/// The error replaces the single offending item; the stream continues with
/// the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stream value could not be converted to `{target}`")]
pub struct ProjectionError {
    target: &'static str,
}

impl ProjectionError {
    fn new<T>() -> Self {
        Self {
            target: type_name::<T>(),
        }
    }

    /// Name of the type the conversion was targeting.
    pub fn target(&self) -> &'static str {
        self.target
    }
}

/// Stream for the [`StreamComposeExt::project`] method.
///
/// Converts every item to `T` via [`TryInto`], yielding
/// `Result<T, ProjectionError>` so a mismatched item fails only its own
/// delivery.
#[must_use = "streams do nothing unless polled"]
#[pin_project::pin_project]
pub struct Project<St, T> {
    #[pin]
    stream: OrDone<St>,
    phantom: PhantomData<T>,
}

impl<St, T> Project<St, T> {
    pub(crate) fn new(stream: St, token: CancellationToken) -> Self {
        Self {
            stream: OrDone::new(stream, token),
            phantom: PhantomData,
        }
    }
}

impl<St, T> Stream for Project<St, T>
where
    St: Stream,
    St::Item: TryInto<T>,
{
    type Item = Result<T, ProjectionError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        this.stream.poll_next(cx).map(|opt| {
            opt.map(|item| item.try_into().map_err(|_| ProjectionError::new::<T>()))
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

impl<St, T> fmt::Debug for Project<St, T>
where
    St: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}
