//! Composable, cancellation-aware stream operators on top of Tokio.
#![deny(clippy::all)]
#![deny(missing_docs)]

pub mod generate;
pub mod signal;
pub mod stream;
