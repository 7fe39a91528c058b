//! Configuration sections.

mod build;
mod serve;

pub use build::BuildConfig;
pub use serve::{ServeConfig, WatcherKind};
