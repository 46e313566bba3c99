//! Concrete engine invocation strategies, in fallback priority order.

mod cli;
mod library;
mod serve;

pub use cli::{CliDirectStrategy, CliPackageRunnerStrategy};
pub use library::{EngineLibrary, LibraryCallStrategy, NodeRendererLibrary};
pub use serve::SpawnServeStrategy;
