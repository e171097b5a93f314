// Library module for modclean
// Re-exports the cleaner for the CLI, integration tests and external crates

pub mod cleaner;

pub use cleaner::{CleanError, CleanEvent, CleanResults, ModClean, Options};
