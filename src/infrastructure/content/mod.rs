//! Content loading infrastructure

pub mod loader;

pub use loader::{tokenize, ContentLoader, LoadedContent};
