//! The PBS dataset kinds, their catalog of built-in symbol tables, and a
//! [`Session`] that compiles them in dependency order.

pub mod catalog;
pub mod config;
pub mod datasets;
pub mod loader;
pub mod session;

pub use catalog::Catalog;
pub use config::CompilerConfig;
pub use loader::{DataLoadError, DirSource, MemorySource, SourceProvider};
pub use session::{DatasetKind, Session, Staged};
