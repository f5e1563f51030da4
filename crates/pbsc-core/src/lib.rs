//! pbsc core -- the engine of the PBS data-definition compiler.
//!
//! This crate turns line-oriented, human-editable dataset files (named
//! sections of `key = value` entries) into validated, cross-referenced
//! record stores. It knows nothing about any particular dataset: each
//! dataset kind supplies a [`schema::Schema`] and validation hooks through
//! the [`compiler::Dataset`] trait.
//!
//! # Two-Phase Pipeline
//!
//! [`compiler::compile`] runs one dataset through:
//!
//! 1. **Read** -- [`reader::SectionReader`] yields sections in file order.
//! 2. **Decode** -- [`codec`] decodes each present key against its
//!    [`schema::TypeSpec`]; enum names resolve through a
//!    [`symbols::SymbolTable`].
//! 3. **Local validate** -- the dataset's per-record hook, then a duplicate
//!    check and insert into the [`store::DataStore`].
//! 4. **Finalize** -- forward references into the dataset's own namespace
//!    are checked, then the dataset's whole-store hook derives relations
//!    ([`resolve`]) and collects [`messages`].
//! 5. **Freeze** -- the store becomes a read-only [`store::FrozenStore`]
//!    ready for a [`persist::PersistenceSink`].
//!
//! # Type Grammar
//!
//! ```rust,ignore
//! let schema = Schema::builder("Move")
//!     .field(SECTION_NAME, "id", "m")
//!     .enum_field("Type", "type", "e", &["Type"])
//!     .field("Power", "power", "u")
//!     .field("Accuracy", "accuracy", "u")
//!     .bounded(0, 100)
//!     .build()?;
//! ```
//!
//! # Key Types
//!
//! - [`value::Value`] -- Decoded field value.
//! - [`record::Record`] -- Identifier plus decoded fields.
//! - [`store::DataStore`] / [`store::FrozenStore`] -- Per-dataset record set
//!   before and after phase 2.
//! - [`error::CompileError`] -- Fatal error taxonomy with file/section/key/line
//!   locations; [`error::Warning`] for non-fatal diagnostics.

pub mod codec;
pub mod compiler;
pub mod error;
pub mod id;
pub mod messages;
pub mod persist;
pub mod reader;
pub mod record;
pub mod resolve;
pub mod schema;
pub mod store;
pub mod symbols;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
