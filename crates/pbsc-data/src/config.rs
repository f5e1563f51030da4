//! Compiler configuration: unknown-key policy, file names and the catalog
//! of built-in symbol tables.
//!
//! Every field is optional; a missing field takes its default, so an empty
//! file is a valid configuration.

use crate::catalog::Catalog;
use crate::loader::{DataLoadError, deserialize_file, find_data_file};
use crate::session::DatasetKind;
use pbsc_core::compiler::{CompileOptions, UnknownKeyPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Base name of the configuration file looked up by [`CompilerConfig::find`].
pub const CONFIG_BASE_NAME: &str = "pbsc";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub unknown_keys: UnknownKeyPolicy,
    /// Source path per dataset kind name (`Species` → `pokemon.txt`), for
    /// kinds that do not use their default file.
    pub files: BTreeMap<String, String>,
    pub catalog: Catalog,
}

impl CompilerConfig {
    /// Load a RON, TOML or JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, DataLoadError> {
        let config: CompilerConfig = deserialize_file(path)?;
        tracing::debug!(path = %path.display(), "loaded compiler configuration");
        Ok(config)
    }

    /// Load `pbsc.{ron,toml,json}` from `dir`, or the defaults if there is
    /// none.
    pub fn find(dir: &Path) -> Result<Self, DataLoadError> {
        match find_data_file(dir, CONFIG_BASE_NAME)? {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn file_for(&self, kind: DatasetKind) -> &str {
        self.files
            .get(kind.name())
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_file())
    }

    pub fn options(&self) -> CompileOptions {
        CompileOptions {
            unknown_keys: self.unknown_keys,
        }
    }
}
