//! Error and warning types shared by every compile phase.
//!
//! All fatal errors carry a [`Location`] naming the dataset file, the
//! section, the key and the line they came from. Warnings are the
//! non-fatal counterpart: the record was repaired (or an external lookup
//! failed) and compilation continues.

use std::fmt;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Where in a dataset file something happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub section: Option<String>,
    pub field: Option<String>,
    pub line: Option<usize>,
}

impl Location {
    /// A location that only knows its file.
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        if let Some(section) = &self.section {
            write!(f, ", section [{section}]")?;
        }
        if let Some(field) = &self.field {
            write!(f, ", key {field}")?;
        }
        if let Some(line) = self.line {
            write!(f, ", line {line}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

/// A fatal compile error. Any of these aborts the current dataset.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A token or line does not match the expected grammar.
    #[error("{message} ({location})")]
    Grammar { message: String, location: Location },

    /// A value parsed but lies outside its declared bound.
    #[error("{message} ({location})")]
    Range { message: String, location: Location },

    /// A name does not resolve in its namespace.
    #[error("'{value}' is not a defined {namespace} ({location})")]
    Reference {
        namespace: String,
        value: String,
        location: Location,
    },

    /// Two records of one dataset share an identifier.
    #[error("identifier '{id}' is defined twice ({location})")]
    Duplicate { id: String, location: Location },

    /// A cross-field or cross-record rule is violated.
    #[error("{message} ({location})")]
    Consistency { message: String, location: Location },

    /// A dataset schema is malformed (bad grammar string, repeated key).
    #[error("schema error in {dataset}: {message}")]
    Schema { dataset: String, message: String },

    /// A dataset was compiled before one it resolves names against.
    #[error("{dataset} requires {dependency} to be compiled first")]
    MissingDependency { dataset: String, dependency: String },

    /// A compiled store could not be encoded or decoded.
    #[error(transparent)]
    Persist(#[from] crate::persist::PersistError),
}

impl CompileError {
    pub fn grammar(location: &Location, message: impl Into<String>) -> Self {
        Self::Grammar {
            message: message.into(),
            location: location.clone(),
        }
    }

    pub fn range(location: &Location, message: impl Into<String>) -> Self {
        Self::Range {
            message: message.into(),
            location: location.clone(),
        }
    }

    pub fn reference(
        location: &Location,
        namespace: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Reference {
            namespace: namespace.into(),
            value: value.into(),
            location: location.clone(),
        }
    }

    pub fn duplicate(location: &Location, id: impl fmt::Display) -> Self {
        Self::Duplicate {
            id: id.to_string(),
            location: location.clone(),
        }
    }

    pub fn consistency(location: &Location, message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
            location: location.clone(),
        }
    }

    pub fn schema(dataset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            dataset: dataset.into(),
            message: message.into(),
        }
    }

    /// The location this error points at, if it has one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Grammar { location, .. }
            | Self::Range { location, .. }
            | Self::Reference { location, .. }
            | Self::Duplicate { location, .. }
            | Self::Consistency { location, .. } => Some(location),
            Self::Schema { .. } | Self::MissingDependency { .. } | Self::Persist(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Why a warning was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A documented auto-fix rule repaired the record.
    Corrected,
    /// An external lookup (map list, asset index) did not find its target.
    MissingAsset,
}

/// A non-fatal diagnostic collected while compiling a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    pub location: Location,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {} ({})", self.message, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_includes_every_part() {
        let loc = Location::file("PBS/types.txt")
            .with_section("FIRE")
            .with_field("Weaknesses")
            .at_line(12);
        let msg = loc.to_string();
        assert!(msg.contains("PBS/types.txt"));
        assert!(msg.contains("[FIRE]"));
        assert!(msg.contains("Weaknesses"));
        assert!(msg.contains("line 12"));
    }

    #[test]
    fn location_display_file_only() {
        assert_eq!(Location::file("moves.txt").to_string(), "moves.txt");
    }

    #[test]
    fn reference_error_names_value_and_namespace() {
        let loc = Location::file("types.txt").with_section("FIRE");
        let e = CompileError::reference(&loc, "Type", "LAVA");
        let msg = e.to_string();
        assert!(msg.contains("LAVA"), "got: {msg}");
        assert!(msg.contains("Type"), "got: {msg}");
        assert!(msg.contains("[FIRE]"), "got: {msg}");
    }

    #[test]
    fn duplicate_error_names_identifier() {
        let loc = Location::file("abilities.txt").at_line(40);
        let e = CompileError::duplicate(&loc, "STENCH");
        assert!(e.to_string().contains("STENCH"));
        assert_eq!(e.location().and_then(|l| l.line), Some(40));
    }

    #[test]
    fn infrastructure_errors_have_no_location() {
        let e = CompileError::schema("Move", "unknown grammar character 'z'");
        assert!(e.location().is_none());
        assert!(e.to_string().contains("'z'"));
    }

    #[test]
    fn warning_display() {
        let w = Warning {
            kind: WarningKind::Corrected,
            message: "changed to a Status move".into(),
            location: Location::file("moves.txt").with_section("SPLASH"),
        };
        let msg = w.to_string();
        assert!(msg.starts_with("warning:"));
        assert!(msg.contains("SPLASH"));
    }
}
