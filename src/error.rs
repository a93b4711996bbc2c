use thiserror::Error;

use crate::record::ItemType;

/// Reasons label text fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("empty label")]
    Empty,

    #[error("label \"{0}\" is not source-absolute (it must start with \"//\")")]
    NotAbsolute(String),

    #[error("label \"{0}\" has an empty name")]
    EmptyName(String),

    #[error("label \"{0}\" has a malformed toolchain")]
    InvalidToolchain(String),

    #[error("unexpected character {ch:?} in label \"{text}\"")]
    UnexpectedCharacter { text: String, ch: char },
}

/// Errors a driver can recover from while populating the record graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("duplicate definition of {label}")]
    DuplicateDefinition { label: String },

    #[error("{label} was referenced as a {expected} but defined as a {found}")]
    ItemTypeMismatch {
        label: String,
        expected: ItemType,
        found: ItemType,
    },
}
