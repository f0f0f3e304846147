use std::error::Error;
use std::fmt;

use thiserror::Error;

/// The error kind for [`DwarfError`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DwarfErrorKind {
    /// The file could not be read.
    Io,

    /// The ELF container is malformed.
    InvalidObject,

    /// A compilation unit referenced by offset does not exist.
    InvalidUnitRef(u64),

    /// A debug information entry referenced by offset does not exist.
    InvalidDieRef(u64),

    /// The DWARF data is corrupted. See the cause for more information.
    CorruptedData,
}

impl fmt::Display for DwarfErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "could not read the file"),
            Self::InvalidObject => write!(f, "malformed ELF object"),
            Self::InvalidUnitRef(offset) => {
                write!(f, "compilation unit for offset {offset:#x} does not exist")
            }
            Self::InvalidDieRef(offset) => {
                write!(f, "debug info entry for offset {offset:#x} does not exist")
            }
            Self::CorruptedData => write!(f, "corrupted dwarf debug data"),
        }
    }
}

/// An error reading DWARF or ELF data.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct DwarfError {
    kind: DwarfErrorKind,
    #[source]
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl DwarfError {
    pub(crate) fn new<E>(kind: DwarfErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        DwarfError {
            kind,
            source: Some(source.into()),
        }
    }

    /// Returns the corresponding [`DwarfErrorKind`] for this error.
    pub fn kind(&self) -> DwarfErrorKind {
        self.kind
    }
}

impl From<DwarfErrorKind> for DwarfError {
    fn from(kind: DwarfErrorKind) -> Self {
        DwarfError { kind, source: None }
    }
}

impl From<gimli::Error> for DwarfError {
    fn from(e: gimli::Error) -> Self {
        DwarfError::new(DwarfErrorKind::CorruptedData, e)
    }
}

impl From<goblin::error::Error> for DwarfError {
    fn from(e: goblin::error::Error) -> Self {
        DwarfError::new(DwarfErrorKind::InvalidObject, e)
    }
}

impl From<std::io::Error> for DwarfError {
    fn from(e: std::io::Error) -> Self {
        DwarfError::new(DwarfErrorKind::Io, e)
    }
}

impl From<DwarfError> for dwquery_lang::EvalError {
    fn from(e: DwarfError) -> Self {
        dwquery_lang::EvalError::Runtime(e.to_string())
    }
}

/// Shorthand for converting gimli errors at accessor seams, where any
/// library failure is fatal to the query.
pub(crate) fn fatal(e: impl Into<DwarfError>) -> dwquery_lang::EvalError {
    e.into().into()
}
