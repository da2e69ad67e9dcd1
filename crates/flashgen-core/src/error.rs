//! Error types for flashgen-core
//!
//! Every failure is fatal to the operation that raised it. Variants are
//! grouped the same way they are reported: configuration mistakes in the
//! description or overrides, capacity violations of the computed layout, and
//! I/O failures while emitting artifacts.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while describing, resolving or emitting a flash layout
#[derive(Debug, Error)]
pub enum FlashError {
    // Configuration errors
    /// A property was declared twice on the same entity
    #[error("property '{property}' already declared on {owner}")]
    DuplicateProperty { owner: String, property: String },

    /// A property was read or written before being declared
    #[error("trying to access undeclared property '{property}' of {owner}")]
    UndeclaredProperty { owner: String, property: String },

    /// The content of a section sets a property its template does not declare
    #[error("section '{section}' does not have any property named '{property}'")]
    UnknownProperty { section: String, property: String },

    /// A property holds a value of the wrong type
    #[error("invalid value for property '{property}' of {owner}: expected {expected}, got {found}")]
    InvalidPropertyValue {
        owner: String,
        property: String,
        expected: &'static str,
        found: String,
    },

    /// A section descriptor lacks a mandatory field
    #[error("section #{index} does not have any {field}")]
    MissingField { index: usize, field: &'static str },

    /// Two section descriptors share the same name
    #[error("section '{0}' is declared more than once")]
    DuplicateSection(String),

    /// The content of a section was set a second time
    #[error("section '{0}' is already placed")]
    SectionAlreadyPlaced(String),

    /// A template id was registered twice
    #[error("section template '{0}' is already registered")]
    DuplicateTemplate(String),

    /// A descriptor references a template that was never registered
    #[error("unknown section template '{template}' for section '{section}'")]
    UnknownTemplate { section: String, template: String },

    /// An override or lookup names a section that does not exist
    #[error("unknown section '{0}'")]
    UnknownSection(String),

    /// An alignment is zero or not a power of two
    #[error("invalid {what} alignment 0x{value:x}: must be a non-zero power of two")]
    InvalidAlignment { what: &'static str, value: u64 },

    /// A section index range does not fit the resolved layout
    #[error("section index {index} out of range (flash has {count} sections)")]
    SectionIndexOutOfRange { index: usize, count: usize },

    /// The description file is malformed
    #[error("invalid flash description: {0}")]
    InvalidDescription(String),

    /// A property override string is malformed
    #[error("invalid property override '{entry}': {reason}")]
    InvalidOverride { entry: String, reason: String },

    // Capacity errors
    /// The natural size of a section exceeds its requested size
    #[error("section '{section}' size (0x{natural:x}) is larger than requested in layout (0x{requested:x})")]
    SectionSizeOverflow {
        section: String,
        natural: u64,
        requested: u64,
    },

    /// The requested size of a section violates the size alignment
    #[error("section '{section}' requested size 0x{requested:x} is not aligned on 0x{alignment:x}")]
    UnalignedSectionSize {
        section: String,
        requested: u64,
        alignment: u64,
    },

    /// The cumulative layout does not fit into the flash
    #[error("section '{section}' overflowed flash '{flash}', flash size is 0x{capacity:x}, current content size is 0x{end:x}")]
    FlashOverflow {
        section: String,
        flash: String,
        capacity: u64,
        end: u64,
    },

    /// The packed content of a section is larger than its resolved size
    #[error("section '{section}' image is too big (expected 0x{expected:x}, got 0x{actual:x})")]
    SectionImageTooLarge {
        section: String,
        expected: u64,
        actual: u64,
    },

    /// A value does not fit the binary field it is stored in
    #[error("section '{section}': value 0x{value:x} does not fit in field '{field}'")]
    FieldOverflow {
        section: String,
        field: &'static str,
        value: u64,
    },

    // I/O errors
    /// Reading or writing an artifact failed
    #[error("unable to access {artifact} '{}': {source}", path.display())]
    Io {
        artifact: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FlashError {
    /// Wrap an I/O error with the artifact and path it concerns
    pub fn io(artifact: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            artifact,
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using [`FlashError`]
pub type Result<T> = std::result::Result<T, FlashError>;
