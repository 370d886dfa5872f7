//! Error types for MusicXML parsing and serialization.

use thiserror::Error;

/// Errors that can occur while reading or writing MusicXML.
#[derive(Debug, Error)]
pub enum MusicXmlError {
    /// A required attribute or element was missing.
    #[error("missing required {kind}: {name} at {location}")]
    MissingRequired {
        /// What kind of thing is missing (e.g., "attribute", "element").
        kind: String,
        /// Name of the missing item.
        name: String,
        /// Location in the document.
        location: String,
    },

    /// An invalid value was encountered.
    #[error("invalid {kind} value: {value} at {location}")]
    InvalidValue {
        /// What kind of value is invalid (e.g., "duration", "pitch", "octave").
        kind: String,
        /// The invalid value (as string).
        value: String,
        /// Location in the document.
        location: String,
    },

    /// The document structure is invalid or unexpected.
    #[error("invalid structure: {message} at {location}")]
    InvalidStructure {
        /// Description of the structural problem.
        message: String,
        /// Location in the document.
        location: String,
    },

    /// The compressed container is malformed.
    #[error("invalid container: {0}")]
    InvalidContainer(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An XML parsing or writing error occurred.
    #[error("XML error: {0}")]
    Xml(String),
}

impl MusicXmlError {
    /// Create a missing required element/attribute error.
    pub fn missing_required(
        kind: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::MissingRequired {
            kind: kind.into(),
            name: name.into(),
            location: location.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(
        kind: impl Into<String>,
        value: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            kind: kind.into(),
            value: value.into(),
            location: location.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
            location: location.into(),
        }
    }

    /// Create an invalid container error.
    pub fn invalid_container(message: impl Into<String>) -> Self {
        Self::InvalidContainer(message.into())
    }

    /// Create an XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }
}

impl From<quick_xml::Error> for MusicXmlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for MusicXmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.to_string())
    }
}

/// Result type alias for MusicXML operations.
pub type MusicXmlResult<T> = Result<T, MusicXmlError>;
