//! Error types
use crate::props::PropertyId;
use std::io;
use thiserror::Error;

/// Errors raised while resolving properties or building the message tree
///
/// A property which is simply absent is never an error: accessors report it
/// as `Ok(None)`
#[derive(Error, Debug)]
pub enum MsgError {
    /// The container provider failed to open, enumerate or read an element
    #[error("Failed to read container element \"{element}\": {source}")]
    ContainerRead {
        /// The path of the element being accessed
        element: String,
        /// The provider error
        #[source]
        source: io::Error,
    },

    /// The property type code is not one that can be decoded
    #[error("Unsupported type {ptype:04X} for property {id}")]
    UnsupportedPropertyType {
        /// The property id
        id: PropertyId,
        /// The raw type code
        ptype: u16,
    },

    /// A typed accessor was used on a value of a different kind
    #[error("Property {id} holds a {found} value, not a {expected} value")]
    PropertyTypeMismatch {
        /// The property id
        id: PropertyId,
        /// The requested kind
        expected: &'static str,
        /// The kind of the stored value
        found: &'static str,
    },

    /// The inline property table is shorter than its header or truncated
    #[error("Malformed property table \"{element}\": {reason}")]
    MalformedPropertyTable {
        /// The path of the property table stream
        element: String,
        /// What is wrong with it
        reason: String,
    },

    /// Round-trip serialization failed
    #[error("Failed to save message: {0}")]
    SaveFailed(#[source] io::Error),

    /// A recipient or attachment could not be built
    #[error("Failed to load \"{element}\": {source}")]
    SubEntity {
        /// The path of the sub-container
        element: String,
        /// The underlying failure
        #[source]
        source: Box<MsgError>,
    },
}

impl MsgError {
    pub(crate) fn read(element: impl Into<String>, source: io::Error) -> Self {
        Self::ContainerRead {
            element: element.into(),
            source,
        }
    }

    pub(crate) fn malformed(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPropertyTable {
            element: element.into(),
            reason: reason.into(),
        }
    }
}

impl From<MsgError> for io::Error {
    fn from(err: MsgError) -> Self {
        match err {
            MsgError::ContainerRead { source, .. } | MsgError::SaveFailed(source) => source,
            e => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}
