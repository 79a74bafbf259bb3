//! Error types for document operations.

use crate::store::EntityId;

/// The codec could not turn a value into a string.
#[derive(Debug)]
pub struct EncodeError(pub String);

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "encode failed: {}", self.0)
    }
}

impl std::error::Error for EncodeError {}

/// A stored value could not be turned back into the caller's type.
#[derive(Debug)]
pub enum DecodeError {
    /// A matched chunk property holds something other than a string.
    NotAString { property: String },
    /// A chunk property disappeared between listing and reading.
    Missing { property: String },
    /// The codec rejected the joined string.
    Invalid(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::NotAString { property } => {
                write!(f, "chunk property '{}' is not a string", property)
            }
            DecodeError::Missing { property } => {
                write!(f, "chunk property '{}' vanished during read", property)
            }
            DecodeError::Invalid(msg) => write!(f, "decode failed: {}", msg),
        }
    }
}

impl std::error::Error for DecodeError {}

/// The property store refused a write.
#[derive(Debug)]
pub enum StoreError {
    /// The value is longer than the store's per-property limit.
    TooLarge {
        property: String,
        len: usize,
        max: usize,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::TooLarge { property, len, max } => write!(
                f,
                "property '{}' is {} units, store limit is {}",
                property, len, max
            ),
        }
    }
}

impl std::error::Error for StoreError {}

/// Error type for document and registry operations.
#[derive(Debug)]
pub enum DocumentError {
    Encode(EncodeError),
    Decode(DecodeError),
    Store(StoreError),
    /// Chunking is disabled and the encoded value does not fit one property.
    Size { key: String, len: usize, max: usize },
    /// The host has no property store for this entity.
    UnknownEntity(EntityId),
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentError::Encode(e) => write!(f, "{}", e),
            DocumentError::Decode(e) => write!(f, "{}", e),
            DocumentError::Store(e) => write!(f, "{}", e),
            DocumentError::Size { key, len, max } => write!(
                f,
                "value for '{}' is {} units, exceeds property limit of {}",
                key, len, max
            ),
            DocumentError::UnknownEntity(id) => write!(f, "unknown entity {}", id),
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocumentError::Encode(e) => Some(e),
            DocumentError::Decode(e) => Some(e),
            DocumentError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EncodeError> for DocumentError {
    fn from(e: EncodeError) -> Self {
        DocumentError::Encode(e)
    }
}

impl From<DecodeError> for DocumentError {
    fn from(e: DecodeError) -> Self {
        DocumentError::Decode(e)
    }
}

impl From<StoreError> for DocumentError {
    fn from(e: StoreError) -> Self {
        DocumentError::Store(e)
    }
}

pub type Result<T> = std::result::Result<T, DocumentError>;
