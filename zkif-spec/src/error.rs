//! # Error Types for zkInterface messages

use crate::config::ConfigError;
use crate::message::MessageType;
use flatbuffers::InvalidFlatbuffer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZkifError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    // Framing errors
    #[error("Unknown message type tag: {0}")]
    UnknownMessageType(u8),

    #[error("Unexpected message type: expected {expected}, found {found}")]
    UnexpectedMessageType {
        expected: MessageType,
        found: MessageType,
    },

    #[error("Malformed buffer at offset {offset}: {reason}")]
    MalformedBuffer { offset: usize, reason: &'static str },

    #[error("Length prefix mismatch: prefix declares {declared} bytes, {actual} bytes follow")]
    LengthPrefixMismatch { declared: usize, actual: usize },

    #[error("Invalid file identifier: expected \"zkif\", found {0:?}")]
    InvalidFileIdentifier([u8; 4]),

    #[error("Message too large: {size} bytes (maximum {max})")]
    MessageTooLarge { size: usize, max: usize },

    // Witness packing errors
    #[error("Misaligned value array: {num_bytes} bytes cannot be split across {num_ids} variables")]
    MisalignedValueArray { num_ids: usize, num_bytes: usize },

    #[error("Inconsistent element size at index {index}: expected {expected} bytes, found {found}")]
    InconsistentElementSize {
        index: usize,
        expected: usize,
        found: usize,
    },

    // Identifier errors
    #[error("Variable id {id} cannot be represented exactly as {target}")]
    IdentifierPrecisionLoss { id: u64, target: &'static str },

    // I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ZkifError {
    /// Check if this error was caused by corrupt or inconsistent input bytes
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ZkifError::UnknownMessageType(_)
                | ZkifError::MalformedBuffer { .. }
                | ZkifError::LengthPrefixMismatch { .. }
                | ZkifError::InvalidFileIdentifier(_)
                | ZkifError::MisalignedValueArray { .. }
        )
    }

    pub(crate) fn malformed(offset: usize, reason: &'static str) -> Self {
        ZkifError::MalformedBuffer { offset, reason }
    }
}

impl From<InvalidFlatbuffer> for ZkifError {
    /// Offsets are relative to the verified region
    fn from(err: InvalidFlatbuffer) -> Self {
        let (offset, reason) = match err {
            InvalidFlatbuffer::MissingRequiredField { .. } => (0, "missing required field"),
            InvalidFlatbuffer::InconsistentUnion { .. } => {
                (0, "union tag and value disagree on presence")
            }
            InvalidFlatbuffer::Utf8Error { range, .. } => (range.start, "string is not utf-8"),
            InvalidFlatbuffer::MissingNullTerminator { range, .. } => {
                (range.end, "string has no null terminator")
            }
            InvalidFlatbuffer::Unaligned { position, .. } => (position, "unaligned field"),
            InvalidFlatbuffer::RangeOutOfBounds { range, .. } => {
                (range.start, "range out of bounds")
            }
            InvalidFlatbuffer::SignedOffsetOutOfBounds { position, .. } => {
                (position, "vtable offset out of bounds")
            }
            InvalidFlatbuffer::TooManyTables => (0, "too many tables"),
            InvalidFlatbuffer::ApparentSizeTooLarge => (0, "apparent size too large"),
            InvalidFlatbuffer::DepthLimitReached => (0, "nesting too deep"),
        };
        ZkifError::malformed(offset, reason)
    }
}

pub type Result<T> = std::result::Result<T, ZkifError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ZkifError::UnknownMessageType(9);
        assert_eq!(err.to_string(), "Unknown message type tag: 9");

        let err = ZkifError::MisalignedValueArray {
            num_ids: 3,
            num_bytes: 10,
        };
        assert_eq!(
            err.to_string(),
            "Misaligned value array: 10 bytes cannot be split across 3 variables"
        );

        let err = ZkifError::InvalidFileIdentifier(*b"abcd");
        assert!(err.to_string().contains("zkif"));
    }

    #[test]
    fn test_unexpected_type_display() {
        let err = ZkifError::UnexpectedMessageType {
            expected: MessageType::Circuit,
            found: MessageType::Witness,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected message type: expected Circuit, found Witness"
        );
    }

    #[test]
    fn test_is_structural() {
        assert!(ZkifError::UnknownMessageType(0).is_structural());
        assert!(ZkifError::malformed(8, "truncated").is_structural());
        assert!(!ZkifError::InconsistentElementSize {
            index: 1,
            expected: 4,
            found: 2
        }
        .is_structural());
        assert!(!ZkifError::IdentifierPrecisionLoss {
            id: u64::MAX,
            target: "f64"
        }
        .is_structural());
    }

    #[test]
    fn test_verifier_error_is_malformed() {
        let err: ZkifError = InvalidFlatbuffer::RangeOutOfBounds {
            range: 12..40,
            error_trace: Default::default(),
        }
        .into();
        assert!(matches!(
            err,
            ZkifError::MalformedBuffer { offset: 12, reason: "range out of bounds" }
        ));
        assert!(err.is_structural());

        let err: ZkifError = InvalidFlatbuffer::DepthLimitReached.into();
        assert!(matches!(err, ZkifError::MalformedBuffer { offset: 0, .. }));
    }

    #[test]
    fn test_config_error_from() {
        let err: ZkifError = ConfigError::MaxMessageSizeTooSmall.into();
        assert!(err.to_string().starts_with("Invalid configuration"));
    }
}
