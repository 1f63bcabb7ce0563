//! # Read Configuration
//!
//! Controls how strictly framed buffers are checked when they are parsed.

use crate::FILE_IDENTIFIER;
use std::fmt;

/// Policy for a length prefix that declares fewer bytes than the buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LengthCheck {
    /// Any mismatch is a framing error
    #[default]
    Strict,
    /// Trailing bytes after the declared message are ignored with a warning.
    /// A prefix that declares more bytes than are present is still fatal.
    Advisory,
}

/// Parser configuration for framed messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadConfig {
    /// How to treat a length prefix shorter than the buffer
    pub length_check: LengthCheck,
    /// Largest accepted value of the length prefix, in bytes
    pub max_message_size: u32,
}

impl ReadConfig {
    /// Strict length checking, no size limit beyond the u32 prefix range
    pub const DEFAULT: Self = Self {
        length_check: LengthCheck::Strict,
        max_message_size: u32::MAX - 4,
    };

    /// Create a new configuration with validation
    pub const fn new(length_check: LengthCheck, max_message_size: u32) -> Result<Self, ConfigError> {
        // The prefix always covers the file identifier
        if (max_message_size as usize) < FILE_IDENTIFIER.len() {
            return Err(ConfigError::MaxMessageSizeTooSmall);
        }
        if max_message_size > u32::MAX - 4 {
            return Err(ConfigError::MaxMessageSizeTooLarge);
        }

        Ok(Self {
            length_check,
            max_message_size,
        })
    }

    /// Same limits, trailing bytes tolerated
    pub const fn advisory() -> Self {
        Self {
            length_check: LengthCheck::Advisory,
            ..Self::DEFAULT
        }
    }

    /// Largest total buffer size (prefix included) accepted by this configuration
    #[inline]
    pub const fn max_buffer_size(&self) -> usize {
        self.max_message_size as usize + 4
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::new(self.length_check, self.max_message_size).map(|_| ())
    }
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ReadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReadConfig {{ length_check: {:?}, max_message_size: {} bytes }}",
            self.length_check, self.max_message_size,
        )
    }
}

/// Configuration error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The limit must leave room for the file identifier
    MaxMessageSizeTooSmall,
    /// The limit must fit a u32 prefix together with the prefix itself
    MaxMessageSizeTooLarge,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MaxMessageSizeTooSmall => {
                write!(f, "max_message_size must be at least 4 bytes")
            }
            ConfigError::MaxMessageSizeTooLarge => {
                write!(f, "max_message_size must not exceed u32::MAX - 4")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
