//! # Message Framing
//!
//! Every message is one payload table wrapped in a Root envelope and framed
//! with a length prefix and the file identifier:
//!
//! ```text
//! Offset  Size  Field
//! ──────────────────────────────────
//! 0x00    4     length (u32 LE, bytes from 0x04 to the end)
//! 0x04    4     file identifier "zkif"
//! 0x08    ...   envelope region: FlatBuffers Root { message_type, message }
//! ```
//!
//! The envelope region is a plain FlatBuffers buffer (root offset first) whose
//! root table holds the `message` union and its `message_type` tag.
//!
//! Framed buffers are self-delimiting: concatenated messages can be split by
//! reading successive length prefixes only (see [`frames`]).

use crate::circuit::{Circuit, CircuitOwned};
use crate::config::{LengthCheck, ReadConfig};
use crate::constraints::{ConstraintSystemOwned, R1csConstraints};
use crate::error::{Result, ZkifError};
use crate::id::VariableId;
use crate::schema::{end_table, verify_root, CircuitTable, RootTable, WitnessTable};
use crate::variables::VariablesOwned;
use crate::witness::{Witness, WitnessOwned};
use crate::{FILE_IDENTIFIER, HEADER_SIZE, SIZE_PREFIX_SIZE};
use flatbuffers::{FlatBufferBuilder, Follow, WIPOffset, FLATBUFFERS_MAX_BUFFER_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag identifying the payload of a Root envelope
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Circuit = 1,
    R1csConstraints = 2,
    Witness = 3,
}

impl MessageType {
    pub const ALL: [MessageType; 3] = [
        MessageType::Circuit,
        MessageType::R1csConstraints,
        MessageType::Witness,
    ];

    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(MessageType::Circuit),
            2 => Some(MessageType::R1csConstraints),
            3 => Some(MessageType::Witness),
            _ => None,
        }
    }

    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            MessageType::Circuit => "Circuit",
            MessageType::R1csConstraints => "R1CSConstraints",
            MessageType::Witness => "Witness",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ZkifError;

    fn try_from(tag: u8) -> Result<Self> {
        Self::from_u8(tag).ok_or(ZkifError::UnknownMessageType(tag))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed message: exactly one payload, matching its tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message<'a> {
    Circuit(Circuit<'a>),
    R1csConstraints(R1csConstraints<'a>),
    Witness(Witness<'a>),
}

impl<'a> Message<'a> {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Circuit(_) => MessageType::Circuit,
            Message::R1csConstraints(_) => MessageType::R1csConstraints,
            Message::Witness(_) => MessageType::Witness,
        }
    }

    fn unexpected(&self, expected: MessageType) -> ZkifError {
        ZkifError::UnexpectedMessageType {
            expected,
            found: self.message_type(),
        }
    }

    pub fn into_circuit(self) -> Result<Circuit<'a>> {
        match self {
            Message::Circuit(circuit) => Ok(circuit),
            other => Err(other.unexpected(MessageType::Circuit)),
        }
    }

    pub fn into_r1cs(self) -> Result<R1csConstraints<'a>> {
        match self {
            Message::R1csConstraints(r1cs) => Ok(r1cs),
            other => Err(other.unexpected(MessageType::R1csConstraints)),
        }
    }

    pub fn into_witness(self) -> Result<Witness<'a>> {
        match self {
            Message::Witness(witness) => Ok(witness),
            other => Err(other.unexpected(MessageType::Witness)),
        }
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Check that a message of roughly `size_hint` bytes fits a FlatBuffers
/// buffer, returning the capacity to reserve
pub(crate) fn ensure_encodable(size_hint: usize) -> Result<usize> {
    let max = FLATBUFFERS_MAX_BUFFER_SIZE - HEADER_SIZE;
    if size_hint > max {
        return Err(ZkifError::MessageTooLarge {
            size: size_hint,
            max,
        });
    }
    Ok(size_hint)
}

/// Wrap `payload` in a Root envelope and frame the finished region
pub fn finish_message<T>(
    mut builder: FlatBufferBuilder<'_>,
    message_type: MessageType,
    payload: WIPOffset<T>,
) -> Result<Vec<u8>> {
    let start = builder.start_table();
    builder.push_slot_always(RootTable::VT_MESSAGE, payload.as_union_value());
    builder.push_slot::<u8>(RootTable::VT_MESSAGE_TYPE, message_type.to_u8(), 0);
    let root: WIPOffset<RootTable> = end_table(&mut builder, start);
    builder.finish_minimal(root);
    let region = builder.finished_data();

    let size = FILE_IDENTIFIER.len() + region.len();
    let declared = u32::try_from(size).map_err(|_| ZkifError::MessageTooLarge {
        size,
        max: u32::MAX as usize,
    })?;
    let mut bytes = Vec::with_capacity(SIZE_PREFIX_SIZE + size);
    bytes.extend_from_slice(&declared.to_le_bytes());
    bytes.extend_from_slice(&FILE_IDENTIFIER);
    bytes.extend_from_slice(region);

    tracing::debug!(%message_type, size, "framed message");
    Ok(bytes)
}

/// Frame a Circuit message declaring ids `0..free_variable_id`
pub fn write_circuit(free_variable_id: VariableId) -> Result<Vec<u8>> {
    CircuitOwned::new(free_variable_id).to_bytes()
}

/// Frame a Witness message from packed assignments
pub fn write_witness(assignments: &VariablesOwned) -> Result<Vec<u8>> {
    WitnessOwned {
        assigned_variables: assignments.clone(),
    }
    .to_bytes()
}

/// Frame an R1CSConstraints message carrying a constraint system
pub fn write_r1cs(constraints: &ConstraintSystemOwned) -> Result<Vec<u8>> {
    constraints.to_bytes()
}

// ============================================================================
// Reading
// ============================================================================

/// Total size of the first framed message in `buf`, prefix included
pub fn read_size_prefix(buf: &[u8]) -> Option<usize> {
    let prefix = buf.get(..SIZE_PREFIX_SIZE)?;
    let declared = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
    Some(SIZE_PREFIX_SIZE + declared as usize)
}

/// Parse one framed message with the default (strict) configuration
pub fn read_message(bytes: &[u8]) -> Result<Message<'_>> {
    read_message_with(bytes, &ReadConfig::DEFAULT)
}

/// Parse one framed message
pub fn read_message_with<'a>(bytes: &'a [u8], config: &ReadConfig) -> Result<Message<'a>> {
    config.validate()?;

    if bytes.len() < HEADER_SIZE {
        return Err(ZkifError::malformed(
            bytes.len(),
            "buffer shorter than message header",
        ));
    }

    let declared = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let actual = bytes.len() - SIZE_PREFIX_SIZE;

    if declared > config.max_message_size as usize {
        return Err(ZkifError::MessageTooLarge {
            size: declared,
            max: config.max_message_size as usize,
        });
    }
    if declared > actual {
        return Err(ZkifError::LengthPrefixMismatch { declared, actual });
    }
    if declared < actual {
        match config.length_check {
            LengthCheck::Strict => {
                return Err(ZkifError::LengthPrefixMismatch { declared, actual });
            }
            LengthCheck::Advisory => {
                tracing::warn!(declared, actual, "ignoring bytes after the declared message length");
            }
        }
    }
    if declared < FILE_IDENTIFIER.len() {
        return Err(ZkifError::malformed(0, "length prefix shorter than file identifier"));
    }

    let identifier = [bytes[4], bytes[5], bytes[6], bytes[7]];
    if identifier != FILE_IDENTIFIER {
        return Err(ZkifError::InvalidFileIdentifier(identifier));
    }

    let message = parse_envelope(&bytes[HEADER_SIZE..SIZE_PREFIX_SIZE + declared])?;
    tracing::debug!(message_type = %message.message_type(), size = declared, "parsed message");
    Ok(message)
}

/// Parse a Root envelope region (the bytes after the identifier)
pub fn parse_envelope(region: &[u8]) -> Result<Message<'_>> {
    let root = verify_root::<RootTable>(region)?;
    let message_type = MessageType::try_from(root.message_type())?;
    let payload = root.message().ok_or(ZkifError::malformed(
        root.as_table().loc(),
        "envelope has no message",
    ))?;

    // Safety: the verifier checked the payload as the variant its tag names
    Ok(match message_type {
        MessageType::Circuit => {
            let table = unsafe { CircuitTable::follow(payload.buf(), payload.loc()) };
            Message::Circuit(Circuit::from_table(table)?)
        }
        MessageType::R1csConstraints => Message::R1csConstraints(R1csConstraints::from_table(payload)),
        MessageType::Witness => {
            let table = unsafe { WitnessTable::follow(payload.buf(), payload.loc()) };
            Message::Witness(Witness::from_table(table)?)
        }
    })
}

/// Split concatenated framed messages by their length prefixes
pub fn frames(buf: &[u8]) -> Frames<'_> {
    Frames { rest: buf, offset: 0 }
}

/// Parse every message of a concatenated stream
pub fn read_messages<'a>(buf: &'a [u8]) -> impl Iterator<Item = Result<Message<'a>>> + 'a {
    frames(buf).map(|frame| frame.and_then(read_message))
}

/// Iterator over the framed messages of a stream.
///
/// Yields one error for a truncated tail, then stops.
#[derive(Clone, Debug)]
pub struct Frames<'a> {
    rest: &'a [u8],
    offset: usize,
}

impl<'a> Frames<'a> {
    /// Position of the next frame in the original buffer
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let result = match read_size_prefix(self.rest) {
            Some(size) if size <= self.rest.len() => {
                let (frame, tail) = self.rest.split_at(size);
                self.rest = tail;
                self.offset += size;
                return Some(Ok(frame));
            }
            Some(size) => ZkifError::LengthPrefixMismatch {
                declared: size - SIZE_PREFIX_SIZE,
                actual: self.rest.len() - SIZE_PREFIX_SIZE,
            },
            None => ZkifError::malformed(self.offset, "trailing bytes shorter than a length prefix"),
        };

        self.rest = &[];
        Some(Err(result))
    }
}

impl std::iter::FusedIterator for Frames<'_> {}
