//! # zkInterface Message Core
//!
//! Binary framing for zero-knowledge proof artifacts exchanged between a
//! circuit front end and a proving back end.
//!
//! ## Key Features
//! - Size-prefixed, self-delimiting messages tagged with `"zkif"`
//! - Payloads are FlatBuffers tables of the zkInterface schema
//! - Closed set of payloads: Circuit, R1CSConstraints, Witness
//! - Native u64 variable ids, with checked conversions only
//! - Witness values packed as two parallel arrays with an inferred element size
//! - Zero-copy parsing: every view borrows the input buffer
//! - Key-value attributes for circuit configuration and constraint info
//!
//! ## Example
//!
//! ```rust
//! use zkif_spec::{pack, read_message, write_witness, Message, VariableId};
//!
//! let assignments = pack([
//!     (VariableId::new(0), [1u8, 0, 0, 0]),
//!     (VariableId::new(1), [10, 11, 12, 13]),
//! ])
//! .unwrap();
//! let bytes = write_witness(&assignments).unwrap();
//!
//! match read_message(&bytes).unwrap() {
//!     Message::Witness(witness) => {
//!         for var in witness.assigned_variables() {
//!             println!("{:?}", var);
//!         }
//!     }
//!     other => panic!("unexpected {}", other.message_type()),
//! }
//! ```

pub use flatbuffers;

pub mod error;
pub mod config;
pub mod id;
pub mod schema;
pub mod keyvalue;
pub mod variables;
pub mod circuit;
pub mod witness;
pub mod constraints;
pub mod message;

pub use error::{Result, ZkifError};
pub use config::{ConfigError, LengthCheck, ReadConfig};
pub use keyvalue::{KeyValue, KeyValueOwned};
pub use schema::KeyValues;
pub use id::{from_wire_id, is_contiguous, to_wire_id, VariableId, MAX_EXACT_F64_ID};
pub use variables::{element_size, pack, unpack, Variable, Variables, VariablesOwned};
pub use circuit::{Circuit, CircuitOwned};
pub use witness::{Witness, WitnessOwned};
pub use constraints::{
    BilinearConstraint, BilinearConstraintOwned, ConstraintSystem, ConstraintSystemOwned,
    ConstraintType, R1csConstraints,
};
pub use message::{
    finish_message, frames, read_message, read_message_with, read_messages, read_size_prefix,
    write_circuit, write_r1cs, write_witness, Frames, Message, MessageType,
};

/// File identifier written right after the length prefix
pub const FILE_IDENTIFIER: [u8; 4] = *b"zkif";

/// Size of the little-endian length prefix
pub const SIZE_PREFIX_SIZE: usize = 4;

/// Length prefix plus file identifier
pub const HEADER_SIZE: usize = SIZE_PREFIX_SIZE + FILE_IDENTIFIER.len();
