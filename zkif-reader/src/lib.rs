//! # zkInterface Reader
//!
//! Consumer-side tools built on `zkif-spec`: collect message buffers from
//! files or memory, query the circuit and its variables across messages,
//! gather statistics, and validate a stream.
//!
//! ## Example
//!
//! ```rust
//! use zkif_reader::{validate, Messages, Stats};
//! use zkif_spec::{CircuitOwned, VariableId, WitnessOwned};
//!
//! let mut messages = Messages::default();
//! messages.push_message(CircuitOwned::simple_inputs(2).to_bytes().unwrap()).unwrap();
//! messages
//!     .push_message(
//!         WitnessOwned::from_pairs([(VariableId::new(1), [5u8])])
//!             .unwrap()
//!             .to_bytes()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let stats = Stats::from_messages(&messages).unwrap();
//! assert_eq!(stats.num_public_inputs, 2);
//! assert!(validate(&messages, false).is_valid());
//! ```

pub mod error;
pub mod messages;
pub mod stats;
pub mod validator;

pub use error::{ReaderError, Result};
pub use messages::{ConstraintIter, MessageIter, Messages, PrivateVariables, WitnessIter};
pub use stats::Stats;
pub use validator::{validate, ValidationResult, Validator, Violation, Warning};
