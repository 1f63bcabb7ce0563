//! # Message collections
//!
//! [`Messages`] gathers framed buffers (each may hold several concatenated
//! messages) and answers questions across all of them: the last circuit,
//! every witness assignment, every constraint.

use crate::error::{ReaderError, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;
use std::path::Path;
use zkif_spec::variables::WireIds;
use zkif_spec::{
    frames, read_message_with, BilinearConstraint, Circuit, ConstraintSystem, Frames, Message,
    ReadConfig, Variable, VariableId,
};

/// Framed buffers waiting to be read
#[derive(Clone)]
pub struct Messages {
    buffers: Vec<Vec<u8>>,
    first_id: VariableId,
    config: ReadConfig,
}

impl Messages {
    /// Variables below id 1 (the constant one) are ignored by default
    pub fn new(config: ReadConfig) -> Self {
        Self {
            buffers: Vec::new(),
            first_id: VariableId::new(1),
            config,
        }
    }

    /// First variable id considered by the variable queries
    pub fn with_first_id(mut self, first_id: VariableId) -> Self {
        self.first_id = first_id;
        self
    }

    #[inline]
    pub fn first_id(&self) -> VariableId {
        self.first_id
    }

    #[inline]
    pub fn config(&self) -> &ReadConfig {
        &self.config
    }

    /// Add a buffer after checking that every message in it parses
    pub fn push_message(&mut self, buf: Vec<u8>) -> Result<()> {
        let mut count = 0usize;
        for frame in frames(&buf) {
            read_message_with(frame?, &self.config)?;
            count += 1;
        }
        tracing::debug!(bytes = buf.len(), messages = count, "accepted buffer");
        self.buffers.push(buf);
        Ok(())
    }

    pub fn read_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let buf = std::fs::read(path)?;
        tracing::debug!(path = %path.display(), bytes = buf.len(), "loaded file");
        self.push_message(buf)
    }

    /// Number of buffers pushed so far
    #[inline]
    pub fn num_buffers(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Every message of every buffer, in push order
    pub fn iter(&self) -> MessageIter<'_> {
        MessageIter {
            buffers: self.buffers.iter(),
            frames: None,
            config: self.config,
        }
    }

    pub fn circuits(&self) -> Result<Vec<Circuit<'_>>> {
        let mut circuits = Vec::new();
        for message in self {
            if let Message::Circuit(circuit) = message? {
                circuits.push(circuit);
            }
        }
        Ok(circuits)
    }

    pub fn last_circuit(&self) -> Result<Option<Circuit<'_>>> {
        Ok(self.circuits()?.pop())
    }

    /// Connections of the last circuit, skipping ids below `first_id`
    pub fn connection_variables(&self) -> Result<Option<Vec<Variable<'_>>>> {
        let Some(connections) = self.last_circuit()?.and_then(|c| c.connections()) else {
            return Ok(None);
        };
        Ok(Some(
            connections
                .iter()
                .filter(|var| var.id >= self.first_id)
                .collect(),
        ))
    }

    /// Ids in `first_id..free_variable_id` that are not connections,
    /// with the values assigned by witness messages when present.
    ///
    /// The ids are produced on demand; the circuit may declare far more of
    /// them than fit in memory.
    pub fn private_variables(&self) -> Result<Option<PrivateVariables<'_>>> {
        let Some(circuit) = self.last_circuit()? else {
            return Ok(None);
        };

        let connections: HashSet<VariableId> = circuit
            .connections()
            .map(|c| c.variable_ids().collect())
            .unwrap_or_default();

        let mut values = HashMap::new();
        for var in self.iter_witness() {
            let var = var?;
            values.insert(var.id, var.value);
        }

        Ok(Some(PrivateVariables {
            ids: self.first_id.get()..circuit.free_variable_id().get(),
            connections,
            values,
        }))
    }

    /// Every witness assignment across messages, in order
    pub fn iter_witness(&self) -> WitnessIter<'_> {
        WitnessIter {
            messages: self.iter(),
            current: None,
        }
    }

    /// Every constraint across R1CS messages, in order
    pub fn iter_constraints(&self) -> ConstraintIter<'_> {
        ConstraintIter {
            messages: self.iter(),
            current: None,
        }
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::new(ReadConfig::DEFAULT)
    }
}

impl fmt::Debug for Messages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts = [0usize; 3];
        let mut errors = 0usize;
        for message in self {
            match message {
                Ok(Message::Circuit(_)) => counts[0] += 1,
                Ok(Message::R1csConstraints(_)) => counts[1] += 1,
                Ok(Message::Witness(_)) => counts[2] += 1,
                Err(_) => errors += 1,
            }
        }

        f.debug_struct("Messages")
            .field("buffers", &self.buffers.len())
            .field("first_id", &self.first_id)
            .field("circuits", &counts[0])
            .field("r1cs_constraints", &counts[1])
            .field("witnesses", &counts[2])
            .field("errors", &errors)
            .finish()
    }
}

impl<'a> IntoIterator for &'a Messages {
    type Item = Result<Message<'a>>;
    type IntoIter = MessageIter<'a>;

    fn into_iter(self) -> MessageIter<'a> {
        self.iter()
    }
}

/// Iterator over the messages of a [`Messages`] collection
pub struct MessageIter<'a> {
    buffers: std::slice::Iter<'a, Vec<u8>>,
    frames: Option<Frames<'a>>,
    config: ReadConfig,
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<Message<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(frame) = self.frames.as_mut().and_then(Iterator::next) {
                let config = self.config;
                return Some(
                    frame
                        .and_then(|frame| read_message_with(frame, &config))
                        .map_err(ReaderError::from),
                );
            }
            // Move to the next buffer
            self.frames = Some(frames(self.buffers.next()?));
        }
    }
}

/// Iterator over witness assignments, see [`Messages::iter_witness`]
pub struct WitnessIter<'a> {
    messages: MessageIter<'a>,
    current: Option<zkif_spec::variables::VariableIter<'a, WireIds<'a>>>,
}

impl<'a> Iterator for WitnessIter<'a> {
    type Item = Result<Variable<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(var) = self.current.as_mut().and_then(Iterator::next) {
                return Some(Ok(var));
            }
            match self.messages.next()? {
                Ok(Message::Witness(witness)) => {
                    self.current = Some(witness.assigned_variables().iter());
                }
                Ok(_) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Iterator over private variables, see [`Messages::private_variables`]
#[derive(Clone, Debug)]
pub struct PrivateVariables<'a> {
    ids: Range<u64>,
    connections: HashSet<VariableId>,
    values: HashMap<VariableId, &'a [u8]>,
}

impl<'a> Iterator for PrivateVariables<'a> {
    type Item = Variable<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = VariableId::new(self.ids.next()?);
            if self.connections.contains(&id) {
                continue;
            }
            return Some(Variable {
                id,
                value: self.values.get(&id).copied().unwrap_or(&[]),
            });
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, upper) = self.ids.size_hint();
        (0, upper)
    }
}

impl std::iter::FusedIterator for PrivateVariables<'_> {}

/// Iterator over bilinear constraints, see [`Messages::iter_constraints`]
pub struct ConstraintIter<'a> {
    messages: MessageIter<'a>,
    current: Option<(ConstraintSystem<'a>, usize)>,
}

impl<'a> Iterator for ConstraintIter<'a> {
    type Item = Result<BilinearConstraint<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((system, next)) = self.current.as_mut() {
                if let Some(constraint) = system.get(*next) {
                    *next += 1;
                    return Some(constraint.map_err(ReaderError::from));
                }
            }
            match self.messages.next()? {
                Ok(Message::R1csConstraints(r1cs)) => match r1cs.constraint_system() {
                    Ok(system) => self.current = Some((system, 0)),
                    Err(err) => return Some(Err(err.into())),
                },
                Ok(_) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
