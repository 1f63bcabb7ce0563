//! # Circuit metadata

use crate::error::Result;
use crate::id::VariableId;
use crate::keyvalue::{KeyValue, KeyValueOwned};
use crate::message::{ensure_encodable, finish_message, MessageType};
use crate::schema::{end_table, CircuitTable, KeyValues};
use crate::variables::{Variables, VariablesOwned};
use flatbuffers::{FlatBufferBuilder, WIPOffset};
use serde::{Deserialize, Serialize};
use std::io;

/// Circuit message borrowed from a parsed buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Circuit<'a> {
    table: CircuitTable<'a>,
    connections: Option<Variables<'a>>,
}

impl<'a> Circuit<'a> {
    pub(crate) fn from_table(table: CircuitTable<'a>) -> Result<Self> {
        let connections = table.connections().map(Variables::from_table).transpose()?;
        Ok(Self { table, connections })
    }

    /// The first id not used by this circuit
    #[inline]
    pub fn free_variable_id(&self) -> VariableId {
        VariableId::new(self.table.free_variable_id())
    }

    /// Number of declared variables, the constant one included
    #[inline]
    pub fn num_variables(&self) -> u64 {
        self.table.free_variable_id()
    }

    /// Connection (public) variables, possibly with values
    #[inline]
    pub fn connections(&self) -> Option<Variables<'a>> {
        self.connections
    }

    /// Largest field element, as opaque little-endian bytes
    #[inline]
    pub fn field_maximum(&self) -> Option<&'a [u8]> {
        self.table.field_maximum()
    }

    /// Custom parameters of the circuit construction
    #[inline]
    pub fn configuration(&self) -> Option<KeyValues<'a>> {
        self.table.configuration()
    }

    /// First configuration entry with this key
    pub fn config_value(&self, key: &str) -> Option<KeyValue<'a>> {
        self.configuration()?.iter().find(|kv| kv.key() == key)
    }
}

/// Circuit message owned by a producer
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CircuitOwned {
    pub free_variable_id: VariableId,
    pub connections: Option<VariablesOwned>,
    pub field_maximum: Option<Vec<u8>>,
    pub configuration: Option<Vec<KeyValueOwned>>,
}

impl CircuitOwned {
    pub fn new(free_variable_id: VariableId) -> Self {
        Self {
            free_variable_id,
            ..Self::default()
        }
    }

    /// Circuit with `num_inputs` unassigned inputs at ids `1..=num_inputs`
    pub fn simple_inputs(num_inputs: u64) -> Self {
        let first_input_id = 1;
        let first_local_id = first_input_id + num_inputs;

        Self {
            free_variable_id: VariableId::new(first_local_id),
            connections: Some(VariablesOwned::unassigned(
                (first_input_id..first_local_id).map(VariableId::new),
            )),
            ..Self::default()
        }
    }

    /// Add one configuration entry
    pub fn with_config(mut self, entry: KeyValueOwned) -> Self {
        self.configuration.get_or_insert_with(Vec::new).push(entry);
        self
    }

    fn size_hint(&self) -> usize {
        let connections = self.connections.as_ref().map_or(0, VariablesOwned::size_hint);
        let field_maximum = self.field_maximum.as_ref().map_or(0, Vec::len);
        let configuration: usize = self
            .configuration
            .iter()
            .flatten()
            .map(KeyValueOwned::size_hint)
            .sum();
        connections + field_maximum + configuration + 64
    }

    /// Write the Circuit table
    pub fn build<'b>(&self, builder: &mut FlatBufferBuilder<'b>) -> WIPOffset<CircuitTable<'b>> {
        let connections = self.connections.as_ref().map(|c| c.build(builder));
        let field_maximum = self
            .field_maximum
            .as_ref()
            .map(|m| builder.create_vector(m.as_slice()));
        let configuration = self
            .configuration
            .as_ref()
            .map(|c| KeyValueOwned::build_all(c, builder));

        let start = builder.start_table();
        builder.push_slot::<u64>(CircuitTable::VT_FREE_VARIABLE_ID, self.free_variable_id.get(), 0);
        if let Some(configuration) = configuration {
            builder.push_slot_always(CircuitTable::VT_CONFIGURATION, configuration);
        }
        if let Some(field_maximum) = field_maximum {
            builder.push_slot_always(CircuitTable::VT_FIELD_MAXIMUM, field_maximum);
        }
        if let Some(connections) = connections {
            builder.push_slot_always(CircuitTable::VT_CONNECTIONS, connections);
        }
        end_table(builder, start)
    }

    /// Frame as a complete message
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if let Some(connections) = &self.connections {
            connections.element_size()?;
        }
        let size = ensure_encodable(self.size_hint())?;
        let mut builder = FlatBufferBuilder::with_capacity(size);
        let circuit = self.build(&mut builder);
        finish_message(builder, MessageType::Circuit, circuit)
    }

    pub fn write_into<W: io::Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }
}

impl From<Circuit<'_>> for CircuitOwned {
    fn from(circuit: Circuit<'_>) -> Self {
        Self {
            free_variable_id: circuit.free_variable_id(),
            connections: circuit.connections().map(VariablesOwned::from),
            field_maximum: circuit.field_maximum().map(<[u8]>::to_vec),
            configuration: circuit.configuration().map(KeyValueOwned::from_vector),
        }
    }
}
