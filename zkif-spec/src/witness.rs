//! # Witness assignments

use crate::error::{Result, ZkifError};
use crate::id::VariableId;
use crate::message::{ensure_encodable, finish_message, MessageType};
use crate::schema::{end_table, WitnessTable};
use crate::variables::{pack, Variables, VariablesOwned};
use flatbuffers::{FlatBufferBuilder, WIPOffset};
use serde::{Deserialize, Serialize};
use std::io;

/// Witness message borrowed from a parsed buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Witness<'a> {
    assigned_variables: Variables<'a>,
}

impl<'a> Witness<'a> {
    pub(crate) fn from_table(table: WitnessTable<'a>) -> Result<Self> {
        let assigned = table.assigned_variables().ok_or(ZkifError::malformed(
            table.as_table().loc(),
            "witness has no assigned variables",
        ))?;

        Ok(Self {
            assigned_variables: Variables::from_table(assigned)?,
        })
    }

    #[inline]
    pub fn assigned_variables(&self) -> Variables<'a> {
        self.assigned_variables
    }
}

/// Witness message owned by a producer
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct WitnessOwned {
    pub assigned_variables: VariablesOwned,
}

impl WitnessOwned {
    /// Pack `(id, value)` pairs into a witness
    pub fn from_pairs<I, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (VariableId, V)>,
        V: AsRef<[u8]>,
    {
        Ok(Self {
            assigned_variables: pack(pairs)?,
        })
    }

    /// Write the Witness table
    pub fn build<'b>(&self, builder: &mut FlatBufferBuilder<'b>) -> WIPOffset<WitnessTable<'b>> {
        let assigned = self.assigned_variables.build(builder);

        let start = builder.start_table();
        builder.push_slot_always(WitnessTable::VT_ASSIGNED_VARIABLES, assigned);
        end_table(builder, start)
    }

    /// Frame as a complete message
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.assigned_variables.element_size()?;
        let size = ensure_encodable(self.assigned_variables.size_hint() + 32)?;
        let mut builder = FlatBufferBuilder::with_capacity(size);
        let witness = self.build(&mut builder);
        finish_message(builder, MessageType::Witness, witness)
    }

    pub fn write_into<W: io::Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }
}

impl From<Witness<'_>> for WitnessOwned {
    fn from(witness: Witness<'_>) -> Self {
        Self {
            assigned_variables: witness.assigned_variables().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::read_message;

    #[test]
    fn test_from_pairs_roundtrip() {
        let owned = WitnessOwned::from_pairs([
            (VariableId::new(4), vec![1u8, 2, 3]),
            (VariableId::new(5), vec![4, 5, 6]),
        ])
        .unwrap();

        let bytes = owned.to_bytes().unwrap();
        let witness = read_message(&bytes).unwrap().into_witness().unwrap();
        let vars = witness.assigned_variables();

        assert_eq!(vars.len(), 2);
        assert_eq!(vars.element_size(), 3);
        assert_eq!(WitnessOwned::from(witness), owned);
    }

    #[test]
    fn test_misaligned_rejected_on_write() {
        let owned = WitnessOwned {
            assigned_variables: VariablesOwned {
                variable_ids: vec![VariableId::new(1), VariableId::new(2)],
                values: vec![1, 2, 3],
            },
        };
        assert!(matches!(
            owned.to_bytes(),
            Err(ZkifError::MisalignedValueArray { num_ids: 2, num_bytes: 3 })
        ));
    }

    #[test]
    fn test_witness_without_variables_is_malformed() {
        let mut builder = FlatBufferBuilder::new();
        let start = builder.start_table();
        let table: WIPOffset<WitnessTable> = end_table(&mut builder, start);
        let bytes = finish_message(builder, MessageType::Witness, table).unwrap();

        assert!(matches!(
            read_message(&bytes),
            Err(ZkifError::MalformedBuffer { .. })
        ));
    }
}
