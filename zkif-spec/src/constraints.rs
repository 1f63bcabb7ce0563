//! # R1CS constraints
//!
//! The R1CSConstraints message carries one nested table. The framer only
//! checks that it is a well-formed table and hands it back untouched through
//! [`R1csConstraints::as_table`], so the constraint schema can change without
//! touching the message layer.
//!
//! The current constraint schema is the ConstraintSystem table, a list of
//! bilinear constraints `A * B = C` where each linear combination is a
//! [`Variables`] record whose values are coefficients:
//!
//! ```text
//! ConstraintSystem:    [constraints: [BilinearConstraint]] [constraint_type: i8] [info: [KeyValue]]
//! BilinearConstraint:  [a: Variables] [b: Variables] [c: Variables]
//! ```

use crate::error::{Result, ZkifError};
use crate::keyvalue::KeyValueOwned;
use crate::message::{ensure_encodable, finish_message, MessageType};
use crate::schema::{
    end_table, verify_table, BilinearConstraintTable, ConstraintSystemTable, KeyValues,
};
use crate::variables::{Variables, VariablesOwned};
use flatbuffers::{FlatBufferBuilder, Table, VOffsetT, WIPOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// R1CSConstraints message borrowed from a parsed buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct R1csConstraints<'a> {
    table: Table<'a>,
}

impl<'a> R1csConstraints<'a> {
    pub(crate) fn from_table(table: Table<'a>) -> Self {
        Self { table }
    }

    /// The embedded table, exactly as written
    #[inline]
    pub fn as_table(&self) -> Table<'a> {
        self.table
    }

    /// Verify and decode the embedded table as a constraint system
    pub fn constraint_system(&self) -> Result<ConstraintSystem<'a>> {
        ConstraintSystem::from_table(verify_table::<ConstraintSystemTable>(self.table)?)
    }
}

/// How the constraints are to be read
#[repr(i8)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ConstraintType {
    #[default]
    R1cs = 0,
    /// Fan-in-2 arithmetic gates
    Arithmetic = 1,
}

impl ConstraintType {
    pub const fn from_i8(raw: i8) -> Option<Self> {
        match raw {
            0 => Some(ConstraintType::R1cs),
            1 => Some(ConstraintType::Arithmetic),
            _ => None,
        }
    }

    #[inline]
    pub const fn to_i8(self) -> i8 {
        self as i8
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintType::R1cs => f.write_str("R1CS"),
            ConstraintType::Arithmetic => f.write_str("arithmetic"),
        }
    }
}

/// Constraint system view over a verified table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstraintSystem<'a> {
    table: ConstraintSystemTable<'a>,
    constraint_type: ConstraintType,
}

impl<'a> ConstraintSystem<'a> {
    pub(crate) fn from_table(table: ConstraintSystemTable<'a>) -> Result<Self> {
        let constraint_type = ConstraintType::from_i8(table.constraint_type()).ok_or(
            ZkifError::malformed(table.as_table().loc(), "unknown constraint type"),
        )?;
        Ok(Self {
            table,
            constraint_type,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.constraints().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn constraint_type(&self) -> ConstraintType {
        self.constraint_type
    }

    /// Free-form attributes of the constraint system
    #[inline]
    pub fn info(&self) -> Option<KeyValues<'a>> {
        self.table.info()
    }

    /// Decode the constraint at `index`, `None` past the end
    pub fn get(&self, index: usize) -> Option<Result<BilinearConstraint<'a>>> {
        let constraints = self.table.constraints();
        (index < constraints.len()).then(|| BilinearConstraint::from_table(constraints.get(index)))
    }

    /// Decode constraints lazily, in order
    pub fn iter(&self) -> impl Iterator<Item = Result<BilinearConstraint<'a>>> + 'a {
        self.table
            .constraints()
            .iter()
            .map(BilinearConstraint::from_table)
    }
}

/// One constraint `A * B = C`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BilinearConstraint<'a> {
    pub linear_combination_a: Variables<'a>,
    pub linear_combination_b: Variables<'a>,
    pub linear_combination_c: Variables<'a>,
}

impl<'a> BilinearConstraint<'a> {
    fn from_table(table: BilinearConstraintTable<'a>) -> Result<Self> {
        let term = |slot: VOffsetT| -> Result<Variables<'a>> {
            let lc = table.linear_combination(slot).ok_or(ZkifError::malformed(
                table.as_table().loc(),
                "constraint is missing a linear combination",
            ))?;
            Variables::from_table(lc)
        };

        Ok(Self {
            linear_combination_a: term(BilinearConstraintTable::VT_LINEAR_COMBINATION_A)?,
            linear_combination_b: term(BilinearConstraintTable::VT_LINEAR_COMBINATION_B)?,
            linear_combination_c: term(BilinearConstraintTable::VT_LINEAR_COMBINATION_C)?,
        })
    }
}

/// Constraint owned by a producer
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BilinearConstraintOwned {
    pub linear_combination_a: VariablesOwned,
    pub linear_combination_b: VariablesOwned,
    pub linear_combination_c: VariablesOwned,
}

impl BilinearConstraintOwned {
    pub fn build<'b>(
        &self,
        builder: &mut FlatBufferBuilder<'b>,
    ) -> WIPOffset<BilinearConstraintTable<'b>> {
        let a = self.linear_combination_a.build(builder);
        let b = self.linear_combination_b.build(builder);
        let c = self.linear_combination_c.build(builder);

        let start = builder.start_table();
        builder.push_slot_always(BilinearConstraintTable::VT_LINEAR_COMBINATION_C, c);
        builder.push_slot_always(BilinearConstraintTable::VT_LINEAR_COMBINATION_B, b);
        builder.push_slot_always(BilinearConstraintTable::VT_LINEAR_COMBINATION_A, a);
        end_table(builder, start)
    }

    fn check(&self) -> Result<()> {
        self.linear_combination_a.element_size()?;
        self.linear_combination_b.element_size()?;
        self.linear_combination_c.element_size()?;
        Ok(())
    }

    fn size_hint(&self) -> usize {
        self.linear_combination_a.size_hint()
            + self.linear_combination_b.size_hint()
            + self.linear_combination_c.size_hint()
            + 24
    }
}

impl From<BilinearConstraint<'_>> for BilinearConstraintOwned {
    fn from(constraint: BilinearConstraint<'_>) -> Self {
        Self {
            linear_combination_a: constraint.linear_combination_a.into(),
            linear_combination_b: constraint.linear_combination_b.into(),
            linear_combination_c: constraint.linear_combination_c.into(),
        }
    }
}

/// Constraint system owned by a producer
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSystemOwned {
    pub constraints: Vec<BilinearConstraintOwned>,
    pub constraint_type: ConstraintType,
    pub info: Option<Vec<KeyValueOwned>>,
}

impl ConstraintSystemOwned {
    pub fn new(constraints: Vec<BilinearConstraintOwned>) -> Self {
        Self {
            constraints,
            ..Self::default()
        }
    }

    /// Add one info entry
    pub fn with_info(mut self, entry: KeyValueOwned) -> Self {
        self.info.get_or_insert_with(Vec::new).push(entry);
        self
    }

    /// Write the ConstraintSystem table without checking value alignment
    pub fn build<'b>(
        &self,
        builder: &mut FlatBufferBuilder<'b>,
    ) -> WIPOffset<ConstraintSystemTable<'b>> {
        let tables: Vec<_> = self
            .constraints
            .iter()
            .map(|constraint| constraint.build(builder))
            .collect();
        let constraints = builder.create_vector(tables.as_slice());
        let info = self
            .info
            .as_ref()
            .map(|info| KeyValueOwned::build_all(info, builder));

        let start = builder.start_table();
        if let Some(info) = info {
            builder.push_slot_always(ConstraintSystemTable::VT_INFO, info);
        }
        builder.push_slot_always(ConstraintSystemTable::VT_CONSTRAINTS, constraints);
        builder.push_slot::<i8>(
            ConstraintSystemTable::VT_CONSTRAINT_TYPE,
            self.constraint_type.to_i8(),
            ConstraintType::R1cs.to_i8(),
        );
        end_table(builder, start)
    }

    fn size_hint(&self) -> usize {
        let constraints: usize = self
            .constraints
            .iter()
            .map(BilinearConstraintOwned::size_hint)
            .sum();
        let info: usize = self.info.iter().flatten().map(KeyValueOwned::size_hint).sum();
        constraints + info + 64
    }

    /// Frame as a complete R1CSConstraints message
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        for constraint in &self.constraints {
            constraint.check()?;
        }
        let size = ensure_encodable(self.size_hint())?;
        let mut builder = FlatBufferBuilder::with_capacity(size);
        let system = self.build(&mut builder);
        finish_message(builder, MessageType::R1csConstraints, system)
    }

    pub fn write_into<W: io::Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }
}

impl TryFrom<ConstraintSystem<'_>> for ConstraintSystemOwned {
    type Error = ZkifError;

    fn try_from(system: ConstraintSystem<'_>) -> Result<Self> {
        let constraints = system
            .iter()
            .map(|constraint| constraint.map(BilinearConstraintOwned::from))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            constraints,
            constraint_type: system.constraint_type(),
            info: system.info().map(KeyValueOwned::from_vector),
        })
    }
}
