//! # Schema tables
//!
//! FlatBuffers table wrappers for the tables of `schema/zkinterface.fbs`
//! that this crate reads and writes. Slot offsets follow the schema field
//! order, so buffers built by any FlatBuffers implementation of that schema
//! read back here.
//!
//! Wrappers are only created over tables that passed verification (see
//! [`verify_root`] and [`verify_table`]); their field reads cannot leave the
//! buffer.

use crate::error::Result;
use crate::keyvalue::KeyValue;
use crate::message::MessageType;
use flatbuffers::{
    FlatBufferBuilder, Follow, ForwardsUOffset, InvalidFlatbuffer, Table,
    TableUnfinishedWIPOffset, VOffsetT, Vector, Verifiable, Verifier, VerifierOptions, WIPOffset,
};

/// A vector of KeyValue tables
pub type KeyValues<'a> = Vector<'a, ForwardsUOffset<KeyValue<'a>>>;

macro_rules! table_wrapper {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name<'a> {
            table: ::flatbuffers::Table<'a>,
        }

        impl<'a> ::flatbuffers::Follow<'a> for $name<'a> {
            type Inner = $name<'a>;

            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                Self {
                    table: ::flatbuffers::Table::new(buf, loc),
                }
            }
        }

        impl<'a> $name<'a> {
            #[inline]
            pub fn as_table(&self) -> ::flatbuffers::Table<'a> {
                self.table
            }

            /// Read a field whose slot holds a `T`
            #[inline]
            fn field<T: ::flatbuffers::Follow<'a> + 'a>(
                &self,
                slot: ::flatbuffers::VOffsetT,
            ) -> Option<T::Inner> {
                // Safety: the table was verified and every caller names the
                // type the slot is verified as
                unsafe { self.table.get::<T>(slot, None) }
            }
        }
    };
}
pub(crate) use table_wrapper;

/// Close a table started with `start_table`
#[inline]
pub(crate) fn end_table<T>(
    builder: &mut FlatBufferBuilder<'_>,
    start: WIPOffset<TableUnfinishedWIPOffset>,
) -> WIPOffset<T> {
    WIPOffset::new(builder.end_table(start).value())
}

/// Verify a whole region as a root table
pub(crate) fn verify_root<'a, T>(region: &'a [u8]) -> Result<T::Inner>
where
    T: Follow<'a> + Verifiable + 'a,
{
    Ok(flatbuffers::root::<T>(region)?)
}

/// Verify a table found inside an already parsed buffer as a `T`
pub(crate) fn verify_table<'a, T>(table: Table<'a>) -> Result<T::Inner>
where
    T: Follow<'a> + Verifiable + 'a,
{
    let options = VerifierOptions {
        // The framed message size already bounds the table count
        max_tables: usize::MAX,
        ..VerifierOptions::default()
    };
    let mut verifier = Verifier::new(&options, table.buf());
    T::run_verifier(&mut verifier, table.loc())?;
    // Safety: verified at this location just above
    Ok(unsafe { T::follow(table.buf(), table.loc()) })
}

// ============================================================================
// Root
// ============================================================================

table_wrapper!(
    /// The envelope: a `message_type` tag and the `message` union
    RootTable
);

impl<'a> RootTable<'a> {
    pub const VT_MESSAGE_TYPE: VOffsetT = 4;
    pub const VT_MESSAGE: VOffsetT = 6;

    /// Tag 0 when absent
    #[inline]
    pub fn message_type(&self) -> u8 {
        self.field::<u8>(Self::VT_MESSAGE_TYPE).unwrap_or(0)
    }

    #[inline]
    pub fn message(&self) -> Option<Table<'a>> {
        self.field::<ForwardsUOffset<Table<'a>>>(Self::VT_MESSAGE)
    }
}

impl Verifiable for RootTable<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> std::result::Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_union::<u8, _>(
                "message_type",
                Self::VT_MESSAGE_TYPE,
                "message",
                Self::VT_MESSAGE,
                true,
                |tag, v, pos| match MessageType::from_u8(tag) {
                    Some(MessageType::Circuit) => {
                        v.verify_union_variant::<ForwardsUOffset<CircuitTable>>("Circuit", pos)
                    }
                    Some(MessageType::R1csConstraints) => v
                        .verify_union_variant::<ForwardsUOffset<OpaqueTable>>(
                            "ConstraintSystem",
                            pos,
                        ),
                    Some(MessageType::Witness) => {
                        v.verify_union_variant::<ForwardsUOffset<WitnessTable>>("Witness", pos)
                    }
                    // Rejected after verification with the tag itself
                    None => Ok(()),
                },
            )?
            .finish();
        Ok(())
    }
}

/// Any table, checked for its vtable and bounds only
pub(crate) struct OpaqueTable;

impl Verifiable for OpaqueTable {
    fn run_verifier(v: &mut Verifier, pos: usize) -> std::result::Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?.finish();
        Ok(())
    }
}

// ============================================================================
// Payload tables
// ============================================================================

table_wrapper!(CircuitTable);

impl<'a> CircuitTable<'a> {
    pub const VT_CONNECTIONS: VOffsetT = 4;
    pub const VT_FREE_VARIABLE_ID: VOffsetT = 6;
    pub const VT_FIELD_MAXIMUM: VOffsetT = 8;
    pub const VT_CONFIGURATION: VOffsetT = 10;

    #[inline]
    pub fn connections(&self) -> Option<VariablesTable<'a>> {
        self.field::<ForwardsUOffset<VariablesTable<'a>>>(Self::VT_CONNECTIONS)
    }

    #[inline]
    pub fn free_variable_id(&self) -> u64 {
        self.field::<u64>(Self::VT_FREE_VARIABLE_ID).unwrap_or(0)
    }

    #[inline]
    pub fn field_maximum(&self) -> Option<&'a [u8]> {
        self.field::<ForwardsUOffset<Vector<'a, u8>>>(Self::VT_FIELD_MAXIMUM)
            .map(|v| v.bytes())
    }

    #[inline]
    pub fn configuration(&self) -> Option<KeyValues<'a>> {
        self.field::<ForwardsUOffset<KeyValues<'a>>>(Self::VT_CONFIGURATION)
    }
}

impl Verifiable for CircuitTable<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> std::result::Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<VariablesTable>>("connections", Self::VT_CONNECTIONS, false)?
            .visit_field::<u64>("free_variable_id", Self::VT_FREE_VARIABLE_ID, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, u8>>>("field_maximum", Self::VT_FIELD_MAXIMUM, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<KeyValue>>>>(
                "configuration",
                Self::VT_CONFIGURATION,
                false,
            )?
            .finish();
        Ok(())
    }
}

table_wrapper!(VariablesTable);

impl<'a> VariablesTable<'a> {
    pub const VT_VARIABLE_IDS: VOffsetT = 4;
    pub const VT_VALUES: VOffsetT = 6;

    #[inline]
    pub fn variable_ids(&self) -> Option<Vector<'a, u64>> {
        self.field::<ForwardsUOffset<Vector<'a, u64>>>(Self::VT_VARIABLE_IDS)
    }

    #[inline]
    pub fn values(&self) -> Option<&'a [u8]> {
        self.field::<ForwardsUOffset<Vector<'a, u8>>>(Self::VT_VALUES)
            .map(|v| v.bytes())
    }
}

impl Verifiable for VariablesTable<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> std::result::Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, u64>>>("variable_ids", Self::VT_VARIABLE_IDS, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, u8>>>("values", Self::VT_VALUES, false)?
            .finish();
        Ok(())
    }
}

table_wrapper!(WitnessTable);

impl<'a> WitnessTable<'a> {
    pub const VT_ASSIGNED_VARIABLES: VOffsetT = 4;

    #[inline]
    pub fn assigned_variables(&self) -> Option<VariablesTable<'a>> {
        self.field::<ForwardsUOffset<VariablesTable<'a>>>(Self::VT_ASSIGNED_VARIABLES)
    }
}

impl Verifiable for WitnessTable<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> std::result::Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<VariablesTable>>(
                "assigned_variables",
                Self::VT_ASSIGNED_VARIABLES,
                true,
            )?
            .finish();
        Ok(())
    }
}

table_wrapper!(ConstraintSystemTable);

impl<'a> ConstraintSystemTable<'a> {
    pub const VT_CONSTRAINTS: VOffsetT = 4;
    pub const VT_CONSTRAINT_TYPE: VOffsetT = 6;
    pub const VT_INFO: VOffsetT = 8;

    /// Empty when absent
    #[inline]
    pub fn constraints(&self) -> Vector<'a, ForwardsUOffset<BilinearConstraintTable<'a>>> {
        self.field::<ForwardsUOffset<Vector<'a, ForwardsUOffset<BilinearConstraintTable<'a>>>>>(
            Self::VT_CONSTRAINTS,
        )
        .unwrap_or_default()
    }

    /// Raw constraint type, 0 (R1CS) when absent
    #[inline]
    pub fn constraint_type(&self) -> i8 {
        self.field::<i8>(Self::VT_CONSTRAINT_TYPE).unwrap_or(0)
    }

    #[inline]
    pub fn info(&self) -> Option<KeyValues<'a>> {
        self.field::<ForwardsUOffset<KeyValues<'a>>>(Self::VT_INFO)
    }
}

impl Verifiable for ConstraintSystemTable<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> std::result::Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<BilinearConstraintTable>>>>(
                "constraints",
                Self::VT_CONSTRAINTS,
                false,
            )?
            .visit_field::<i8>("constraint_type", Self::VT_CONSTRAINT_TYPE, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<KeyValue>>>>(
                "info",
                Self::VT_INFO,
                false,
            )?
            .finish();
        Ok(())
    }
}

table_wrapper!(BilinearConstraintTable);

impl<'a> BilinearConstraintTable<'a> {
    pub const VT_LINEAR_COMBINATION_A: VOffsetT = 4;
    pub const VT_LINEAR_COMBINATION_B: VOffsetT = 6;
    pub const VT_LINEAR_COMBINATION_C: VOffsetT = 8;

    /// Linear combination at one of the three slots; verification makes all
    /// three present
    #[inline]
    pub fn linear_combination(&self, slot: VOffsetT) -> Option<VariablesTable<'a>> {
        self.field::<ForwardsUOffset<VariablesTable<'a>>>(slot)
    }
}

impl Verifiable for BilinearConstraintTable<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> std::result::Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<VariablesTable>>(
                "linear_combination_a",
                Self::VT_LINEAR_COMBINATION_A,
                true,
            )?
            .visit_field::<ForwardsUOffset<VariablesTable>>(
                "linear_combination_b",
                Self::VT_LINEAR_COMBINATION_B,
                true,
            )?
            .visit_field::<ForwardsUOffset<VariablesTable>>(
                "linear_combination_c",
                Self::VT_LINEAR_COMBINATION_C,
                true,
            )?
            .finish();
        Ok(())
    }
}
